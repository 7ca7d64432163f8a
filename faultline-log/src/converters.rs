use log::kv::{Key, Source};

use faultline_core::{Metadata, RawCapture, RawException, RawFrame, Severity};

/// The metadata tab records are described in.
pub const LOG_TAB: &str = "Log event data";

/// Converts a [`log::Level`] to a faultline [`Severity`].
pub fn convert_log_level(level: log::Level) -> Severity {
    match level {
        log::Level::Error => Severity::Error,
        log::Level::Warn => Severity::Warning,
        log::Level::Info | log::Level::Debug | log::Level::Trace => Severity::Info,
    }
}

/// Creates a [`RawCapture`] from a [`log::Record`] carrying an error.
///
/// The error is read from the structured `error` key.  Records without one
/// produce no capture.
///
/// If `attach_stacktraces` is set and the `backtrace` feature is enabled,
/// the stack of the logging thread becomes the stack of the outermost
/// error.  Otherwise a single frame points at the location of the record.
pub fn capture_from_record(
    record: &log::Record<'_>,
    attach_stacktraces: bool,
) -> Option<RawCapture> {
    let value = record.key_values().get(Key::from_str("error"))?;
    let error = value.to_borrowed_error()?;

    let exception =
        RawException::from_error(error).with_frames(record_frames(record, attach_stacktraces));

    let mut metadata = Metadata::new();
    metadata.add(LOG_TAB, "Message", record.args().to_string());
    metadata.add(LOG_TAB, "Logger", record.target());

    let mut capture = RawCapture::new(exception)
        .with_severity(convert_log_level(record.level()))
        .with_metadata(metadata);
    if let Some(module) = record.module_path() {
        capture = capture.with_context(module);
    }
    Some(capture)
}

#[cfg(feature = "backtrace")]
fn current_frames() -> Vec<RawFrame> {
    faultline_core::current_frames()
}

#[cfg(not(feature = "backtrace"))]
fn current_frames() -> Vec<RawFrame> {
    Vec::new()
}

fn record_frames(record: &log::Record<'_>, attach_stacktraces: bool) -> Vec<RawFrame> {
    if attach_stacktraces {
        let frames = current_frames();
        if !frames.is_empty() {
            return frames;
        }
    }

    record
        .module_path()
        .map(|module| {
            let mut frame = RawFrame::new(module, "<log>");
            frame.file = record.file().map(ToOwned::to_owned);
            frame.line = record.line();
            frame
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use log::kv::Value;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(log::Level::Error, Severity::Error)]
    #[case(log::Level::Warn, Severity::Warning)]
    #[case(log::Level::Info, Severity::Info)]
    #[case(log::Level::Debug, Severity::Info)]
    fn test_convert_log_level(#[case] level: log::Level, #[case] severity: Severity) {
        assert_eq!(convert_log_level(level), severity);
    }

    #[test]
    fn test_record_without_error() {
        assert!(capture_from_record(
            &log::Record::builder()
                .args(format_args!("just a message"))
                .level(log::Level::Error)
                .build(),
            false
        )
        .is_none());
    }

    #[test]
    fn test_record_with_error() {
        let err = "80a".parse::<u16>().unwrap_err();
        let kvs = vec![("error", Value::from_dyn_error(&err))];
        let capture = capture_from_record(
            &log::Record::builder()
                .args(format_args!("invalid port"))
                .level(log::Level::Warn)
                .target("my_app::config")
                .module_path(Some("my_app::config"))
                .file(Some("src/config.rs"))
                .line(Some(42))
                .key_values(&kvs)
                .build(),
            false,
        )
        .unwrap();

        assert_eq!(capture.severity, Severity::Warning);
        assert!(capture.handled);
        assert_eq!(capture.exception.type_name, "ParseIntError");
        assert_eq!(capture.exception.frames[0].module, "my_app::config");
        assert_eq!(capture.exception.frames[0].line, Some(42));
        assert_eq!(capture.context.as_deref(), Some("my_app::config"));
        assert_eq!(
            capture.metadata.get(LOG_TAB, "Message"),
            Some(&"invalid port".into())
        );
        assert_eq!(
            capture.metadata.get(LOG_TAB, "Logger"),
            Some(&"my_app::config".into())
        );
    }
}
