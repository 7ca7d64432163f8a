use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::protocol::RawCapture;
use crate::utils::panic_message;
use crate::ClientOptions;

/// Modules whose errors are never reported, to avoid feedback loops when
/// delivery itself fails.
const INTERNAL_COMPONENTS: &[&str] = &[
    "faultline_core::worker",
    "faultline_core::session",
    "faultline_core::transport",
    "faultline::transports",
];

/// Why a capture was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The error type is on the ignore list.
    #[error("error class `{0}` is ignored")]
    IgnoredClass(String),
    /// The error was raised by the notifier itself.
    #[error("error originates from `{0}`")]
    InternalOrigin(String),
    /// The release stage does not notify.
    #[error("release stage `{0}` does not notify")]
    ReleaseStage(String),
}

/// Decides whether a capture should produce an event.
///
/// This never panics.  If evaluating the rules fails unexpectedly the
/// capture goes through and the fault is logged.
pub fn should_capture(capture: &RawCapture, options: &ClientOptions) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| evaluate(capture, options))) {
        Ok(Ok(())) => true,
        Ok(Err(rejection)) => {
            faultline_debug!(debug: options.debug; "not capturing: {}", rejection);
            false
        }
        Err(payload) => {
            log::error!(
                "capture gate failed, capturing anyway: {}",
                panic_message(payload.as_ref())
            );
            true
        }
    }
}

/// Evaluates the gate rules, reporting the first one that rejects.
pub(crate) fn evaluate(capture: &RawCapture, options: &ClientOptions) -> Result<(), Rejection> {
    let exception = &capture.exception;
    if options
        .ignore_classes
        .iter()
        .any(|class| *class == exception.type_name)
    {
        return Err(Rejection::IgnoredClass(exception.type_name.clone()));
    }

    if let Some(frame) = exception.frames.iter().find(|frame| {
        INTERNAL_COMPONENTS
            .iter()
            .any(|component| frame.module.starts_with(component))
    }) {
        return Err(Rejection::InternalOrigin(frame.module.clone()));
    }

    let stage = options.release_stage();
    if !options.notify_release_stages.is_empty()
        && !options.notify_release_stages.iter().any(|s| s == stage)
    {
        return Err(Rejection::ReleaseStage(stage.into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RawException, RawFrame};

    fn capture(type_name: &str) -> RawCapture {
        RawCapture::new(
            RawException::new(type_name, "boom")
                .with_frames(vec![RawFrame::new("my_app::handlers", "index")]),
        )
    }

    #[test]
    fn test_accepts_by_default() {
        assert_eq!(evaluate(&capture("IoError"), &ClientOptions::default()), Ok(()));
    }

    #[test]
    fn test_ignore_classes_match_exactly() {
        let mut options = ClientOptions::default();
        options.add_ignore_classes(["IoError"]);
        assert_eq!(
            evaluate(&capture("IoError"), &options),
            Err(Rejection::IgnoredClass("IoError".into()))
        );
        assert_eq!(evaluate(&capture("IoErrorKind"), &options), Ok(()));
        assert_eq!(evaluate(&capture("Io"), &options), Ok(()));
    }

    #[test]
    fn test_rejects_internal_origin() {
        let capture = RawCapture::new(RawException::new("DeliveryError", "timeout").with_frames(
            vec![
                RawFrame::new("faultline::transports::reqwest", "deliver"),
                RawFrame::new("faultline_core::worker", "run"),
            ],
        ));
        assert_eq!(
            evaluate(&capture, &ClientOptions::default()),
            Err(Rejection::InternalOrigin(
                "faultline::transports::reqwest".into()
            ))
        );
        assert!(!should_capture(&capture, &ClientOptions::default()));
    }

    #[test]
    fn test_release_stages() {
        let mut options = ClientOptions::default();
        options.set_notify_release_stages(["development", "test"]);

        options.set_release_stage("test");
        assert!(should_capture(&capture("RuntimeError"), &options));

        options.set_release_stage("ignoredReleaseStage");
        assert_eq!(
            evaluate(&capture("RuntimeError"), &options),
            Err(Rejection::ReleaseStage("ignoredReleaseStage".into()))
        );

        options.notify_release_stages.clear();
        assert!(should_capture(&capture("RuntimeError"), &options));
    }
}
