use std::error::Error;
use std::fmt;
use std::str;
use std::thread;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metadata::Metadata;

/// An error used when parsing `Severity`.
#[derive(Debug, Error)]
#[error("invalid severity")]
pub struct ParseSeverityError;

/// How severe a captured error is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// A warning.  This is the default for handled errors.
    Warning,
    /// An error.  This is the default for unhandled errors.
    Error,
}

impl Default for Severity {
    fn default() -> Severity {
        Severity::Warning
    }
}

impl str::FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(string: &str) -> Result<Severity, Self::Err> {
        Ok(match string {
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => return Err(ParseSeverityError),
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single unprocessed stack frame.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// The declaring module or type path, e.g. `my_app::db::Pool`.
    pub module: String,
    /// The method or function name within `module`.
    pub method: String,
    /// The source file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// The line number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl RawFrame {
    /// Creates a frame for the given declaring module and method.
    pub fn new<M: Into<String>, F: Into<String>>(module: M, method: F) -> RawFrame {
        RawFrame {
            module: module.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// Sets the source location of this frame.
    pub fn at<P: Into<String>>(mut self, file: P, line: u32) -> RawFrame {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Splits a fully qualified function path into module and method.
    ///
    /// ```
    /// use faultline_types::protocol::RawFrame;
    ///
    /// let frame = RawFrame::from_function("my_app::db::Pool::get");
    /// assert_eq!(frame.module, "my_app::db::Pool");
    /// assert_eq!(frame.method, "get");
    /// ```
    pub fn from_function(function: &str) -> RawFrame {
        match function.rfind("::") {
            Some(idx) => RawFrame::new(&function[..idx], &function[idx + 2..]),
            None => RawFrame::new("", function),
        }
    }
}

/// One link of an exception chain as it was intercepted.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct RawException {
    /// The runtime type name of the error.
    pub type_name: String,
    /// The error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The stack frames, innermost (top) frame first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<RawFrame>,
    /// The error that caused this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<RawException>>,
}

impl RawException {
    /// Creates a new exception with a type name and message.
    pub fn new<T: Into<String>, M: Into<String>>(type_name: T, message: M) -> RawException {
        RawException {
            type_name: type_name.into(),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Creates an exception chain from a `std::error::Error`.
    ///
    /// The `source()` links are followed and turned into `cause` links, so
    /// the returned exception is the outermost error.
    ///
    /// ```
    /// use faultline_types::protocol::RawException;
    ///
    /// let err = "NaN".parse::<usize>().unwrap_err();
    /// let exception = RawException::from_error(&err);
    /// assert_eq!(exception.type_name, "ParseIntError");
    /// assert_eq!(exception.message.as_deref(), Some("invalid digit found in string"));
    /// ```
    pub fn from_error<E: Error + ?Sized>(err: &E) -> RawException {
        let mut chain = vec![RawException {
            type_name: parse_type_from_debug(err),
            message: Some(err.to_string()),
            ..Default::default()
        }];
        let mut source = err.source();
        while let Some(err) = source {
            chain.push(RawException {
                type_name: parse_type_from_debug(err),
                message: Some(err.to_string()),
                ..Default::default()
            });
            source = err.source();
        }

        let mut rv = chain.pop().unwrap_or_default();
        while let Some(mut outer) = chain.pop() {
            outer.cause = Some(Box::new(rv));
            rv = outer;
        }
        rv
    }

    /// Sets the stack frames of this exception.
    pub fn with_frames(mut self, frames: Vec<RawFrame>) -> RawException {
        self.frames = frames;
        self
    }

    /// Sets the cause of this exception.
    pub fn with_cause(mut self, cause: RawException) -> RawException {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates the exception chain, starting with this exception.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            next: Some(self),
        }
    }

    /// The top-most stack frame, if any.
    pub fn top_frame(&self) -> Option<&RawFrame> {
        self.frames.first()
    }
}

/// Iterator over the links of an exception chain.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a RawException>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a RawException;

    fn next(&mut self) -> Option<&'a RawException> {
        let rv = self.next.take()?;
        self.next = rv.cause.as_deref();
        Some(rv)
    }
}

/// Parse the type name from `Debug` output.
///
/// ```
/// use faultline_types::protocol::parse_type_from_debug;
///
/// let err = "NaN".parse::<usize>().unwrap_err();
/// assert_eq!(&parse_type_from_debug(&err), "ParseIntError");
/// ```
pub fn parse_type_from_debug<D: fmt::Debug + ?Sized>(d: &D) -> String {
    let dbg = format!("{:#?}", d);

    dbg.split(&[' ', '(', '{', '\r', '\n'][..])
        .next()
        .unwrap_or(&dbg)
        .trim()
        .to_owned()
}

/// A snapshot of a thread at capture time.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct ThreadInfo {
    /// The thread identifier.
    pub id: String,
    /// The thread name, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether this is the thread the error was captured on.
    #[serde(default)]
    pub current: bool,
    /// The stack frames of this thread, if they were captured.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<RawFrame>,
}

impl ThreadInfo {
    /// Captures information about the calling thread, without a stack.
    pub fn current() -> ThreadInfo {
        let thread = thread::current();
        // `ThreadId::as_u64` is not stable, the debug output is `ThreadId(N)`
        let id: String = format!("{:?}", thread.id())
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        ThreadInfo {
            id,
            name: thread.name().map(str::to_owned),
            current: true,
            frames: vec![],
        }
    }
}

/// Unprocessed exception and context data at the moment of interception.
///
/// A raw capture is created at the instrumentation boundary (an error
/// handler, a logging integration, a panic hook) and handed to the client,
/// which consumes it exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCapture {
    /// The exception chain, outermost error first.
    pub exception: RawException,
    /// The severity of the error.
    pub severity: Severity,
    /// Whether the error was handled by the application.
    pub handled: bool,
    /// An optional context, e.g. the request route.
    pub context: Option<String>,
    /// Metadata attached at the origin of the capture.
    pub metadata: Metadata,
    /// Thread snapshots taken at capture time.
    pub threads: Vec<ThreadInfo>,
    /// When the error was intercepted.
    pub timestamp: DateTime<Utc>,
}

impl RawCapture {
    /// Creates a handled capture with `Warning` severity.
    pub fn new(exception: RawException) -> RawCapture {
        RawCapture {
            exception,
            severity: Severity::default(),
            handled: true,
            context: None,
            metadata: Metadata::default(),
            threads: vec![],
            timestamp: Utc::now(),
        }
    }

    /// Creates a handled capture from a `std::error::Error`.
    pub fn from_error<E: Error + ?Sized>(err: &E) -> RawCapture {
        RawCapture::new(RawException::from_error(err))
    }

    /// Marks the capture as unhandled.  This raises the severity to `Error`.
    pub fn unhandled(mut self) -> RawCapture {
        self.handled = false;
        self.severity = Severity::Error;
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> RawCapture {
        self.severity = severity;
        self
    }

    /// Sets the context.
    pub fn with_context<S: Into<String>>(mut self, context: S) -> RawCapture {
        self.context = Some(context.into());
        self
    }

    /// Attaches origin metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> RawCapture {
        self.metadata = metadata;
        self
    }

    /// Attaches thread snapshots.
    pub fn with_threads(mut self, threads: Vec<ThreadInfo>) -> RawCapture {
        self.threads = threads;
        self
    }

    /// Overrides the capture timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> RawCapture {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_error_chain() {
        let exception = RawException::from_error(&Outer(Inner));
        let chain: Vec<_> = exception
            .chain()
            .map(|e| (e.type_name.as_str(), e.message.as_deref()))
            .collect();
        assert_eq!(chain, vec![("Outer", Some("outer")), ("Inner", Some("inner"))]);
    }

    #[test]
    fn test_unhandled_raises_severity() {
        let capture = RawCapture::new(RawException::new("Boom", "boom"));
        assert!(capture.handled);
        assert_eq!(capture.severity, Severity::Warning);

        let capture = capture.unhandled();
        assert!(!capture.handled);
        assert_eq!(capture.severity, Severity::Error);
    }

    #[test]
    fn test_severity_roundtrip_str() {
        for severity in [Severity::Info, Severity::Warning, Severity::Error] {
            assert_eq!(severity.to_string().parse::<Severity>().unwrap(), severity);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_frame_from_function() {
        let frame = RawFrame::from_function("main");
        assert_eq!(frame.module, "");
        assert_eq!(frame.method, "main");
    }

    #[test]
    fn test_current_thread() {
        let info = ThreadInfo::current();
        assert!(info.current);
        assert!(!info.id.is_empty());
    }
}
