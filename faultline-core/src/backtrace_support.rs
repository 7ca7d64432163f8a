use std::borrow::Cow;

use backtrace::Backtrace;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::protocol::{RawCapture, RawException, RawFrame, ThreadInfo};

static HASH_FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(.*)::h[a-f0-9]{16}$
    "#,
    )
    .unwrap()
});

static CRATE_HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(\[[a-f0-9]{16}\])
    ",
    )
    .unwrap()
});

static COMMON_RUST_SYMBOL_ESCAPES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \$
            (SP|BP|RF|LT|GT|LP|RP|C|
                u7e|u20|u27|u5b|u5d|u7b|u7d|u3b|u2b|u22)
        \$
    ",
    )
    .unwrap()
});

/// Frames up to and including the last of these are capture machinery.
const BORDER_FRAMES: &[&str] = &[
    "backtrace::",
    "faultline_core::backtrace_support::",
    "faultline_core::builder::",
    "faultline_core::client::",
    "std::panicking::begin_panic",
    "core::panicking::panic",
    // well-known library frames
    "faultline_log::",
    "log::__private_api",
];

fn strip_symbol(s: &str) -> Cow<'_, str> {
    let stripped_trailing_hash = HASH_FUNC_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(s);

    CRATE_HASH_RE.replace_all(stripped_trailing_hash, "")
}

fn demangle_symbol(s: &str) -> String {
    COMMON_RUST_SYMBOL_ESCAPES_RE
        .replace_all(s, |caps: &Captures<'_>| match &caps[1] {
            "SP" => "@",
            "BP" => "*",
            "RF" => "&",
            "LT" => "<",
            "GT" => ">",
            "LP" => "(",
            "RP" => ")",
            "C" => ",",
            "u7e" => "~",
            "u20" => " ",
            "u27" => "'",
            "u5b" => "[",
            "u5d" => "]",
            "u7b" => "{",
            "u7d" => "}",
            "u3b" => ";",
            "u2b" => "+",
            "u22" => "\"",
            _ => "",
        })
        .to_string()
}

fn is_border_frame(function: &str) -> bool {
    let function = function.trim_start_matches('<').trim_start_matches("_<");
    BORDER_FRAMES.iter().any(|border| function.starts_with(border))
}

/// Converts a resolved backtrace into raw frames, innermost first.
fn backtrace_to_frames(bt: &Backtrace) -> Vec<RawFrame> {
    let functions: Vec<(String, RawFrame)> = bt
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(|symbol| {
            let function = symbol
                .name()
                .map(|name| demangle_symbol(&strip_symbol(&name.to_string())))
                .unwrap_or_else(|| "<unknown>".into());
            let mut raw = RawFrame::from_function(&function);
            raw.file = symbol.filename().map(|path| path.display().to_string());
            raw.line = symbol.lineno();
            (function, raw)
        })
        .collect();

    let cutoff = functions
        .iter()
        .rposition(|(function, _)| is_border_frame(function))
        .map_or(0, |idx| idx + 1);

    functions
        .into_iter()
        .skip(cutoff)
        .map(|(_, frame)| frame)
        .collect()
}

/// Returns the stack of the calling thread as raw frames.
///
/// Frames are ordered innermost first and the frames of the stack walk
/// itself are removed.
pub fn current_frames() -> Vec<RawFrame> {
    backtrace_to_frames(&Backtrace::new())
}

/// Captures information about the current thread, including its stack.
pub fn current_thread() -> ThreadInfo {
    ThreadInfo {
        frames: current_frames(),
        ..ThreadInfo::current()
    }
}

/// Attaches the current stack to captures that were created without one.
pub trait AttachStacktrace {
    /// Attaches the stack of the calling thread unless frames are present.
    fn with_current_stacktrace(self) -> Self;
}

impl AttachStacktrace for RawException {
    fn with_current_stacktrace(self) -> Self {
        if self.frames.is_empty() {
            self.with_frames(current_frames())
        } else {
            self
        }
    }
}

impl AttachStacktrace for RawCapture {
    fn with_current_stacktrace(mut self) -> Self {
        self.exception = self.exception.with_current_stacktrace();
        self
    }
}
