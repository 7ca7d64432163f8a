/// The level internal diagnostics are logged at.
///
/// Clients created with `debug: true` promote them to `info`.
#[doc(hidden)]
pub fn debug_level(debug: bool) -> log::Level {
    if debug {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

/// Logs an internal diagnostic message on the `faultline` target.
///
/// A leading `debug: <bool>;` carries the `debug` option of the client the
/// message belongs to.
#[macro_export]
#[doc(hidden)]
macro_rules! faultline_debug {
    (debug: $debug:expr; $($arg:tt)*) => {
        $crate::__log::log!(target: "faultline", $crate::__debug_level($debug), $($arg)*)
    };
    ($($arg:tt)*) => {
        $crate::__log::log!(target: "faultline", $crate::__debug_level(false), $($arg)*)
    };
}
