use std::time::Duration;

use once_cell::sync::Lazy;

use crate::protocol::NotifierInfo;

/// The version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

/// The value redacted metadata entries are replaced with.
pub const FILTERED: &str = "[FILTERED]";

/// The release stage reported when none is configured.
pub const DEFAULT_RELEASE_STAGE: &str = "production";

pub(crate) const API_KEY_HEADER: &str = "Faultline-Api-Key";
pub(crate) const PAYLOAD_VERSION_HEADER: &str = "Faultline-Payload-Version";
pub(crate) const SENT_AT_HEADER: &str = "Faultline-Sent-At";

/// Length of a session aggregation window.
pub(crate) const SESSION_WINDOW: Duration = Duration::from_secs(60);

/// Describes this library in every delivered payload.
pub static NOTIFIER_INFO: Lazy<NotifierInfo> = Lazy::new(|| NotifierInfo {
    name: "faultline-rust".into(),
    version: VERSION.into(),
    url: "https://github.com/faultline-rs/faultline".into(),
});
