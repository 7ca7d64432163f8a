use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capture::{RawFrame, Severity};
use super::metadata::Metadata;
use super::session::SessionSnapshot;

/// Represents user info.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct User {
    /// The ID of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The display name of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The email address of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.email.is_none()
    }
}

/// Static information about the instrumented application.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    /// The release stage, e.g. `production`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_stage: Option<String>,
    /// The application version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The kind of application, e.g. `worker` or `web`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
}

/// Static information about the host the application runs on.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// The host name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// The operating system family, e.g. `linux`.
    pub os_name: String,
    /// The CPU architecture, e.g. `x86_64`.
    pub os_arch: String,
    /// Versions of the runtime components, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_versions: BTreeMap<String, String>,
}

/// Describes the library that produced a payload.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct NotifierInfo {
    /// The name of the notifier.
    pub name: String,
    /// The version of the notifier.
    pub version: String,
    /// Where to find out more about the notifier.
    pub url: String,
}

/// A processed stack frame.
///
/// Whether a frame belongs to the instrumented application is decided once,
/// when the frame is created, and cannot be changed afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_number: Option<u32>,
    #[serde(default)]
    in_project: bool,
}

impl StackFrame {
    /// Creates a processed frame from a raw frame.
    pub fn new(raw: RawFrame, in_project: bool) -> StackFrame {
        let method = if raw.module.is_empty() {
            raw.method
        } else {
            format!("{}::{}", raw.module, raw.method)
        };
        StackFrame {
            file: raw.file,
            method,
            line_number: raw.line,
            in_project,
        }
    }

    /// The source file.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The fully qualified method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The line number.
    pub fn line(&self) -> Option<u32> {
        self.line_number
    }

    /// Whether the frame belongs to the instrumented application.
    pub fn in_project(&self) -> bool {
        self.in_project
    }
}

/// A processed exception.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    /// The type name of the error.
    pub error_class: String,
    /// The error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The stack frames, top frame first.
    #[serde(default)]
    pub stacktrace: Vec<StackFrame>,
}

/// A processed thread snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    /// The thread identifier.
    pub id: String,
    /// The thread name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the error was captured on this thread.
    #[serde(default)]
    pub error_reported_thread: bool,
    /// The stack frames of the thread.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stacktrace: Vec<StackFrame>,
}

/// The mutable working copy of an event.
///
/// Drafts are handed to user callbacks which may enrich them or ask for
/// them to be suppressed.  The session snapshot, handled state and
/// timestamp are fixed when the draft is built and are only readable.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// The severity of the event.
    pub severity: Severity,
    /// The context, e.g. the route or job the error happened in.
    pub context: Option<String>,
    /// Overrides how events are grouped together.
    pub grouping_hash: Option<String>,
    /// The affected user.
    pub user: User,
    /// Overrides the api key the event is delivered with.
    pub api_key: Option<String>,
    /// The exception chain, outermost error first.
    pub exceptions: Vec<ExceptionRecord>,
    /// Diagnostic metadata tabs.
    pub metadata: Metadata,
    /// Application information.
    pub app: AppInfo,
    /// Host information.
    pub device: DeviceInfo,
    /// Thread snapshots.
    pub threads: Vec<ThreadRecord>,
    handled: bool,
    session: Option<SessionSnapshot>,
    timestamp: DateTime<Utc>,
}

impl EventDraft {
    /// Creates a new draft.
    pub fn new(
        exceptions: Vec<ExceptionRecord>,
        handled: bool,
        session: Option<SessionSnapshot>,
        timestamp: DateTime<Utc>,
    ) -> EventDraft {
        EventDraft {
            severity: if handled {
                Severity::Warning
            } else {
                Severity::Error
            },
            context: None,
            grouping_hash: None,
            user: User::default(),
            api_key: None,
            exceptions,
            metadata: Metadata::default(),
            app: AppInfo::default(),
            device: DeviceInfo::default(),
            threads: vec![],
            handled,
            session,
            timestamp,
        }
    }

    /// Whether the error was handled by the application.
    pub fn handled(&self) -> bool {
        self.handled
    }

    /// The session that was active when the draft was built.
    pub fn session(&self) -> Option<&SessionSnapshot> {
        self.session.as_ref()
    }

    /// When the error was intercepted.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The type name of the outermost exception.
    pub fn error_class(&self) -> Option<&str> {
        self.exceptions.first().map(|e| e.error_class.as_str())
    }

    /// The message of the outermost exception.
    pub fn error_message(&self) -> Option<&str> {
        self.exceptions.first().and_then(|e| e.message.as_deref())
    }

    /// Finalizes the draft into an event.
    pub fn freeze(self) -> Event {
        Event {
            severity: self.severity,
            unhandled: !self.handled,
            context: self.context,
            grouping_hash: self.grouping_hash,
            user: self.user,
            api_key: self.api_key,
            exceptions: self.exceptions,
            metadata: self.metadata,
            app: self.app,
            device: self.device,
            threads: self.threads,
            session: self.session,
            received_at: self.timestamp,
        }
    }
}

/// A finalized event as it is handed to the serializer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The severity of the event.
    pub severity: Severity,
    /// Whether the error went unhandled.
    pub unhandled: bool,
    /// The context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// The grouping hash override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_hash: Option<String>,
    /// The affected user.
    #[serde(default, skip_serializing_if = "User::is_empty")]
    pub user: User,
    /// The api key override.  This travels on the notification, not the event.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// The exception chain, outermost error first.
    pub exceptions: Vec<ExceptionRecord>,
    /// Diagnostic metadata tabs.
    #[serde(rename = "metaData", default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Application information.
    pub app: AppInfo,
    /// Host information.
    pub device: DeviceInfo,
    /// Thread snapshots.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<ThreadRecord>,
    /// The session the event happened in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSnapshot>,
    /// When the error was intercepted.
    pub received_at: DateTime<Utc>,
}

/// The body of an error delivery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// The api key the events are reported for.
    pub api_key: String,
    /// The notifier that produced the payload.
    pub notifier: NotifierInfo,
    /// The reported events.
    pub events: Vec<Event>,
}
