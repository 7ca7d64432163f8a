use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::constants::{ARCH, RUSTC_VERSION, VERSION};
use crate::protocol::{
    AppInfo, DeviceInfo, EventDraft, ExceptionRecord, RawCapture, RawFrame, SessionSnapshot,
    StackFrame, ThreadInfo, ThreadRecord,
};
use crate::redact::is_in_project;
use crate::ClientOptions;

static RUNTIME_VERSIONS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    let mut versions = BTreeMap::new();
    versions.insert("faultline".into(), VERSION.into());
    if let Some(rustc) = RUSTC_VERSION {
        versions.insert("rustc".into(), rustc.into());
    }
    versions
});

/// Builds an event draft from a raw capture.
///
/// The exception chain is flattened outermost first and every frame is
/// classified against the configured project packages.  Application and
/// device information come from `options`.  The session snapshot is stored
/// on the draft as it was when the capture arrived.
pub fn build_event(
    capture: RawCapture,
    options: &ClientOptions,
    session: Option<SessionSnapshot>,
) -> EventDraft {
    let RawCapture {
        exception,
        severity,
        handled,
        context,
        metadata,
        threads,
        timestamp,
    } = capture;

    let exceptions = exception
        .chain()
        .map(|link| ExceptionRecord {
            error_class: link.type_name.clone(),
            message: link.message.clone(),
            stacktrace: process_frames(&link.frames, options),
        })
        .collect();

    let mut draft = EventDraft::new(exceptions, handled, session, timestamp);
    draft.severity = severity;
    draft.context = context;
    draft.metadata = metadata;
    draft.app = app_info(options);
    draft.device = device_info(options);
    if options.send_threads {
        draft.threads = threads
            .into_iter()
            .map(|thread| process_thread(thread, options))
            .collect();
    }
    draft
}

/// Adds the calling thread to captures that carry no threads.
///
/// Only done when `send_threads` is set.  With the `backtrace` feature the
/// thread's stack is resolved as well.
pub(crate) fn attach_current_thread(
    mut capture: RawCapture,
    options: &ClientOptions,
) -> RawCapture {
    if options.send_threads && capture.threads.is_empty() {
        #[cfg(feature = "backtrace")]
        let thread = crate::backtrace_support::current_thread();
        #[cfg(not(feature = "backtrace"))]
        let thread = ThreadInfo::current();
        capture.threads.push(thread);
    }
    capture
}

fn process_frames(frames: &[RawFrame], options: &ClientOptions) -> Vec<StackFrame> {
    frames
        .iter()
        .map(|frame| {
            let in_project = is_in_project(&frame.module, &options.project_packages);
            StackFrame::new(frame.clone(), in_project)
        })
        .collect()
}

fn process_thread(thread: ThreadInfo, options: &ClientOptions) -> ThreadRecord {
    ThreadRecord {
        stacktrace: process_frames(&thread.frames, options),
        id: thread.id,
        name: thread.name,
        error_reported_thread: thread.current,
    }
}

pub(crate) fn app_info(options: &ClientOptions) -> AppInfo {
    AppInfo {
        release_stage: Some(options.release_stage().into()),
        version: options.app_version.as_deref().map(Into::into),
        app_type: options.app_type.as_deref().map(Into::into),
    }
}

pub(crate) fn device_info(options: &ClientOptions) -> DeviceInfo {
    DeviceInfo {
        hostname: options.hostname.as_deref().map(Into::into),
        os_name: std::env::consts::OS.into(),
        os_arch: ARCH.into(),
        runtime_versions: RUNTIME_VERSIONS.clone(),
    }
}
