use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::protocol::EventDraft;
use crate::utils::panic_message;

/// What should happen with a draft after a callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationOutcome {
    /// Continue with the next callback.
    #[default]
    Proceed,
    /// Discard the draft.  No further callbacks run.
    Suppress,
}

impl From<bool> for MutationOutcome {
    /// `true` proceeds, `false` suppresses.
    fn from(proceed: bool) -> MutationOutcome {
        if proceed {
            MutationOutcome::Proceed
        } else {
            MutationOutcome::Suppress
        }
    }
}

/// A user supplied hook that can enrich or suppress an event draft.
///
/// Any `Fn(&mut EventDraft) -> MutationOutcome` is a callback.
///
/// ```
/// use faultline_core::{ClientOptions, EventDraft, MutationOutcome};
///
/// let mut options = ClientOptions::new();
/// options.add_callback(|draft: &mut EventDraft| {
///     draft.user.id = Some("12345".into());
///     draft.metadata.add("account", "plan", "premium");
///     MutationOutcome::Proceed
/// });
/// ```
pub trait Callback: Send + Sync {
    /// Runs the callback on a draft.
    fn run(&self, draft: &mut EventDraft) -> MutationOutcome;
}

impl<F> Callback for F
where
    F: Fn(&mut EventDraft) -> MutationOutcome + Send + Sync,
{
    fn run(&self, draft: &mut EventDraft) -> MutationOutcome {
        self(draft)
    }
}

/// Runs callbacks in order over a draft.
///
/// The first callback returning [`MutationOutcome::Suppress`] stops the
/// chain.  A callback that panics is skipped: the panic is logged and the
/// draft is restored to the state it had before that callback ran.
pub fn run_callbacks(draft: &mut EventDraft, callbacks: &[Arc<dyn Callback>]) -> MutationOutcome {
    for (idx, callback) in callbacks.iter().enumerate() {
        let before = draft.clone();
        match panic::catch_unwind(AssertUnwindSafe(|| callback.run(draft))) {
            Ok(MutationOutcome::Proceed) => {}
            Ok(MutationOutcome::Suppress) => {
                faultline_debug!("callback #{} suppressed the event", idx);
                return MutationOutcome::Suppress;
            }
            Err(payload) => {
                log::error!(
                    "callback #{} panicked, discarding its changes: {}",
                    idx,
                    panic_message(payload.as_ref())
                );
                *draft = before;
            }
        }
    }
    MutationOutcome::Proceed
}
