//! Session aggregation
//!
//! Sessions and the errors that happen during them are counted in
//! one-minute windows aligned to the Unix epoch.  A window is flushed once
//! it has closed, after which it is sealed: late increments that would
//! target it are attributed to the first window that is still open.
//!
//! Sealing never moves past the window before the one the system clock is
//! in.  A flush for a time ahead of the clock still takes the windows it
//! asks for, but increments made afterwards land in their own window
//! instead of in a future one that periodic flushes would not reach yet.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::constants::SESSION_WINDOW;
use crate::protocol::{SessionEvents, SessionSnapshot, SessionSummary};
use crate::types::{random_uuid, DateTime, Utc};
use crate::utils::lock;

type WindowId = i64;

fn window_of(ts: DateTime<Utc>) -> WindowId {
    ts.timestamp().div_euclid(SESSION_WINDOW.as_secs() as i64)
}

fn window_start(window: WindowId) -> DateTime<Utc> {
    DateTime::from_timestamp(window * SESSION_WINDOW.as_secs() as i64, 0).unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Bucket {
    sessions_started: u64,
    handled: u64,
    unhandled: u64,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<WindowId, Bucket>,
    sealed_through: Option<WindowId>,
    active: Option<SessionSnapshot>,
}

impl State {
    fn bucket_mut(&mut self, ts: DateTime<Utc>) -> &mut Bucket {
        let window = match self.sealed_through {
            Some(sealed) if window_of(ts) <= sealed => sealed + 1,
            _ => window_of(ts),
        };
        self.buckets.entry(window).or_default()
    }

    fn take_through(&mut self, last: WindowId, seal_limit: WindowId) -> Vec<SessionSummary> {
        let mut closed: Vec<WindowId> = self
            .buckets
            .keys()
            .copied()
            .filter(|window| *window <= last)
            .collect();
        closed.sort_unstable();
        let sealed = self.sealed_through.map_or(last, |s| s.max(last));
        self.sealed_through = Some(sealed.min(seal_limit));
        closed
            .into_iter()
            .filter_map(|window| {
                let bucket = self.buckets.remove(&window)?;
                Some(SessionSummary {
                    started_at: window_start(window),
                    sessions_started: bucket.sessions_started,
                    handled: bucket.handled,
                    unhandled: bucket.unhandled,
                })
            })
            .collect()
    }
}

/// Counts sessions and handled/unhandled errors per time window.
///
/// All operations take a single lock, so an increment and the
/// remove-then-seal step of a flush never interleave.  Windows are only
/// created by an increment, which means a window without any activity never
/// shows up in a flush.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    state: Mutex<State>,
}

impl SessionAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> SessionAggregator {
        SessionAggregator::default()
    }

    /// Starts a new session and makes it the active one.
    pub fn start_session(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let snapshot = SessionSnapshot {
            id: random_uuid(),
            started_at: now,
            events: SessionEvents::default(),
        };
        let mut state = lock(&self.state);
        state.bucket_mut(now).sessions_started += 1;
        state.active = Some(snapshot.clone());
        snapshot
    }

    /// The active session, if one was started.
    pub fn current_session(&self) -> Option<SessionSnapshot> {
        lock(&self.state).active.clone()
    }

    /// Counts a handled error.
    pub fn record_handled(&self, now: DateTime<Utc>) -> Option<SessionSnapshot> {
        self.record(now, true)
    }

    /// Counts an unhandled error.
    pub fn record_unhandled(&self, now: DateTime<Utc>) -> Option<SessionSnapshot> {
        self.record(now, false)
    }

    /// Counts an error in the window of `now` and in the active session.
    ///
    /// Returns the active session with its updated counts.
    pub fn record(&self, now: DateTime<Utc>, handled: bool) -> Option<SessionSnapshot> {
        let mut state = lock(&self.state);
        let bucket = state.bucket_mut(now);
        if handled {
            bucket.handled += 1;
        } else {
            bucket.unhandled += 1;
        }
        let active = state.active.as_mut()?;
        if handled {
            active.events.handled += 1;
        } else {
            active.events.unhandled += 1;
        }
        Some(active.clone())
    }

    /// Removes and returns every window that closed before `now`.
    ///
    /// The returned summaries are ordered oldest first.
    pub fn take_closed(&self, now: DateTime<Utc>) -> Vec<SessionSummary> {
        self.take_closed_at(now, Utc::now())
    }

    fn take_closed_at(&self, now: DateTime<Utc>, wall: DateTime<Utc>) -> Vec<SessionSummary> {
        lock(&self.state).take_through(window_of(now) - 1, window_of(wall) - 1)
    }

    /// Removes and returns every window, including the current one.
    pub fn take_all(&self) -> Vec<SessionSummary> {
        let mut state = lock(&self.state);
        match state.buckets.keys().max().copied() {
            Some(last) => state.take_through(last, window_of(Utc::now()) - 1),
            None => vec![],
        }
    }

    /// The number of windows holding unflushed counts.
    pub fn pending_windows(&self) -> usize {
        lock(&self.state).buckets.len()
    }
}

/// Background Session Flusher
///
/// Calls the given tick function once every `interval` on its own thread,
/// until it is dropped.
pub(crate) struct SessionFlusher {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl SessionFlusher {
    pub fn new<F>(interval: Duration, tick: F) -> Self
    where
        F: Fn(DateTime<Utc>) + Send + 'static,
    {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let worker_shutdown = shutdown.clone();
        let worker = std::thread::Builder::new()
            .name("faultline-session-flusher".into())
            .spawn(move || {
                let (flag, cvar) = worker_shutdown.as_ref();
                let mut stopped = lock(flag);
                loop {
                    stopped = match cvar.wait_timeout(stopped, interval) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    };
                    if *stopped {
                        return;
                    }
                    // tick without holding the lock
                    drop(stopped);
                    tick(Utc::now());
                    stopped = lock(flag);
                }
            })
            .map_err(|err| log::error!("failed to spawn session flusher: {}", err))
            .ok();

        SessionFlusher { shutdown, worker }
    }
}

impl Drop for SessionFlusher {
    fn drop(&mut self) {
        let (flag, cvar) = self.shutdown.as_ref();
        *lock(flag) = true;
        cvar.notify_one();
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_counts_within_one_window() {
        let sessions = SessionAggregator::new();
        sessions.start_session(at(600));
        for _ in 0..3 {
            sessions.record_handled(at(610));
        }
        for _ in 0..2 {
            sessions.record_unhandled(at(650));
        }

        assert!(sessions.take_closed(at(659)).is_empty());

        let flushed = sessions.take_closed(at(660));
        assert_eq!(
            flushed,
            vec![SessionSummary {
                started_at: at(600),
                sessions_started: 1,
                handled: 3,
                unhandled: 2,
            }]
        );

        sessions.record_handled(at(670));
        let flushed = sessions.take_closed(at(720));
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].handled, 1);
        assert_eq!(flushed[0].unhandled, 0);
        assert_eq!(flushed[0].sessions_started, 0);
    }

    #[test]
    fn test_active_session_snapshot() {
        let sessions = SessionAggregator::new();
        assert!(sessions.record_handled(at(0)).is_none());
        assert!(sessions.current_session().is_none());

        let started = sessions.start_session(at(0));
        assert_eq!(started.events, SessionEvents::default());
        let snapshot = sessions.record_handled(at(1)).unwrap();
        assert_eq!(snapshot.id, started.id);
        assert_eq!(snapshot.events.handled, 1);
        let snapshot = sessions.record_unhandled(at(2)).unwrap();
        assert_eq!(snapshot.events.unhandled, 1);
        assert_eq!(sessions.current_session(), Some(snapshot));
    }

    #[test]
    fn test_late_increment_goes_to_open_window() {
        let sessions = SessionAggregator::new();
        sessions.record_handled(at(0));
        let flushed = sessions.take_closed(at(130));
        assert_eq!(flushed.len(), 1);

        // window 1 was sealed by the flush even though it had no counts
        sessions.record_handled(at(70));
        sessions.record_unhandled(at(10));
        let flushed = sessions.take_closed(at(180));
        assert_eq!(
            flushed,
            vec![SessionSummary {
                started_at: at(120),
                sessions_started: 0,
                handled: 1,
                unhandled: 1,
            }]
        );
    }

    #[test]
    fn test_seal_stays_behind_the_clock() {
        let sessions = SessionAggregator::new();
        sessions.record_handled(at(0));
        assert_eq!(sessions.take_closed_at(at(600), at(30)).len(), 1);

        sessions.record_handled(at(40));
        assert!(sessions.take_closed_at(at(50), at(50)).is_empty());
        assert_eq!(
            sessions.take_closed_at(at(60), at(60)),
            vec![SessionSummary {
                started_at: at(0),
                sessions_started: 0,
                handled: 1,
                unhandled: 0,
            }]
        );
    }

    #[test]
    fn test_idle_windows_are_not_emitted() {
        let sessions = SessionAggregator::new();
        sessions.record_handled(at(0));
        sessions.record_handled(at(300));
        let flushed = sessions.take_closed(at(600));
        let starts: Vec<_> = flushed.iter().map(|s| s.started_at).collect();
        assert_eq!(starts, vec![at(0), at(300)]);
        assert!(sessions.take_closed(at(6000)).is_empty());
    }

    #[test]
    fn test_take_all_includes_current_window() {
        let sessions = SessionAggregator::new();
        sessions.record_handled(at(0));
        sessions.record_unhandled(at(100));
        assert_eq!(sessions.pending_windows(), 2);
        assert_eq!(sessions.take_all().len(), 2);
        assert_eq!(sessions.pending_windows(), 0);

        sessions.record_handled(at(100));
        let flushed = sessions.take_all();
        assert_eq!(flushed[0].started_at, at(120));
    }

    #[test]
    fn test_concurrent_increments_during_flush() {
        let sessions = Arc::new(SessionAggregator::new());
        let now = Utc::now();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let sessions = sessions.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        sessions.record_handled(now);
                    }
                })
            })
            .collect();

        let mut total = 0;
        for _ in 0..50 {
            total += sessions
                .take_all()
                .iter()
                .map(|s| s.handled)
                .sum::<u64>();
        }
        for thread in threads {
            thread.join().unwrap();
        }
        total += sessions.take_all().iter().map(|s| s.handled).sum::<u64>();
        assert_eq!(total, 8 * 500);
    }

    #[test]
    fn test_flusher_ticks_until_dropped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let flusher = SessionFlusher::new(Duration::from_millis(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(200));
        drop(flusher);
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen > 0);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }
}
