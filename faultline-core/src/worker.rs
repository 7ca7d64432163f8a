use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::transport::{DeliveryTask, PayloadKind, Transport};
use crate::utils::{lock, panic_message};

/// The transports used by the delivery workers, per payload kind.
#[derive(Clone, Default)]
pub(crate) struct Transports {
    pub events: Option<Arc<dyn Transport>>,
    pub sessions: Option<Arc<dyn Transport>>,
}

impl Transports {
    fn get(&self, kind: PayloadKind) -> Option<&Arc<dyn Transport>> {
        match kind {
            PayloadKind::Event => self.events.as_ref(),
            PayloadKind::Session => self.sessions.as_ref(),
        }
    }

    fn close(&self) {
        if let Some(ref transport) = self.events {
            transport.close();
        }
        if let Some(ref transport) = self.sessions {
            if !self
                .events
                .as_ref()
                .is_some_and(|events| Arc::ptr_eq(events, transport))
            {
                transport.close();
            }
        }
    }
}

#[derive(Default)]
struct Queue {
    tasks: VecDeque<DeliveryTask>,
    in_flight: usize,
    accepting: bool,
}

impl Queue {
    fn pending(&self) -> usize {
        self.tasks.len() + self.in_flight
    }
}

struct Shared {
    queue: Mutex<Queue>,
    /// Signalled when a task is queued or the worker stops.
    available: Condvar,
    /// Signalled when the last pending task finished.
    idle: Condvar,
    /// The `debug` option of the owning client.
    debug: AtomicBool,
}

/// A fixed pool of threads delivering tasks from a shared FIFO queue.
///
/// The queue is unbounded: when the transports cannot keep up, tasks
/// accumulate in memory rather than being dropped.
pub(crate) struct DeliveryWorker {
    shared: Arc<Shared>,
    transports: Transports,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DeliveryWorker {
    /// Spawns `count` worker threads delivering through `transports`.
    pub fn new(count: usize, transports: Transports, debug: bool) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                accepting: true,
                ..Default::default()
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
            debug: AtomicBool::new(debug),
        });

        let handles = (0..count.max(1))
            .filter_map(|idx| {
                let shared = shared.clone();
                let transports = transports.clone();
                thread::Builder::new()
                    .name(format!("faultline-delivery-{}", idx))
                    .spawn(move || run(&shared, &transports))
                    .map_err(|err| log::error!("failed to spawn delivery worker: {}", err))
                    .ok()
            })
            .collect();

        DeliveryWorker {
            shared,
            transports,
            handles: Mutex::new(handles),
        }
    }

    /// Follows a change of the client's `debug` option.
    pub fn set_debug(&self, debug: bool) {
        self.shared.debug.store(debug, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.shared.is_debug()
    }

    /// Queues a task.  Returns `false` if the worker no longer accepts tasks.
    pub fn enqueue(&self, task: DeliveryTask) -> bool {
        let mut queue = lock(&self.shared.queue);
        if !queue.accepting {
            faultline_debug!(
                debug: self.shared.is_debug();
                "worker is stopped, dropping {} payload",
                task.kind
            );
            return false;
        }
        queue.tasks.push_back(task);
        drop(queue);
        self.shared.available.notify_one();
        true
    }

    /// The number of queued plus in-flight tasks.
    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).pending()
    }

    /// Waits until all pending tasks are delivered.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.wait_idle(lock(&self.shared.queue), Instant::now() + timeout)
            .pending()
            == 0
    }

    /// Stops accepting tasks and drains the queue for at most `grace`.
    ///
    /// Returns the number of tasks that were abandoned, counting both the
    /// tasks that never started and those still in flight.
    pub fn stop(&self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        let mut queue = lock(&self.shared.queue);
        if !queue.accepting {
            return 0;
        }
        queue.accepting = false;
        self.shared.available.notify_all();

        let mut queue = self.wait_idle(queue, deadline);
        let dropped = queue.pending();
        queue.tasks.clear();
        drop(queue);
        // wake idle threads so they can exit
        self.shared.available.notify_all();

        let handles = std::mem::take(&mut *lock(&self.handles));
        if dropped == 0 {
            for handle in handles {
                handle.join().ok();
            }
        } else {
            log::warn!(
                "Application terminated. {} payload(s) were not sent",
                dropped
            );
        }
        self.transports.close();
        dropped
    }

    fn wait_idle<'a>(
        &self,
        mut queue: MutexGuard<'a, Queue>,
        deadline: Instant,
    ) -> MutexGuard<'a, Queue> {
        while queue.pending() > 0 {
            let timeout = match deadline.checked_duration_since(Instant::now()) {
                Some(timeout) if !timeout.is_zero() => timeout,
                _ => break,
            };
            queue = match self.shared.idle.wait_timeout(queue, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        queue
    }
}

impl Shared {
    fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }
}

impl Drop for DeliveryWorker {
    fn drop(&mut self) {
        // threads finish the queued tasks and exit on their own
        lock(&self.shared.queue).accepting = false;
        self.shared.available.notify_all();
    }
}

fn run(shared: &Shared, transports: &Transports) {
    loop {
        let task = {
            let mut queue = lock(&shared.queue);
            loop {
                if let Some(task) = queue.tasks.pop_front() {
                    queue.in_flight += 1;
                    break task;
                }
                if !queue.accepting {
                    return;
                }
                queue = match shared.available.wait(queue) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        };

        deliver(transports, &task, shared.is_debug());

        let mut queue = lock(&shared.queue);
        queue.in_flight -= 1;
        if queue.pending() == 0 {
            shared.idle.notify_all();
        }
    }
}

fn deliver(transports: &Transports, task: &DeliveryTask, debug: bool) {
    let Some(transport) = transports.get(task.kind) else {
        faultline_debug!(debug: debug; "no transport for {} payloads, dropping", task.kind);
        return;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| transport.deliver(task))) {
        Ok(Ok(())) => faultline_debug!(
            debug: debug;
            "delivered {} payload to {}",
            task.kind,
            task.endpoint
        ),
        Ok(Err(err)) => log::warn!("failed to deliver {} payload: {}", task.kind, err),
        Err(payload) => log::error!(
            "transport panicked while delivering {} payload: {}",
            task.kind,
            panic_message(payload.as_ref())
        ),
    }
}
