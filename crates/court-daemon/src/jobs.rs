//! In-memory job registry.
//!
//! A job is an append-only event log plus a finished flag.  The runner task
//! pushes events; any number of SSE readers replay the log from an offset
//! and wait on the notify handle for more.  Keeping the full log (rather
//! than a drain-once queue) is what makes transport-level reconnection with
//! `Last-Event-ID` resumption possible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use court_proto::protocol::StreamEvent;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

pub struct Job {
    events: RwLock<Vec<StreamEvent>>,
    notify: Notify,
    finished: AtomicBool,
}

impl Job {
    fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            notify: Notify::new(),
            finished: AtomicBool::new(false),
        }
    }

    /// Append one event and wake any waiting stream handlers.  A terminal
    /// event also latches the finished flag.
    pub async fn push(&self, event: StreamEvent) {
        let terminal = event.is_terminal();
        self.events.write().await.push(event);
        if terminal {
            self.finished.store(true, Ordering::SeqCst);
        }
        self.notify.notify_waiters();
    }

    /// The event at `index`, if the runner has produced it yet.
    pub async fn event_at(&self, index: usize) -> Option<StreamEvent> {
        self.events.read().await.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Future that resolves on the next `push`.  Register it before checking
    /// the log length or the wakeup can be missed.
    pub fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.notify.notified()
    }
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh job under a new opaque id.
    pub async fn create(&self) -> (String, Arc<Job>) {
        let id = new_job_id();
        let job = Arc::new(Job::new());
        self.jobs.write().await.insert(id.clone(), Arc::clone(&job));
        debug!("registered job {id}");
        (id, job)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs.read().await.get(id).cloned()
    }
}

fn new_job_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
