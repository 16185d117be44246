//! LifecycleController — the job state machine.
//!
//! Idle → Submitting → Streaming → Completed, with Failed reachable from
//! Submitting (request rejected) and the terminal states exited only by a
//! new submission.  The controller owns the aggregator (and with it the
//! active table), the elapsed-seconds counter task, and the abort handle of
//! the stream subscriber — the three things that must stay in lockstep with
//! phase transitions.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use court_proto::protocol::StreamEvent;

use crate::aggregator::ResultAggregator;
use crate::app::AppMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Streaming,
    Completed,
    Failed,
}

impl Phase {
    /// Submission is disabled and the timer runs exactly while busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Submitting | Phase::Streaming)
    }

    /// Short label for the status bar.
    pub fn badge(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::Streaming => "checking",
            Phase::Completed => "done",
            Phase::Failed => "failed",
        }
    }
}

#[derive(Default)]
pub struct LifecycleController {
    phase: Phase,
    elapsed_secs: u64,
    aggregator: ResultAggregator,
    timer: Option<AbortHandle>,
    stream: Option<AbortHandle>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn log_line(&mut self, msg: String) {
        self.aggregator.push_log(msg);
    }

    /// Enter Submitting: discard prior results/logs, close any stream still
    /// open from the previous job (close-before-reopen, so two streams never
    /// write into one table), and restart the 1 Hz elapsed counter from zero.
    pub fn begin_submit(&mut self, tx: mpsc::Sender<AppMessage>) {
        self.close_stream();
        self.stop_timer();
        self.aggregator.reset();
        self.elapsed_secs = 0;
        self.timer = Some(spawn_timer(tx));
        self.phase = Phase::Submitting;
        info!("lifecycle: → Submitting");
    }

    /// The submission request failed; nothing was ever streamed.
    pub fn submit_failed(&mut self, message: &str) {
        self.stop_timer();
        self.aggregator.push_log(format!("Error: {message}"));
        self.phase = Phase::Failed;
        warn!("lifecycle: → Failed ({message})");
    }

    /// Submission succeeded and the subscriber task is running.
    pub fn stream_opened(&mut self, stream: AbortHandle) {
        self.stream = Some(stream);
        self.phase = Phase::Streaming;
        info!("lifecycle: → Streaming");
    }

    /// Fold one stream event in.  Ignored outside Streaming — a late event
    /// from an aborted subscriber must not corrupt a finished table.
    pub fn on_stream_event(&mut self, event: StreamEvent) {
        if self.phase != Phase::Streaming {
            return;
        }
        if self.aggregator.apply(event) {
            self.close_stream();
            self.stop_timer();
            self.phase = Phase::Completed;
            info!("lifecycle: → Completed after {}s", self.elapsed_secs);
        }
    }

    pub fn on_timer_tick(&mut self) {
        if self.phase.is_busy() {
            self.elapsed_secs += 1;
        }
    }

    fn close_stream(&mut self) {
        if let Some(h) = self.stream.take() {
            h.abort();
        }
    }

    /// Idempotent — stopping an already-stopped counter is a no-op.
    fn stop_timer(&mut self) {
        if let Some(h) = self.timer.take() {
            h.abort();
        }
    }
}

fn spawn_timer(tx: mpsc::Sender<AppMessage>) -> AbortHandle {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; the counter starts at zero.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(AppMessage::TimerTick).await.is_err() {
                break;
            }
        }
    })
    .abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_proto::results::CellValue;

    fn dummy_handle() -> AbortHandle {
        tokio::spawn(std::future::pending::<()>()).abort_handle()
    }

    fn partial(court: &str) -> StreamEvent {
        StreamEvent::ResultPartial {
            date: "2024-03-01".into(),
            court: court.into(),
            value: CellValue::Slots(vec![]),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ticks_once_per_second_while_busy() {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(16);
        let mut lc = LifecycleController::new();
        lc.begin_submit(tx);
        assert_eq!(lc.phase(), Phase::Submitting);

        for _ in 0..3 {
            match rx.recv().await {
                Some(AppMessage::TimerTick) => lc.on_timer_tick(),
                other => panic!("expected a tick, got {other:?}"),
            }
        }
        assert_eq!(lc.elapsed_secs(), 3);

        // Failing the submission stops the counter; the channel drains dry.
        lc.submit_failed("boom");
        assert_eq!(lc.phase(), Phase::Failed);
        assert!(
            tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .is_err()
                || rx.try_recv().is_err(),
            "timer kept ticking after Failed"
        );
    }

    #[tokio::test]
    async fn ticks_outside_busy_span_do_not_count() {
        let mut lc = LifecycleController::new();
        lc.on_timer_tick();
        assert_eq!(lc.elapsed_secs(), 0);
        assert_eq!(lc.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn events_are_ignored_outside_streaming() {
        let mut lc = LifecycleController::new();
        lc.on_stream_event(partial("1"));
        assert!(lc.aggregator().table().is_empty());
        assert_eq!(lc.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn done_moves_to_completed_and_seals_the_table() {
        let (tx, _rx) = mpsc::channel::<AppMessage>(16);
        let mut lc = LifecycleController::new();
        lc.begin_submit(tx);
        lc.stream_opened(dummy_handle());
        assert_eq!(lc.phase(), Phase::Streaming);

        lc.on_stream_event(partial("1"));
        lc.on_stream_event(StreamEvent::Done { results: None });
        assert_eq!(lc.phase(), Phase::Completed);
        assert_eq!(lc.aggregator().table().cell_count(), 1);

        // Anything arriving after the terminal event changes nothing.
        lc.on_stream_event(partial("2"));
        assert_eq!(lc.aggregator().table().cell_count(), 1);
        assert_eq!(lc.phase(), Phase::Completed);
    }

    #[tokio::test]
    async fn resubmit_resets_counter_and_state() {
        let (tx, _rx) = mpsc::channel::<AppMessage>(16);
        let mut lc = LifecycleController::new();
        lc.begin_submit(tx.clone());
        lc.stream_opened(dummy_handle());
        lc.on_stream_event(partial("1"));
        lc.on_timer_tick();
        lc.on_stream_event(StreamEvent::Done { results: None });
        assert_eq!(lc.elapsed_secs(), 1);

        lc.begin_submit(tx);
        assert_eq!(lc.phase(), Phase::Submitting);
        assert_eq!(lc.elapsed_secs(), 0);
        assert!(lc.aggregator().table().is_empty());
        assert!(lc.aggregator().logs().is_empty());
    }

    #[tokio::test]
    async fn terminal_transition_is_idempotent_about_timer_and_stream() {
        let (tx, _rx) = mpsc::channel::<AppMessage>(16);
        let mut lc = LifecycleController::new();
        lc.begin_submit(tx);
        lc.stream_opened(dummy_handle());
        lc.on_stream_event(StreamEvent::Done { results: None });
        // A second Done is ignored; stopping the already-stopped timer again
        // must not panic.
        lc.on_stream_event(StreamEvent::Done { results: None });
        lc.stop_timer();
        assert_eq!(lc.phase(), Phase::Completed);
    }

    #[tokio::test]
    async fn failure_is_exited_only_by_a_new_submit() {
        let (tx, _rx) = mpsc::channel::<AppMessage>(16);
        let mut lc = LifecycleController::new();
        lc.begin_submit(tx.clone());
        lc.submit_failed("backend said no");
        assert_eq!(lc.phase(), Phase::Failed);
        assert_eq!(lc.aggregator().logs(), &["Error: backend said no"]);

        lc.on_stream_event(partial("1"));
        assert_eq!(lc.phase(), Phase::Failed);

        lc.begin_submit(tx);
        assert_eq!(lc.phase(), Phase::Submitting);
    }
}
