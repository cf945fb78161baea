//! Cancellable one-shot timers that deliver a command into a match mailbox.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::WeakSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::MatchCommand;

/// How long a team has to settle on its candidate.
pub const SELECTION_DURATION: Duration = Duration::from_secs(33);

/// How long the round participants have to act.
pub const ROUND_DURATION: Duration = Duration::from_secs(33);

/// Wall-clock milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// When a timer started and how long it runs, for resyncing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub started_at_ms: u64,
    pub duration: Duration,
}

impl TimerSnapshot {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    pub fn end_at_ms(&self) -> u64 {
        self.started_at_ms + self.duration_ms()
    }
}

/// At most one pending timer. Starting a new one aborts the previous one.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    task: Option<JoinHandle<()>>,
    snapshot: Option<TimerSnapshot>,
}

impl PhaseTimer {
    /// Deliver `command` to `mailbox` after `duration`.
    pub fn start(
        &mut self,
        mailbox: &WeakSender<MatchCommand>,
        duration: Duration,
        command: MatchCommand,
    ) -> TimerSnapshot {
        self.cancel();

        let mailbox = mailbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(sender) = mailbox.upgrade() else {
                debug!(command = command.kind(), "match gone before timer fired");
                return;
            };
            if let Err(e) = sender.send(command).await {
                debug!(command = e.0.kind(), "match closed before timer delivery");
            }
        });

        let snapshot = TimerSnapshot {
            started_at_ms: epoch_millis(),
            duration,
        };
        self.task = Some(task);
        self.snapshot = Some(snapshot);
        snapshot
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.snapshot = None;
    }

    pub fn snapshot(&self) -> Option<TimerSnapshot> {
        self.snapshot
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
