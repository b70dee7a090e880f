//! Timers backed by tokio tasks
//!
//! Each armed timer is a task that sleeps and then sends its channel and
//! token back to the main loop, which hands them to `Lobby::fire_timer`.
//! Cancelling aborts the task.

use parlor_core::{ChannelId, Scheduler, TimerHandle, TimerToken};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub type Expiry = (ChannelId, TimerToken);

#[derive(Debug)]
pub struct TokioScheduler {
    expired: mpsc::UnboundedSender<Expiry>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Expiry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { expired: tx }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(
        &mut self,
        channel: &ChannelId,
        token: TimerToken,
        delay: Duration,
    ) -> Box<dyn TimerHandle> {
        let tx = self.expired.clone();
        let channel = channel.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send((channel, token)).is_err() {
                debug!(token, "Timer expired after the host stopped");
            }
        });
        Box::new(TaskTimer(task))
    }
}

#[derive(Debug)]
struct TaskTimer(JoinHandle<()>);

impl TimerHandle for TaskTimer {
    fn cancel(self: Box<Self>) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_delivered() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let channel = ChannelId::new("lobby");
        let _handle = scheduler.schedule(&channel, 7, Duration::from_secs(5));

        let (fired_channel, token) = rx.recv().await.unwrap();
        assert_eq!(fired_channel, channel);
        assert_eq!(token, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let channel = ChannelId::new("lobby");
        scheduler
            .schedule(&channel, 1, Duration::from_secs(5))
            .cancel();
        let _live = scheduler.schedule(&channel, 2, Duration::from_secs(10));

        let (_, token) = rx.recv().await.unwrap();
        assert_eq!(token, 2);
    }
}
