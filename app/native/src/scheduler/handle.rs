//! Handle for communicating with the scheduler actor.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::interval::Interval;
use super::messages::{FireOutcome, SchedulerMessage, SchedulerSnapshot};
use crate::error::ActorError;

/// Cheap, cloneable handle to the scheduler actor.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerMessage>,
}

impl SchedulerHandle {
    pub(crate) const fn new(sender: mpsc::Sender<SchedulerMessage>) -> Self { Self { sender } }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SchedulerMessage,
    ) -> Result<T, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(make(tx)).await.map_err(|_| ActorError::SendFailed)?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    fn notify(&self, msg: SchedulerMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Starts the schedule.
    ///
    /// Resolves after a past-due fire (if any) has completed and the timer is armed.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped.
    pub async fn start(&self) -> Result<(), ActorError> {
        self.request(|respond_to| SchedulerMessage::Start { respond_to }).await
    }

    /// Selects a new interval and restarts the countdown from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped.
    pub async fn set_interval(&self, interval: Interval) -> Result<(), ActorError> {
        self.request(|respond_to| SchedulerMessage::SetInterval { interval, respond_to }).await
    }

    /// Services an owed retry, if any. Returns `true` if a fire ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped.
    pub async fn connectivity_restored(&self) -> Result<bool, ActorError> {
        self.request(|respond_to| SchedulerMessage::ConnectivityRestored { respond_to }).await
    }

    /// Changes the wallpaper now and restarts the countdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped.
    pub async fn fire_now(&self) -> Result<FireOutcome, ActorError> {
        self.request(|respond_to| SchedulerMessage::FireNow { respond_to }).await
    }

    /// Re-applies the current wallpaper after the machine woke.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped or its queue is full.
    pub fn system_wake(&self) -> Result<(), ActorError> { self.notify(SchedulerMessage::SystemWake) }

    /// Re-applies the current wallpaper after the active space changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped or its queue is full.
    pub fn active_space_changed(&self) -> Result<(), ActorError> {
        self.notify(SchedulerMessage::ActiveSpaceChanged)
    }

    /// Returns a snapshot of the scheduler state.
    ///
    /// Waits behind any fire in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has stopped.
    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, ActorError> {
        self.request(|respond_to| SchedulerMessage::Query { respond_to }).await
    }

    /// Returns a snapshot, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the actor is busy for longer than `timeout`.
    pub async fn snapshot_timeout(&self, timeout: Duration) -> Result<SchedulerSnapshot, ActorError> {
        tokio::time::timeout(timeout, self.snapshot())
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    /// Stops the actor and cancels its timer.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has already stopped.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        self.sender.send(SchedulerMessage::Shutdown).await.map_err(|_| ActorError::SendFailed)
    }
}
