//! Handle for communicating with the credential engine.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use super::engine::{CredentialMessage, CredentialSnapshot};
use super::status::CredentialStatus;
use crate::error::ActorError;
use crate::provider::{CredentialSource, ProviderError};

/// Cheap, cloneable handle to the credential engine.
#[derive(Clone, Debug)]
pub struct CredentialHandle {
    sender: mpsc::Sender<CredentialMessage>,
    status: watch::Receiver<CredentialSnapshot>,
}

impl CredentialHandle {
    pub(crate) const fn new(
        sender: mpsc::Sender<CredentialMessage>,
        status: watch::Receiver<CredentialSnapshot>,
    ) -> Self {
        Self { sender, status }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CredentialMessage,
    ) -> Result<T, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(make(tx)).await.map_err(|_| ActorError::SendFailed)?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Loads the persisted key and starts validating it.
    ///
    /// Resolves once the persisted key (if any) is published; validation
    /// continues in the background. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has stopped.
    pub async fn initialize(&self) -> Result<(), ActorError> {
        self.request(|respond_to| CredentialMessage::InitializeOrResume { respond_to }).await
    }

    /// Retries a validation parked on connectivity. Returns `true` if one ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has stopped.
    pub async fn connectivity_restored(&self) -> Result<bool, ActorError> {
        self.request(|respond_to| CredentialMessage::ConnectivityRestored { respond_to }).await
    }

    /// Validates a user supplied key and returns the resulting status.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has stopped.
    pub async fn add_credential(
        &self,
        credential: impl Into<String>,
    ) -> Result<CredentialStatus, ActorError> {
        let credential = credential.into();
        self.request(|respond_to| CredentialMessage::AddCredential { credential, respond_to })
            .await
    }

    /// Reports that the photo API rejected `credential` during normal use.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has stopped.
    pub async fn report_rejected(&self, credential: impl Into<String>) -> Result<(), ActorError> {
        self.sender
            .send(CredentialMessage::Rejected { credential: credential.into() })
            .await
            .map_err(|_| ActorError::SendFailed)
    }

    /// Returns the latest published state.
    #[must_use]
    pub fn snapshot(&self) -> CredentialSnapshot { self.status.borrow().clone() }

    /// Returns the latest published status.
    #[must_use]
    pub fn status(&self) -> CredentialStatus { self.status.borrow().status }

    /// Returns a receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CredentialSnapshot> { self.status.clone() }

    /// Waits until validation reaches a state that needs no further work
    /// from the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine stops before settling.
    pub async fn wait_until_settled(&self) -> Result<CredentialSnapshot, ActorError> {
        let mut rx = self.status.clone();
        let snapshot = rx
            .wait_for(CredentialSnapshot::is_settled)
            .await
            .map_err(|_| ActorError::ReceiveFailed)?;
        Ok(snapshot.clone())
    }

    /// Stops the engine.
    pub async fn shutdown(&self) { let _ = self.sender.send(CredentialMessage::Shutdown).await; }

    /// Picks the key a photo API request should use right now.
    ///
    /// # Errors
    ///
    /// Fails fast when the pool is exhausted or the engine is parked offline.
    pub fn credential_for_request(&self) -> Result<String, ProviderError> {
        let snapshot = self.status.borrow();
        let picked = match snapshot.status {
            CredentialStatus::Exhausted => return Err(ProviderError::CredentialsExhausted),
            CredentialStatus::NoConnectivity => return Err(ProviderError::NoConnectivity),
            CredentialStatus::Valid | CredentialStatus::Unknown => {
                snapshot.active_credential.as_ref().or(snapshot.candidate.as_ref())
            }
            CredentialStatus::Validating | CredentialStatus::Invalid | CredentialStatus::Failed => {
                snapshot.candidate.as_ref().or(snapshot.active_credential.as_ref())
            }
        };

        picked
            .cloned()
            .ok_or_else(|| ProviderError::Other("no access key available yet".to_string()))
    }
}

#[async_trait]
impl CredentialSource for CredentialHandle {
    fn credential_for_request(&self) -> Result<String, ProviderError> {
        Self::credential_for_request(self)
    }

    async fn report_rejected(&self, credential: &str) {
        if let Err(err) = Self::report_rejected(self, credential).await {
            tracing::warn!(error = %err, "credentials: failed to report rejected key");
        }
    }
}
