//! Credential rotation engine.
//!
//! A single actor validates access keys against the photo API and, when the
//! active key fails for a reason attributable to the key, walks the pool in
//! round-robin order until one validates or the sweep wraps back to where it
//! started. Candidates are probed strictly one after another.
//!
//! Connectivity failures never advance the rotation: the engine parks in
//! [`CredentialStatus::NoConnectivity`] with the candidate under test
//! remembered, and validates that same candidate again once the network is
//! back.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use super::handle::CredentialHandle;
use super::pool::CredentialPool;
use super::status::{CredentialStatus, ValidationOutcome, mask_credential};
use crate::constants::store_keys;
use crate::provider::CredentialValidator;
use crate::store::{self, Store};

/// Channel buffer size for the credential actor.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Messages processed by the credential actor.
#[derive(Debug)]
pub enum CredentialMessage {
    /// Load the persisted key and validate it in the background.
    InitializeOrResume { respond_to: oneshot::Sender<()> },
    /// The network came back; retry a validation parked on connectivity.
    ConnectivityRestored { respond_to: oneshot::Sender<bool> },
    /// Validate a key supplied by the user and restart rotation from it.
    AddCredential { credential: String, respond_to: oneshot::Sender<CredentialStatus> },
    /// The photo API rejected `credential` during normal use.
    Rejected { credential: String },
    /// Stop processing messages.
    Shutdown,
}

/// Point-in-time view of the credential engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSnapshot {
    pub status: CredentialStatus,
    /// Last key that passed validation (persisted).
    pub active_credential: Option<String>,
    /// Key currently under test, or parked waiting for the network.
    pub candidate: Option<String>,
    /// Pool index where the current sweep began.
    pub rotation_start_index: Option<usize>,
    /// Validation round trips since the engine started.
    pub attempts: u64,
    pub pool_size: usize,
}

impl CredentialSnapshot {
    /// Returns `true` once the engine rests until an external signal.
    ///
    /// A rejected supplied key rests in `Invalid` or `Failed` with no
    /// candidate left under test.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
            || (matches!(self.status, CredentialStatus::Invalid | CredentialStatus::Failed)
                && self.candidate.is_none())
    }

    /// Returns a copy with every key masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            active_credential: self.active_credential.as_deref().map(mask_credential),
            candidate: self.candidate.as_deref().map(mask_credential),
            ..self.clone()
        }
    }
}

/// What the rotation loop does after one validation.
enum Step {
    Done,
    Advance,
}

/// The actor that owns credential state.
pub struct CredentialEngine {
    pool: CredentialPool,
    store: Arc<dyn Store>,
    validator: Arc<dyn CredentialValidator>,
    snapshot: CredentialSnapshot,
    initialized: bool,
    /// The parked candidate was supplied by the user rather than the pool.
    supplied_candidate: bool,
    status_tx: watch::Sender<CredentialSnapshot>,
    receiver: mpsc::Receiver<CredentialMessage>,
}

impl CredentialEngine {
    /// Spawns the engine on the current tokio runtime and returns its handle.
    ///
    /// Nothing is validated until [`CredentialHandle::initialize`] is called.
    #[must_use]
    pub fn spawn(
        pool: CredentialPool,
        store: Arc<dyn Store>,
        validator: Arc<dyn CredentialValidator>,
    ) -> CredentialHandle {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let snapshot = CredentialSnapshot {
            active_credential: store::get_typed(store.as_ref(), store_keys::ACTIVE_CREDENTIAL),
            pool_size: pool.len(),
            ..CredentialSnapshot::default()
        };
        let (status_tx, status_rx) = watch::channel(snapshot.clone());

        let engine = Self {
            pool,
            store,
            validator,
            snapshot,
            initialized: false,
            supplied_candidate: false,
            status_tx,
            receiver,
        };

        tokio::spawn(engine.run());

        CredentialHandle::new(sender, status_rx)
    }

    async fn run(mut self) {
        tracing::debug!(pool_size = self.pool.len(), "credentials: engine starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CredentialMessage::InitializeOrResume { respond_to } => {
                    self.initialize_or_resume(respond_to).await;
                }
                CredentialMessage::ConnectivityRestored { respond_to } => {
                    let retried = self.on_connectivity_restored().await;
                    let _ = respond_to.send(retried);
                }
                CredentialMessage::AddCredential { credential, respond_to } => {
                    self.add_credential(credential).await;
                    let _ = respond_to.send(self.snapshot.status);
                }
                CredentialMessage::Rejected { credential } => self.on_rejected(credential).await,
                CredentialMessage::Shutdown => {
                    tracing::debug!("credentials: received shutdown message");
                    return;
                }
            }
        }

        tracing::debug!("credentials: channel closed, exiting");
    }

    async fn initialize_or_resume(&mut self, respond_to: oneshot::Sender<()>) {
        if self.initialized {
            let _ = respond_to.send(());
            return;
        }
        self.initialized = true;

        let persisted: Option<String> =
            store::get_typed(self.store.as_ref(), store_keys::ACTIVE_CREDENTIAL);
        self.snapshot.active_credential.clone_from(&persisted);
        self.set_status(CredentialStatus::Unknown);

        // Consumers proceed with the persisted key while it is re-validated.
        let _ = respond_to.send(());

        let credential = if let Some(credential) = persisted {
            tracing::debug!("credentials: resuming with persisted access key");
            credential
        } else {
            tracing::debug!("credentials: no persisted access key, starting with first candidate");
            self.pool.first().to_string()
        };

        self.validate_and_rotate(credential).await;
    }

    async fn on_connectivity_restored(&mut self) -> bool {
        if self.snapshot.status != CredentialStatus::NoConnectivity {
            return false;
        }
        let Some(candidate) = self.snapshot.candidate.clone() else {
            return false;
        };

        tracing::info!("credentials: connectivity restored, retrying validation");
        if self.supplied_candidate {
            self.validate_supplied(candidate).await;
        } else {
            self.validate_and_rotate(candidate).await;
        }
        true
    }

    async fn add_credential(&mut self, credential: String) {
        let credential = credential.trim().to_string();
        if credential.is_empty() {
            return;
        }

        tracing::info!("credentials: validating user supplied access key");
        self.initialized = true;
        self.snapshot.rotation_start_index = None;
        self.validate_supplied(credential).await;
    }

    async fn on_rejected(&mut self, credential: String) {
        let in_use = self.snapshot.active_credential.as_deref() == Some(credential.as_str());
        let status = self.snapshot.status;
        // Invalid or Failed with no candidate: a supplied key was turned down
        // and the active key is still the one in use.
        let serving = match status {
            CredentialStatus::Valid | CredentialStatus::Unknown => true,
            CredentialStatus::Invalid | CredentialStatus::Failed => self.snapshot.candidate.is_none(),
            CredentialStatus::Validating | CredentialStatus::NoConnectivity | CredentialStatus::Exhausted => false,
        };
        if !in_use || !serving {
            tracing::debug!(%status, "credentials: ignoring rejection of inactive key");
            return;
        }

        tracing::warn!("credentials: active access key rejected, re-validating");
        self.validate_and_rotate(credential).await;
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Validates a key the user supplied without sweeping the pool.
    ///
    /// A rejected key leaves its status for the user to read while the
    /// previously active key stays in use.
    async fn validate_supplied(&mut self, credential: String) {
        self.supplied_candidate = true;
        match self.validate(&credential).await {
            Step::Done => {}
            Step::Advance => {
                tracing::warn!("credentials: supplied access key not usable, keeping active key");
                self.snapshot.candidate = None;
                self.publish();
            }
        }
        if self.snapshot.status != CredentialStatus::NoConnectivity {
            self.supplied_candidate = false;
        }
    }

    /// Validates `credential`, advancing through the pool on key failures.
    async fn validate_and_rotate(&mut self, mut credential: String) {
        self.supplied_candidate = false;
        loop {
            match self.validate(&credential).await {
                Step::Done => return,
                Step::Advance => match self.advance_rotation(&credential) {
                    Some(next) => credential = next,
                    None => return,
                },
            }
        }
    }

    /// Runs one validation round trip and records its outcome.
    async fn validate(&mut self, credential: &str) -> Step {
        self.snapshot.candidate = Some(credential.to_string());
        self.snapshot.attempts += 1;
        self.set_status(CredentialStatus::Validating);

        let outcome = ValidationOutcome::from(self.validator.validate_credential(credential).await);

        match &outcome {
            ValidationOutcome::Valid => {
                tracing::info!(
                    credential = %mask_credential(credential),
                    "credentials: access key validated"
                );
                store::persist(self.store.as_ref(), store_keys::ACTIVE_CREDENTIAL, credential);
                self.snapshot.active_credential = Some(credential.to_string());
                self.snapshot.candidate = None;
                self.snapshot.rotation_start_index = None;
                self.set_status(CredentialStatus::Valid);
            }
            ValidationOutcome::NoConnectivity => {
                tracing::warn!("credentials: offline, validation parked until reconnect");
                self.set_status(CredentialStatus::NoConnectivity);
            }
            ValidationOutcome::Invalid => {
                tracing::warn!(
                    credential = %mask_credential(credential),
                    "credentials: access key rejected"
                );
                self.set_status(CredentialStatus::Invalid);
            }
            ValidationOutcome::RateLimited | ValidationOutcome::Failed(_) => {
                tracing::warn!(
                    credential = %mask_credential(credential),
                    outcome = ?outcome,
                    "credentials: access key unusable"
                );
                self.set_status(CredentialStatus::Failed);
            }
        }

        if outcome.advances_rotation() { Step::Advance } else { Step::Done }
    }

    /// Picks the candidate after `failed`, or marks the pool exhausted when
    /// the sweep has wrapped back to where it began.
    fn advance_rotation(&mut self, failed: &str) -> Option<String> {
        let Some(index) = self.pool.index_of(failed) else {
            // A key from outside the pool failed: sweep the pool from the top.
            self.snapshot.rotation_start_index = None;
            return Some(self.pool.first().to_string());
        };

        let start = *self.snapshot.rotation_start_index.get_or_insert(index);
        let next = self.pool.next_index(index);

        if next == start {
            tracing::warn!(
                pool_size = self.pool.len(),
                "credentials: every access key failed, pool exhausted"
            );
            self.snapshot.rotation_start_index = None;
            self.snapshot.candidate = None;
            self.set_status(CredentialStatus::Exhausted);
            return None;
        }

        tracing::debug!(from = index, to = next, "credentials: rotating to next candidate");
        self.pool.get(next).map(str::to_string)
    }

    fn set_status(&mut self, status: CredentialStatus) {
        if self.snapshot.status != status {
            tracing::debug!(from = %self.snapshot.status, to = %status, "credentials: status changed");
        }
        self.snapshot.status = status;
        self.publish();
    }

    fn publish(&self) { self.status_tx.send_replace(self.snapshot.clone()); }
}
