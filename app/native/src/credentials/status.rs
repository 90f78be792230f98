//! Credential validity status and validation outcome classification.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderError;

/// Current belief about the active access key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialStatus {
    /// Not validated yet; a persisted key is optimistically assumed usable.
    #[default]
    Unknown,
    /// A validation round trip is in flight.
    Validating,
    /// The active key passed validation.
    Valid,
    /// The last candidate was rejected by the API.
    Invalid,
    /// The last candidate failed for a reason other than rejection (quota, transport).
    Failed,
    /// Validation could not reach the API; waiting for the network.
    NoConnectivity,
    /// Every candidate failed in the current sweep.
    Exhausted,
}

impl CredentialStatus {
    /// Returns `true` for statuses the engine rests in until an external signal.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Valid | Self::NoConnectivity | Self::Exhausted)
    }

    /// Returns the user-facing message for statuses that need attention.
    #[must_use]
    pub const fn user_message(self) -> Option<&'static str> {
        match self {
            Self::NoConnectivity => Some("No internet connection."),
            Self::Invalid => Some("Access key is invalid. Replace it."),
            Self::Exhausted => Some("All access keys are exhausted. Try again later."),
            Self::Unknown | Self::Validating | Self::Valid | Self::Failed => None,
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Validating => "validating",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Failed => "failed",
            Self::NoConnectivity => "noConnectivity",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Classified result of one validation round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The key works.
    Valid,
    /// The network is down; the key's fitness is unknown.
    NoConnectivity,
    /// The API rejected the key.
    Invalid,
    /// The key is out of quota.
    RateLimited,
    /// Anything else.
    Failed(String),
}

impl ValidationOutcome {
    /// Returns `true` if the rotation should move on to the next candidate.
    #[must_use]
    pub const fn advances_rotation(&self) -> bool {
        matches!(self, Self::Invalid | Self::RateLimited | Self::Failed(_))
    }
}

impl From<Result<(), ProviderError>> for ValidationOutcome {
    fn from(result: Result<(), ProviderError>) -> Self {
        match result {
            Ok(()) => Self::Valid,
            Err(ProviderError::NoConnectivity) => Self::NoConnectivity,
            Err(ProviderError::Unauthorized) => Self::Invalid,
            Err(ProviderError::RateLimited) => Self::RateLimited,
            Err(err @ (ProviderError::CredentialsExhausted | ProviderError::Other(_))) => {
                Self::Failed(err.to_string())
            }
        }
    }
}

/// Masks an access key for display, keeping the first four characters.
#[must_use]
pub fn mask_credential(credential: &str) -> String {
    let visible: String = credential.chars().take(4).collect();
    if credential.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
