//! Error types for droplet adapter operations.
//!
//! Variants that wrap a provider rejection display the provider's message
//! verbatim, so what the operator reads is what DigitalOcean said.

use thiserror::Error;

/// Errors that can occur while driving a droplet through the adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{message}")]
    DropletFind { droplet_id: u64, message: String },

    #[error("{message}")]
    DropletList { message: String },

    #[error("{message}")]
    DropletStart { droplet_id: u64, message: String },

    #[error("{message}")]
    DropletShutdown { droplet_id: u64, message: String },

    #[error("{message}")]
    SnapshotCreate { droplet_id: u64, message: String },

    /// The action finished in the errored state.
    #[error("{message}")]
    Event { action_id: u64, message: String },

    /// The action's state could not be queried.
    #[error("{message}")]
    EventLookup { action_id: u64, message: String },

    #[error("Event {action_id} is not finished after {waited_secs}s")]
    EventTimeout { action_id: u64, waited_secs: u64 },

    #[error("Droplet {droplet_id} not responding for shutdown!")]
    ShutdownTimeout { droplet_id: u64, waited_secs: u64 },

    #[error("Invalid adapter options: {0}")]
    InvalidOptions(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl ProviderError {
    /// Whether the failure came from a wait running out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::EventTimeout { .. } | Self::ShutdownTimeout { .. }
        )
    }

    /// Convert provider error to user-friendly message with suggestions
    pub fn user_friendly(&self) -> String {
        match self {
            Self::ShutdownTimeout { .. } => format!(
                "{}\n💡 Raise --timeout, or use --stop-by-power to cut power instead of a graceful shutdown",
                self
            ),
            Self::EventTimeout { .. } => format!(
                "{}\n💡 Raise --timeout; the action may still complete in the DigitalOcean control panel",
                self
            ),
            Self::DropletFind { message, .. } | Self::DropletList { message }
                if message.contains("authenticate") =>
            {
                format!(
                    "{}\n💡 Check the DIGITAL_OCEAN_ACCESS_TOKEN environment variable or --digital-ocean-access-token",
                    self
                )
            }
            Self::InvalidOptions(_) => format!(
                "{}\n💡 --delay and --timeout take whole seconds greater than zero",
                self
            ),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = ProviderError::DropletFind {
            droplet_id: 100823,
            message: "Droplet Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Droplet Not Found");
        assert_eq!(err.user_friendly(), "Droplet Not Found");
    }

    #[test]
    fn test_shutdown_timeout_message() {
        let err = ProviderError::ShutdownTimeout {
            droplet_id: 100823,
            waited_secs: 600,
        };
        assert_eq!(err.to_string(), "Droplet 100823 not responding for shutdown!");
        assert!(err.is_timeout());
        assert!(err.user_friendly().contains("--stop-by-power"));
    }

    #[test]
    fn test_auth_failure_hint() {
        let err = ProviderError::DropletList {
            message: "Unable to authenticate you".to_string(),
        };
        assert!(err.user_friendly().contains("DIGITAL_OCEAN_ACCESS_TOKEN"));
        assert!(!err.is_timeout());
    }
}
