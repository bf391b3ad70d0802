//! Results flowing from the message store back into the UI loop.

use thiserror::Error;

use super::message::Message;

/// Failure reported by the message store or its transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store rejected the credentials")]
    Unauthorized,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("store returned data that does not match the message contract: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Stable code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "STORE_UNAUTHORIZED",
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Rejected { .. } => "STORE_REJECTED",
            Self::InvalidData(_) => "STORE_INVALID_DATA",
        }
    }
}

/// Notifications produced by a live insert subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// The channel was accepted (or refused) by the store.
    Ready(Result<(), StoreError>),
    Inserted(Message),
    /// The channel ended without being asked to.
    Closed(Option<StoreError>),
}

/// Identifies one joined period; results from an older epoch are stale.
pub type SyncEpoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Subscription {
        epoch: SyncEpoch,
        event: SubscriptionEvent,
    },
    HistoryLoaded {
        epoch: SyncEpoch,
        result: Result<Vec<Message>, StoreError>,
    },
    SendCompleted {
        epoch: SyncEpoch,
        result: Result<Message, StoreError>,
    },
}

impl SyncEvent {
    pub fn epoch(&self) -> SyncEpoch {
        match self {
            Self::Subscription { epoch, .. }
            | Self::HistoryLoaded { epoch, .. }
            | Self::SendCompleted { epoch, .. } => *epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_codes_are_stable() {
        assert_eq!(StoreError::Unauthorized.code(), "STORE_UNAUTHORIZED");
        assert_eq!(
            StoreError::Unavailable("timeout".to_owned()).code(),
            "STORE_UNAVAILABLE"
        );
        assert_eq!(
            StoreError::Rejected {
                status: 400,
                message: "bad".to_owned()
            }
            .code(),
            "STORE_REJECTED"
        );
        assert_eq!(
            StoreError::InvalidData("id".to_owned()).code(),
            "STORE_INVALID_DATA"
        );
    }

    #[test]
    fn rejected_error_mentions_status() {
        let error = StoreError::Rejected {
            status: 409,
            message: "conflict".to_owned(),
        };

        assert!(error.to_string().contains("409"));
    }
}
