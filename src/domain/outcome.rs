use crate::domain::{DispatchFailed, LedgerEntry, Money};

/// Business reason a deposit or purchase was turned down. Always backed by
/// a FAILED ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    #[error("Account is inactive")]
    AccountInactive,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Advisory {
    #[error("Deposit notification failed: {0}")]
    DepositNotificationFailed(DispatchFailed),

    #[error("Purchase completed but its confirmation could not be sent: {0}")]
    PurchaseNotificationFailure(DispatchFailed),
}

/// Result of a deposit or purchase that reached a ledger entry.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Committed {
        entry: LedgerEntry,
        advisory: Option<Advisory>,
    },
    Rejected {
        entry: LedgerEntry,
        reason: Rejection,
        advisory: Option<Advisory>,
    },
}

impl Outcome {
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            Outcome::Committed { entry, .. } | Outcome::Rejected { entry, .. } => entry,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Rejected { reason, .. } => Some(reason),
            Outcome::Committed { .. } => None,
        }
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            Outcome::Committed { advisory, .. } | Outcome::Rejected { advisory, .. } => {
                advisory.as_ref()
            }
        }
    }
}
