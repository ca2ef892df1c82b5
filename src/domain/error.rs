use crate::domain::{AccountId, Money, ResourceId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence failed with: {0}")]
    Persistence(String),

    #[error("Purchase aborted before commit: {0}")]
    FailedPurchase(String),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("No account registered as {0}")]
    UnknownUsername(String),

    #[error("Username {0} already exists")]
    UsernameTaken(String),

    #[error("Username cannot be blank")]
    BlankUsername,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Money),

    #[error("Deposit of {amount} is outside the allowed range {min}..={max}")]
    DepositOutOfRange { amount: Money, min: Money, max: Money },

    #[error("Arithmetic overflow in {0}")]
    Overflow(String),

    #[error("Resource {0} is not in the catalog")]
    UnknownResource(ResourceId),

    #[error("Resource {0} is already owned")]
    AlreadyOwned(ResourceId),

    #[error("Resource {0} is already in the cart")]
    AlreadyInCart(ResourceId),

    #[error("Resource {0} is not in the cart")]
    NotInCart(ResourceId),

    #[error("Cart of account {0} is empty")]
    EmptyCart(AccountId),
}

/// Advisory failure of a post-commit notification. It never means the
/// monetary operation itself failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Notification dispatch to account {account_id} failed: {reason}")]
pub struct DispatchFailed {
    pub account_id: AccountId,
    pub reason: String,
}
