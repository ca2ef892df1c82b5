pub mod account;
pub mod cart;
pub mod command;
pub mod error;
pub mod ids;
pub mod money;
pub mod outcome;
pub mod traits;
pub mod transaction;

pub use account::{Account, AccountEvent, InsufficientFunds};
pub use cart::{Cart, CartItem};
pub use command::{Command, CommandKind};
pub use error::{DispatchFailed, Error};
pub use ids::{AccountId, EntryId, ResourceId};
pub use money::Money;
pub use outcome::{Advisory, Outcome, Rejection};
pub use traits::{Catalog, CommandStream, DeadLetterQueue, Ledger, OwnerDirectory};
pub use transaction::{EntryKind, EntryStatus, LedgerEntry};
