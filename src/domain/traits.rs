use std::collections::HashMap;

use futures::Stream;
use uuid::Uuid;

use crate::catalog::CatalogItem;
use crate::dlq::DeadLetter;
use crate::domain::{AccountEvent, AccountId, Command, EntryId, Error, LedgerEntry, ResourceId};

pub trait CommandStream {
    type CmdStream: Stream<Item = Result<Command, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::CmdStream;
}

pub trait DeadLetterQueue {
    fn report(&self, letter: &DeadLetter);
}

/// Resolves an account id to its display name.
pub trait OwnerDirectory {
    fn display_name(&self, account_id: AccountId) -> Option<String>;
}

pub trait Catalog: Send + Sync {
    fn item(&self, resource_id: ResourceId) -> Option<CatalogItem>;
}

/// Append-only store of monetary facts. Listings are newest first.
pub trait Ledger: Send + Sync {
    fn append(&self, entry: LedgerEntry) -> Result<EntryId, Error>;

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, Error>;

    fn list_all(&self) -> Result<Vec<LedgerEntry>, Error>;

    /// Stores an account lifecycle change. Stores that do not outlive the
    /// process have nothing to keep.
    fn record_account(&self, _event: AccountEvent) -> Result<(), Error> {
        Ok(())
    }

    /// Lifecycle changes recorded so far, oldest first.
    fn account_events(&self) -> Result<Vec<AccountEvent>, Error> {
        Ok(Vec::new())
    }

    /// A query that parses as a UUID selects that owner's entries, or the
    /// entry with that id when the owner has none. Anything else is a
    /// case-insensitive substring of the owner's display name.
    fn search(&self, query: &str, owners: &dyn OwnerDirectory) -> Result<Vec<LedgerEntry>, Error> {
        let query = query.trim();
        let all = self.list_all()?;

        if let Ok(id) = Uuid::parse_str(query) {
            let by_owner: Vec<LedgerEntry> = all
                .iter()
                .filter(|entry| *entry.owner_id.as_uuid() == id)
                .cloned()
                .collect();
            if !by_owner.is_empty() {
                return Ok(by_owner);
            }
            return Ok(all
                .into_iter()
                .filter(|entry| *entry.id.as_uuid() == id)
                .collect());
        }

        let needle = query.to_lowercase();
        let mut names: HashMap<AccountId, Option<String>> = HashMap::new();
        Ok(all
            .into_iter()
            .filter(|entry| {
                names
                    .entry(entry.owner_id)
                    .or_insert_with(|| {
                        owners
                            .display_name(entry.owner_id)
                            .map(|name| name.to_lowercase())
                    })
                    .as_deref()
                    .is_some_and(|name| name.contains(&needle))
            })
            .collect())
    }
}
