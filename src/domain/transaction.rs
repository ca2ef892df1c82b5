use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, EntryId, Money, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    Deposit,
    Purchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Successful,
    Failed,
}

/// Immutable record of one monetary event and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub owner_id: AccountId,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Resources a successful purchase granted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceId>,
}

impl LedgerEntry {
    pub fn new(owner_id: AccountId, amount: Money, kind: EntryKind, status: EntryStatus) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId::new(),
            owner_id,
            kind,
            status,
            amount,
            created_at: now,
            completed_at: now,
            resources: Vec::new(),
        }
    }

    pub fn successful(owner_id: AccountId, amount: Money, kind: EntryKind) -> Self {
        Self::new(owner_id, amount, kind, EntryStatus::Successful)
    }

    pub fn failed(owner_id: AccountId, amount: Money, kind: EntryKind) -> Self {
        Self::new(owner_id, amount, kind, EntryStatus::Failed)
    }

    pub fn with_resources(mut self, resources: Vec<ResourceId>) -> Self {
        self.resources = resources;
        self
    }

    pub fn is_successful(&self) -> bool {
        self.status == EntryStatus::Successful
    }
}

impl core::fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:?}/{:?},owner={},entry={},amount={}",
            self.kind, self.status, self.owner_id, self.id, self.amount
        )
    }
}
