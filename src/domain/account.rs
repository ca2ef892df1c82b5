use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Error, Money, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Insufficient funds: required {required}, available {available}")]
pub struct InsufficientFunds {
    pub required: Money,
    pub available: Money,
}

/// Account lifecycle change kept next to the ledger so accounts can be
/// rebuilt on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccountEvent {
    Registered {
        account_id: AccountId,
        username: String,
        created_at: DateTime<Utc>,
    },
    StatusChanged {
        account_id: AccountId,
        active: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub balance: Money,             // never below zero, Money cannot represent it
    pub owned: HashSet<ResourceId>, // resources acquired through purchases
    pub active: bool,               // inactive accounts cannot deposit
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_id(AccountId::new(), username, Utc::now())
    }

    /// A fresh account under an identity that already exists elsewhere.
    pub fn with_id(id: AccountId, username: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: username.into(),
            balance: Money::ZERO,
            owned: HashSet::new(),
            active: true,
            created_at,
        }
    }

    pub fn registered_event(&self) -> AccountEvent {
        AccountEvent::Registered {
            account_id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }

    pub fn credit(&mut self, amount: Money) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(Error::NonPositiveAmount(amount));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::Overflow(format!("balance of account {}", self.id)))?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Money) -> Result<(), InsufficientFunds> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(InsufficientFunds {
                required: amount,
                available: self.balance,
            })?;
        Ok(())
    }

    /// Returns how many of the ids were not owned before.
    pub fn grant_resources<I>(&mut self, resource_ids: I) -> usize
    where
        I: IntoIterator<Item = ResourceId>,
    {
        resource_ids
            .into_iter()
            .filter(|id| self.owned.insert(*id))
            .count()
    }

    pub fn owns(&self, resource_id: &ResourceId) -> bool {
        self.owned.contains(resource_id)
    }
}
