use serde::Serialize;

use crate::domain::{Error, Money, ResourceId};

/// A pending acquisition. The price is locked when the item is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub resource_id: ResourceId,
    pub title: String,
    pub locked_price: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, resource_id: &ResourceId) -> bool {
        self.items.iter().any(|item| item.resource_id == *resource_id)
    }

    pub fn add(&mut self, item: CartItem) -> Result<(), Error> {
        if self.contains(&item.resource_id) {
            return Err(Error::AlreadyInCart(item.resource_id));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, resource_id: &ResourceId) -> Result<CartItem, Error> {
        let position = self
            .items
            .iter()
            .position(|item| item.resource_id == *resource_id)
            .ok_or(Error::NotInCart(*resource_id))?;
        Ok(self.items.remove(position))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> Result<Money, Error> {
        Money::try_sum(self.items.iter().map(|item| item.locked_price))
            .ok_or_else(|| Error::Overflow("cart total".to_string()))
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.items.iter().map(|item| item.resource_id)
    }

    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|item| item.title.clone()).collect()
    }
}
