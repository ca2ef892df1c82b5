use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain::{Catalog, Money, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ResourceId,
    pub title: String,
    pub price: Money,
}

/// Catalog held in memory, seeded from configuration.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: DashMap<ResourceId, CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = CatalogItem>,
    {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    pub fn insert(&self, item: CatalogItem) {
        self.items.insert(item.id, item);
    }

    /// Changes the current price. Items already sitting in carts keep the
    /// price they were added with.
    pub fn set_price(&self, resource_id: ResourceId, price: Money) -> bool {
        match self.items.get_mut(&resource_id) {
            Some(mut item) => {
                item.price = price;
                true
            }
            None => false,
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn item(&self, resource_id: ResourceId) -> Option<CatalogItem> {
        self.items.get(&resource_id).map(|item| item.value().clone())
    }
}
