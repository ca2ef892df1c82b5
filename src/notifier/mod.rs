pub mod adapter;
pub mod client;
pub mod http;
pub mod memory;

pub use adapter::{DispatchAdapter, NotificationError};
pub use client::{
    Notification, NotificationPreference, NotificationRequest, NotifierClient, NotifierError,
    UpsertPreference,
};
pub use http::HttpNotifierClient;
pub use memory::InMemoryNotifier;
