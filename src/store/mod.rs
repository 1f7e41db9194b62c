//! Per-session document storage.
//!
//! Every browser session owns one [`StoreDocument`]. Handlers load it, mutate
//! it in memory and write the whole document back. There is no locking: two
//! concurrent writes for the same session race and the last one wins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Announcement, BlogPost, Category, GalleryImage, Order, PaymentSettings, Product,
    ShippingSettings, User,
};

pub mod file;
pub mod memory;
pub mod seed;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Entity kinds that draw ids from [`NextIds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Category,
    Order,
    User,
    BlogPost,
    GalleryImage,
    Announcement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIds {
    pub products: i64,
    pub categories: i64,
    pub orders: i64,
    pub users: i64,
    pub blog_posts: i64,
    pub gallery: i64,
    pub announcements: i64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            products: 1,
            categories: 1,
            orders: 1,
            users: 1,
            blog_posts: 1,
            gallery: 1,
            announcements: 1,
        }
    }
}

impl NextIds {
    fn counter(&mut self, kind: EntityKind) -> &mut i64 {
        match kind {
            EntityKind::Product => &mut self.products,
            EntityKind::Category => &mut self.categories,
            EntityKind::Order => &mut self.orders,
            EntityKind::User => &mut self.users,
            EntityKind::BlogPost => &mut self.blog_posts,
            EntityKind::GalleryImage => &mut self.gallery,
            EntityKind::Announcement => &mut self.announcements,
        }
    }

    /// Hands out the current counter value and advances it.
    pub fn next(&mut self, kind: EntityKind) -> i64 {
        let counter = self.counter(kind);
        let id = *counter;
        *counter += 1;
        id
    }

    /// Moves the counter past `id` if it is not already; never moves it back.
    pub fn bump_past(&mut self, kind: EntityKind, id: i64) {
        let counter = self.counter(kind);
        if *counter <= id {
            *counter = id + 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub blog_posts: Vec<BlogPost>,
    #[serde(default)]
    pub gallery: Vec<GalleryImage>,
    #[serde(default)]
    pub announcements: Vec<Announcement>,
    #[serde(default = "seed::payment_settings")]
    pub payment_settings: PaymentSettings,
    #[serde(default = "seed::shipping_settings")]
    pub shipping_settings: ShippingSettings,
    #[serde(rename = "nextIds", default)]
    pub next_ids: NextIds,
}

impl StoreDocument {
    pub fn next_id(&mut self, kind: EntityKind) -> i64 {
        self.next_ids.next(kind)
    }
}

/// Storage backend for session documents.
///
/// `load` never fails: a missing or unreadable document yields a fresh seed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self, token: &str) -> StoreDocument;

    async fn save(&self, token: &str, document: &StoreDocument) -> Result<(), StoreError>;

    /// Loads the session document, seeding and persisting it on first access.
    async fn get_or_create(&self, token: &str) -> Result<StoreDocument, StoreError>;
}
