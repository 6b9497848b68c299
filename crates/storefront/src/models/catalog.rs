//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{CategoryId, MediaId, Price, ProductId, category_slug};

/// Reference to an uploaded image or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: MediaId,
    pub content_type: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub description: String,
    /// Category name. Products are matched to categories by name equality.
    pub category: String,
    pub main_image: MediaRef,
    pub additional_images: Vec<MediaRef>,
    pub video: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
}

/// A validated product ready to be stored.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub description: String,
    pub category: String,
    pub main_image: MediaRef,
    pub additional_images: Vec<MediaRef>,
    pub video: Option<MediaRef>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    /// URL slug for the category page.
    #[must_use]
    pub fn slug(&self) -> String {
        category_slug(&self.name)
    }
}
