//! In-memory implementations of every store.
//!
//! Mirrors the `PostgreSQL` adapters closely enough for tests: unique emails,
//! category names and payment intents, newest-first order listings, and
//! `updated_at` bumps on status changes.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use emporium_core::{CategoryId, Email, MediaId, OrderId, OrderStatus, ProductId, UserId};

use super::{
    CatalogStore, MediaStore, NewMedia, OrderStore, RepositoryError, StoredMedia, UserStore,
};
use crate::models::{Category, MediaRef, NewOrder, NewProduct, NewUser, Order, Product, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, (User, String)>,
    products: BTreeMap<ProductId, Product>,
    categories: BTreeMap<CategoryId, Category>,
    orders: BTreeMap<OrderId, Order>,
    media: BTreeMap<MediaId, StoredMedia>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

/// A process-local store. Cheap to create; all data is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = UserId::new(tables.next_id());
        let stored = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        tables
            .users
            .insert(id, (stored.clone(), user.password_hash.clone()));
        Ok(stored)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).map(|(u, _)| (*id, u.clone())))
            .collect())
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let (user, _) = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.is_admin = is_admin;
        Ok(user.clone())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| {
                contains_ignore_case(&p.name, query) || contains_ignore_case(&p.description, query)
            })
            .cloned()
            .collect())
    }

    async fn products_in_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_id());
        let stored = Product {
            id,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            description: product.description.clone(),
            category: product.category.clone(),
            main_image: product.main_image.clone(),
            additional_images: product.additional_images.clone(),
            video: product.video.clone(),
            created_at: Utc::now(),
        };
        tables.products.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, RepositoryError> {
        let mut categories = self.list_categories().await?;
        categories.retain(|c| contains_ignore_case(&c.name, query));
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict("category already exists".to_owned()));
        }

        let id = CategoryId::new(tables.next_id());
        let category = Category {
            id,
            name: name.to_owned(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .orders
            .values()
            .any(|o| o.payment_intent_id == order.payment_intent_id)
        {
            return Err(RepositoryError::Conflict(
                "order for payment intent already exists".to_owned(),
            ));
        }

        let id = OrderId::new(tables.next_id());
        let now = Utc::now();
        let stored = Order {
            id,
            user_id: order.user_id,
            items: order.items.clone(),
            total_amount: order.total_amount,
            shipping_address: order.shipping_address.clone(),
            status: OrderStatus::INITIAL,
            tracking_number: None,
            payment_intent_id: order.payment_intent_id.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn get_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = status;
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking.to_owned());
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.orders.values().cloned().collect()))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn put(&self, media: NewMedia) -> Result<MediaRef, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = MediaId::new(tables.next_id());
        let reference = MediaRef {
            id,
            content_type: media.content_type.clone(),
        };
        tables.media.insert(
            id,
            StoredMedia {
                id,
                filename: media.filename,
                content_type: media.content_type,
                data: media.data,
            },
        );
        Ok(reference)
    }

    async fn get(&self, id: MediaId) -> Result<Option<StoredMedia>, RepositoryError> {
        Ok(self.tables.read().await.media.get(&id).cloned())
    }
}
