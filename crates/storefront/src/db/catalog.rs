//! Product and category storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use emporium_core::{CategoryId, Price, ProductId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Category, MediaRef, NewProduct, Product};

/// Catalog store operations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products with any of the given IDs. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Case-insensitive substring match on name or description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, RepositoryError>;

    /// Products whose category name equals `category`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn products_in_category(&self, category: &str)
    -> Result<Vec<Product>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Delete a product. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Categories whose name contains `query`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// Delete a category. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError>;
}

/// Build an `ILIKE` pattern that matches `query` literally anywhere.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    stock: i32,
    description: String,
    category: String,
    main_image: Json<MediaRef>,
    additional_images: Json<Vec<MediaRef>>,
    video: Option<Json<MediaRef>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.stock, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            price: row.price,
            stock,
            description: row.description,
            category: row.category,
            main_image: row.main_image.0,
            additional_images: row.additional_images.0,
            video: row.video.map(|v| v.0),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, price, stock, description, category, \
                               main_image, additional_images, video, created_at";

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// `PostgreSQL` implementation of [`CatalogStore`].
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a new catalog store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        into_products(rows)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(raw_ids)
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name ILIKE $1 OR description ILIKE $1 \
             ORDER BY id"
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    async fn products_in_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = $1 ORDER BY id"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let stock = i32::try_from(product.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("stock {} out of range", product.stock))
        })?;

        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products \
             (name, price, stock, description, category, main_image, additional_images, video) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(product.price)
        .bind(stock)
        .bind(&product.description)
        .bind(&product.category)
        .bind(Json(&product.main_image))
        .bind(Json(&product.additional_images))
        .bind(product.video.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM categories WHERE name ILIKE $1 ORDER BY name")
                .bind(like_pattern(query))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let row: CategoryRow =
            sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| conflict_on_unique(e, "category"))?;

        Ok(row.into())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mug"), "%mug%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
