//! Catalog browsing and administration.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use emporium_core::{CategoryId, Price, ProductId, category_slug};

use super::media::{MediaError, MediaKind, MediaService};
use crate::db::{CatalogStore, MediaStore, RepositoryError};
use crate::models::{Category, MediaRef, NewProduct, Product};

/// Most additional images a product can carry.
pub const MAX_ADDITIONAL_IMAGES: usize = 2;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Form input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Entity not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Category name already used.
    #[error("category {0:?} already exists")]
    Duplicate(String),

    /// Upload rejected or storage failed.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Products with the category list for navigation.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogOverview {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// Search matches.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// A category with its products.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub slug: String,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// An uploaded file from the product form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    fn is_blank(&self) -> bool {
        self.filename.trim().is_empty() && self.data.is_empty()
    }
}

/// Raw admin product form.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub stock: String,
    pub description: String,
    pub category: String,
    pub main_image: Option<Upload>,
    pub additional_images: Vec<Upload>,
    pub video: Option<Upload>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    catalog: &'a dyn CatalogStore,
    media: MediaService<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore, media: &'a dyn MediaStore) -> Self {
        Self {
            catalog,
            media: MediaService::new(media),
        }
    }

    /// All products and categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn overview(&self) -> Result<CatalogOverview, CatalogError> {
        Ok(CatalogOverview {
            products: self.catalog.list_products().await?,
            categories: self.catalog.list_categories().await?,
        })
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound("product"))
    }

    /// Search product names, descriptions, and category names. A blank query
    /// returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Option<SearchResults>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        Ok(Some(SearchResults {
            query: query.to_string(),
            products: self.catalog.search_products(query).await?,
            categories: self.catalog.search_categories(query).await?,
        }))
    }

    /// The category whose name slugifies to `slug`, with its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no category matches.
    pub async fn category_page(&self, slug: &str) -> Result<CategoryPage, CatalogError> {
        let wanted = category_slug(slug);
        let categories = self.catalog.list_categories().await?;
        let category = categories
            .iter()
            .find(|c| c.slug() == wanted)
            .cloned()
            .ok_or(CatalogError::NotFound("category"))?;

        let products = self.catalog.products_in_category(&category.name).await?;

        Ok(CategoryPage {
            slug: wanted,
            category,
            products,
            categories,
        })
    }

    /// Admin dashboard: products filtered by `query` when given, plus all
    /// categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn admin_dashboard(&self, query: Option<&str>) -> Result<CatalogOverview, CatalogError> {
        let products = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => self.catalog.search_products(q).await?,
            None => self.catalog.list_products().await?,
        };

        Ok(CatalogOverview {
            products,
            categories: self.catalog.list_categories().await?,
        })
    }

    /// Validate the product form, store its media, and create the product.
    ///
    /// The main image is required. Additional images beyond
    /// [`MAX_ADDITIONAL_IMAGES`] and blank file inputs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad form fields and
    /// `CatalogError::Media` for rejected uploads.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn add_product(&self, form: ProductForm) -> Result<Product, CatalogError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Invalid("Product name is required".to_string()));
        }
        let price = Price::parse(form.price.trim())
            .map_err(|e| CatalogError::Invalid(format!("Invalid price: {e}")))?;
        let stock = parse_stock(&form.stock)?;
        let category = form.category.trim();
        if category.is_empty() {
            return Err(CatalogError::Invalid("Category is required".to_string()));
        }

        let main_image = match form.main_image.filter(|u| !u.is_blank()) {
            Some(upload) => self.store(MediaKind::Image, upload).await?,
            None => return Err(CatalogError::Invalid("Main image is required".to_string())),
        };

        let mut additional_images = Vec::new();
        for upload in form
            .additional_images
            .into_iter()
            .filter(|u| !u.is_blank())
            .take(MAX_ADDITIONAL_IMAGES)
        {
            additional_images.push(self.store(MediaKind::Image, upload).await?);
        }

        let video = match form.video.filter(|u| !u.is_blank()) {
            Some(upload) => Some(self.store(MediaKind::Video, upload).await?),
            None => None,
        };

        let product = self
            .catalog
            .create_product(&NewProduct {
                name: name.to_string(),
                price,
                stock,
                description: form.description.trim().to_string(),
                category: category.to_string(),
                main_image,
                additional_images,
                video,
            })
            .await?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn remove_product(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.catalog.delete_product(id).await? {
            return Err(CatalogError::NotFound("product"));
        }
        tracing::info!(product_id = %id, "Product removed");
        Ok(())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name and
    /// `CatalogError::Duplicate` if the name is taken.
    pub async fn add_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Invalid("Category name is required".to_string()));
        }

        self.catalog.create_category(name).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::Duplicate(name.to_string()),
            other => CatalogError::Repository(other),
        })
    }

    /// Delete a category. Products keep their category name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    pub async fn remove_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        if !self.catalog.delete_category(id).await? {
            return Err(CatalogError::NotFound("category"));
        }
        Ok(())
    }

    async fn store(&self, kind: MediaKind, upload: Upload) -> Result<MediaRef, CatalogError> {
        Ok(self.media.store(kind, &upload.filename, upload.data).await?)
    }
}

fn parse_stock(raw: &str) -> Result<u32, CatalogError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>().map_err(|_| {
        CatalogError::Invalid(format!("Stock must be a whole number of at least 0, got {raw:?}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn png(name: &str) -> Upload {
        Upload {
            filename: name.to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    fn form(name: &str, category: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price: "9.99".to_string(),
            stock: "5".to_string(),
            description: String::new(),
            category: category.to_string(),
            main_image: Some(png("main.png")),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_parse_stock() {
        assert_eq!(parse_stock(" 5 ").unwrap(), 5);
        assert_eq!(parse_stock("").unwrap(), 0);
        assert!(parse_stock("-1").is_err());
        assert!(parse_stock("2.5").is_err());
    }

    #[tokio::test]
    async fn test_add_product_stores_media() {
        let store = MemoryStore::default();
        let service = CatalogService::new(&store, &store);

        let mut input = form("Mug", "Kitchen");
        input.additional_images = vec![png("a.png"), png("b.gif"), png("c.jpg")];
        input.video = Some(Upload {
            filename: "spin.mp4".to_string(),
            data: vec![0, 0, 0, 1],
        });

        let product = service.add_product(input).await.unwrap();
        assert_eq!(product.price, Price::parse("9.99").unwrap());
        assert_eq!(product.stock, 5);
        assert_eq!(product.additional_images.len(), MAX_ADDITIONAL_IMAGES);
        assert_eq!(product.video.unwrap().content_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_add_product_validation() {
        let store = MemoryStore::default();
        let service = CatalogService::new(&store, &store);

        let mut no_image = form("Mug", "Kitchen");
        no_image.main_image = None;
        assert!(matches!(
            service.add_product(no_image).await,
            Err(CatalogError::Invalid(_))
        ));

        for price in ["-3", "9.999", "10000000000"] {
            let mut bad_price = form("Mug", "Kitchen");
            bad_price.price = price.to_string();
            assert!(
                matches!(
                    service.add_product(bad_price).await,
                    Err(CatalogError::Invalid(_))
                ),
                "price {price:?}"
            );
        }

        let mut bad_image = form("Mug", "Kitchen");
        bad_image.main_image = Some(png("main.svg"));
        assert!(matches!(
            service.add_product(bad_image).await,
            Err(CatalogError::Media(MediaError::UnsupportedType { .. }))
        ));

        assert!(matches!(
            service.add_product(form("  ", "Kitchen")).await,
            Err(CatalogError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_search_and_category_page() {
        let store = MemoryStore::default();
        let service = CatalogService::new(&store, &store);
        service.add_category("Home  Office").await.unwrap();
        service.add_category("Kitchen").await.unwrap();
        service.add_product(form("Desk Lamp", "Home  Office")).await.unwrap();
        service.add_product(form("Mug", "Kitchen")).await.unwrap();

        assert!(service.search("   ").await.unwrap().is_none());

        let results = service.search("LAMP").await.unwrap().unwrap();
        assert_eq!(results.products.len(), 1);
        assert!(results.categories.is_empty());

        let page = service.category_page("home-office").await.unwrap();
        assert_eq!(page.category.name, "Home  Office");
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].name, "Desk Lamp");

        assert!(matches!(
            service.category_page("garden").await,
            Err(CatalogError::NotFound("category"))
        ));
    }

    #[tokio::test]
    async fn test_category_add_and_remove() {
        let store = MemoryStore::default();
        let service = CatalogService::new(&store, &store);

        let category = service.add_category(" Kitchen ").await.unwrap();
        assert_eq!(category.name, "Kitchen");
        assert!(matches!(
            service.add_category("Kitchen").await,
            Err(CatalogError::Duplicate(_))
        ));
        assert!(matches!(
            service.add_category("").await,
            Err(CatalogError::Invalid(_))
        ));

        service.remove_category(category.id).await.unwrap();
        assert!(matches!(
            service.remove_category(category.id).await,
            Err(CatalogError::NotFound("category"))
        ));
    }

    #[tokio::test]
    async fn test_admin_dashboard_filters_products() {
        let store = MemoryStore::default();
        let service = CatalogService::new(&store, &store);
        service.add_product(form("Mug", "Kitchen")).await.unwrap();
        service.add_product(form("Lamp", "Office")).await.unwrap();

        assert_eq!(service.admin_dashboard(None).await.unwrap().products.len(), 2);
        assert_eq!(service.admin_dashboard(Some(" ")).await.unwrap().products.len(), 2);
        assert_eq!(service.admin_dashboard(Some("mug")).await.unwrap().products.len(), 1);
    }
}
