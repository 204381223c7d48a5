//! Read-only catalog endpoints.
//!
//! Responses are cached using `moka` with a configurable TTL.

use std::time::Duration;

use moka::future::Cache;
use tote_core::{CategorySummary, Product, ProductId, ProductsPage};
use tracing::{debug, instrument};

use super::{ApiRequest, AuthenticatedClient};
use crate::error::ApiError;
use crate::storage::SecureStore;

/// Pagination window for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 16 }
    }
}

impl Page {
    /// The window after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            skip: self.skip.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    CategoryList,
    Products(Page),
    CategoryProducts { slug: String, page: Page },
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Vec<CategorySummary>),
    CategoryList(Vec<String>),
    Products(ProductsPage),
    Product(Box<Product>),
}

/// Client for the product catalog.
pub struct CatalogClient<S> {
    http: AuthenticatedClient<S>,
    cache: Cache<CacheKey, CacheValue>,
}

impl<S> Clone for CatalogClient<S> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: SecureStore + 'static> CatalogClient<S> {
    #[must_use]
    pub fn new(http: AuthenticatedClient<S>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self { http, cache }
    }

    /// All categories with display names.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<CategorySummary>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<CategorySummary> = self
            .http
            .execute(ApiRequest::get("products/categories"))
            .await?;

        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// All category slugs.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn category_list(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::CategoryList(slugs)) =
            self.cache.get(&CacheKey::CategoryList).await
        {
            debug!("Cache hit for category list");
            return Ok(slugs);
        }

        let slugs: Vec<String> = self
            .http
            .execute(ApiRequest::get("products/category-list"))
            .await?;

        self.cache
            .insert(CacheKey::CategoryList, CacheValue::CategoryList(slugs.clone()))
            .await;

        Ok(slugs)
    }

    /// One page of the full product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self, page: Page) -> Result<ProductsPage, ApiError> {
        let request = ApiRequest::get("products")
            .query("skip", page.skip)
            .query("limit", page.limit);
        self.products_cached(CacheKey::Products(page), request).await
    }

    /// One page of a category's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn products_by_category(
        &self,
        slug: &str,
        page: Page,
    ) -> Result<ProductsPage, ApiError> {
        let request = ApiRequest::get("products/category")
            .segment(slug)
            .query("skip", page.skip)
            .query("limit", page.limit);
        let key = CacheKey::CategoryProducts {
            slug: slug.to_string(),
            page,
        };
        self.products_cached(key, request).await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with a 404 if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .http
            .execute(ApiRequest::get("products").segment(&id.to_string()))
            .await?;

        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop every cached response.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    async fn products_cached(
        &self,
        key: CacheKey,
        request: ApiRequest,
    ) -> Result<ProductsPage, ApiError> {
        if let Some(CacheValue::Products(page)) = self.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page: ProductsPage = self.http.execute(request).await?;
        self.cache
            .insert(key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page, Page { skip: 0, limit: 16 });
        assert_eq!(page.next(), Page { skip: 16, limit: 16 });
    }
}
