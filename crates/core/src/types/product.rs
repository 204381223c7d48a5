//! Catalog types for products and categories.
//!
//! These mirror the JSON returned by the `/products` family of endpoints.
//! Fields the client never reads are omitted and ignored on deserialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::apply_discount;

// =============================================================================
// Product Types
// =============================================================================

/// A customer review attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: f64,
    pub comment: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reviewer_name: Option<String>,
}

/// Physical dimensions of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// Catalog bookkeeping metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identity.
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Category slug.
    #[serde(default)]
    pub category: String,
    /// Unit price before discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Discount in percent (0-100).
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Thumbnail image URL.
    #[serde(default)]
    pub thumbnail: String,
}

impl Product {
    /// Unit price after applying the product's discount.
    #[must_use]
    pub fn discounted_price(&self) -> Decimal {
        apply_discount(self.price, self.discount_percentage)
    }

    /// Number of reviews attached to the product.
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }
}

/// One page of products from a paginated listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsPage {
    pub products: Vec<Product>,
    /// Total number of products matching the listing.
    pub total: u32,
    pub skip: u32,
    pub limit: u32,
}

impl ProductsPage {
    /// Whether more products exist beyond this page.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.skip.saturating_add(self.limit) < self.total
    }
}

// =============================================================================
// Category Types
// =============================================================================

/// A category as listed by `GET /products/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategorySummary {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Format a category slug as a readable name.
///
/// `"smartphones"` becomes `"Smartphones"`, `"smart-phones"` becomes
/// `"Smart Phones"` and the special slug `"all"` becomes `"All Products"`.
/// Percent-encoded characters are decoded first.
///
/// # Example
///
/// ```
/// use tote_core::format_category_name;
///
/// assert_eq!(format_category_name("mens-shirts"), "Mens Shirts");
/// assert_eq!(format_category_name("ALL"), "All Products");
/// assert_eq!(format_category_name(""), "Category");
/// ```
#[must_use]
pub fn format_category_name(slug: &str) -> String {
    if slug.is_empty() {
        return "Category".to_string();
    }

    if slug.eq_ignore_ascii_case("all") {
        return "All Products".to_string();
    }

    percent_decode(slug)
        .replace('-', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Decode `%XX` sequences. Malformed sequences are kept verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = match bytes.get(i..i + 3) {
            Some([b'%', hi, lo]) => std::str::from_utf8(&[*hi, *lo])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok()),
            _ => None,
        };
        if let Some(byte) = decoded {
            out.push(byte);
            i += 3;
        } else {
            if let Some(byte) = bytes.get(i) {
                out.push(*byte);
            }
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
