//! Client-side filtering and sorting of product listings.
//!
//! Prices are compared after discount, matching what the shopper sees on a
//! product tile.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::product::Product;

/// Sort order for a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOption {
    /// Keep the catalog's order.
    Popular,
    /// Keep the catalog's order; the API exposes no creation date to sort on.
    Newest,
    /// Highest rating first.
    CustomerReview,
    /// Cheapest first.
    PriceLowHigh,
    /// Most expensive first.
    PriceHighLow,
}

impl SortOption {
    pub const ALL: [Self; 5] = [
        Self::Popular,
        Self::Newest,
        Self::CustomerReview,
        Self::PriceLowHigh,
        Self::PriceHighLow,
    ];

    /// Stable identifier used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::Newest => "newest",
            Self::CustomerReview => "customer_review",
            Self::PriceLowHigh => "price_low_high",
            Self::PriceHighLow => "price_high_low",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Popular => "Popular",
            Self::Newest => "Newest",
            Self::CustomerReview => "Customer review",
            Self::PriceLowHigh => "Price: lowest to high",
            Self::PriceHighLow => "Price: highest to low",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown sort option.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort option: {0}")]
pub struct UnknownSortOption(pub String);

impl FromStr for SortOption {
    type Err = UnknownSortOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSortOption(s.to_string()))
    }
}

/// Inclusive price bounds. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl PriceRange {
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Filters and sort order applied to a fetched page of products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    /// Keep only products from these brands. Empty means any brand.
    pub brands: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub sort: Option<SortOption>,
}

impl ListingQuery {
    /// Number of filters currently narrowing the listing.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        self.brands.len() + usize::from(self.price_range.is_some())
    }

    /// Filter then sort `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut result: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();

        match self.sort {
            Some(SortOption::PriceLowHigh) => {
                result.sort_by_key(Product::discounted_price);
            }
            Some(SortOption::PriceHighLow) => {
                result.sort_by_key(|p| std::cmp::Reverse(p.discounted_price()));
            }
            Some(SortOption::CustomerReview) => {
                result.sort_by(|a, b| b.rating.total_cmp(&a.rating));
            }
            Some(SortOption::Popular | SortOption::Newest) | None => {}
        }

        result
    }

    fn matches(&self, product: &Product) -> bool {
        let brand_ok = self.brands.is_empty()
            || product
                .brand
                .as_ref()
                .is_some_and(|brand| self.brands.iter().any(|b| b == brand));

        let price_ok = self
            .price_range
            .is_none_or(|range| range.contains(product.discounted_price()));

        brand_ok && price_ok
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, price: i64, discount: i64, rating: f64, brand: Option<&str>) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Product {id}"),
            "price": price,
            "discountPercentage": discount,
            "rating": rating,
            "brand": brand,
        }))
        .unwrap()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, 100, 50, 4.1, Some("Acme")),
            product(2, 60, 0, 4.9, Some("Globex")),
            product(3, 80, 0, 3.2, None),
            product(4, 20, 10, 4.5, Some("Acme")),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    #[test]
    fn test_no_query_keeps_order() {
        assert_eq!(ids(&ListingQuery::default().apply(&catalog())), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sort_by_discounted_price() {
        let query = ListingQuery {
            sort: Some(SortOption::PriceLowHigh),
            ..Default::default()
        };
        // Discounted: 1 → 50, 2 → 60, 3 → 80, 4 → 18
        assert_eq!(ids(&query.apply(&catalog())), vec![4, 1, 2, 3]);

        let query = ListingQuery {
            sort: Some(SortOption::PriceHighLow),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&catalog())), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_sort_by_rating() {
        let query = ListingQuery {
            sort: Some(SortOption::CustomerReview),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&catalog())), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_filter_brand_and_price() {
        let query = ListingQuery {
            brands: vec!["Acme".to_string()],
            price_range: Some(PriceRange {
                min: Some(Decimal::from(40)),
                max: None,
            }),
            sort: None,
        };
        assert_eq!(ids(&query.apply(&catalog())), vec![1]);
        assert_eq!(query.active_filter_count(), 2);
    }

    #[test]
    fn test_sort_option_parsing() {
        assert_eq!("price_low_high".parse::<SortOption>().unwrap(), SortOption::PriceLowHigh);
        assert_eq!("POPULAR".parse::<SortOption>().unwrap(), SortOption::Popular);
        assert!("cheapest".parse::<SortOption>().is_err());
        assert_eq!(SortOption::PriceHighLow.to_string(), "Price: highest to low");
    }
}
