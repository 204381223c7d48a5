//! Catalog commands: categories and product listings.

use rust_decimal::Decimal;
use tote_client::Page;
use tote_core::{ListingQuery, PriceRange, Product, SortOption, format_category_name, format_usd};

use super::{CommandError, Shop};

/// Arguments of `tote products`.
pub struct ProductFilters {
    pub category: Option<String>,
    pub skip: u32,
    pub limit: u32,
    pub sort: Option<SortOption>,
    pub brands: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilters {
    fn query(&self) -> ListingQuery {
        let price_range = (self.min_price.is_some() || self.max_price.is_some()).then_some(
            PriceRange {
                min: self.min_price,
                max: self.max_price,
            },
        );

        ListingQuery {
            brands: self.brands.clone(),
            price_range,
            sort: self.sort,
        }
    }
}

/// Print every category.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn categories(shop: &Shop) -> Result<(), CommandError> {
    for category in shop.catalog().categories().await? {
        println!("{:<24} {}", category.slug, category.name);
    }
    Ok(())
}

/// Fetch one page of products, then filter and sort it locally.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn products(shop: &Shop, filters: ProductFilters) -> Result<(), CommandError> {
    let page = Page {
        skip: filters.skip,
        limit: filters.limit,
    };
    let fetched = match filters.category.as_deref() {
        Some(slug) => shop.catalog().products_by_category(slug, page).await?,
        None => shop.catalog().all_products(page).await?,
    };

    let query = filters.query();
    let listed = query.apply(&fetched.products);

    let heading = format_category_name(filters.category.as_deref().unwrap_or("all"));
    println!(
        "{heading}: {} of {} (skip {}, {} filters)",
        listed.len(),
        fetched.total,
        fetched.skip,
        query.active_filter_count()
    );
    for product in &listed {
        print_product(product);
    }
    if fetched.has_more() {
        println!("More with --skip {}", page.next().skip);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn print_product(product: &Product) {
    println!(
        "{:>5}  {:<40} {:<16} {:>10}  {:.1}",
        product.id,
        product.title,
        product.brand.as_deref().unwrap_or("-"),
        format_usd(product.discounted_price()),
        product.rating
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> ProductFilters {
        ProductFilters {
            category: None,
            skip: 0,
            limit: 16,
            sort: None,
            brands: Vec::new(),
            min_price: None,
            max_price: None,
        }
    }

    #[test]
    fn test_no_bounds_means_no_price_filter() {
        let query = filters().query();
        assert_eq!(query, ListingQuery::default());
        assert_eq!(query.active_filter_count(), 0);
    }

    #[test]
    fn test_one_bound_sets_price_range() {
        let query = ProductFilters {
            max_price: Some(Decimal::from(500)),
            brands: vec!["Apple".into()],
            sort: Some(SortOption::PriceHighLow),
            ..filters()
        }
        .query();

        assert_eq!(
            query.price_range,
            Some(PriceRange {
                min: None,
                max: Some(Decimal::from(500)),
            })
        );
        assert_eq!(query.sort, Some(SortOption::PriceHighLow));
        assert_eq!(query.active_filter_count(), 2);
    }
}
