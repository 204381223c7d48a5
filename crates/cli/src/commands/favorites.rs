//! Favorites commands.

use tote_core::{Favorites, ProductId};

use super::catalog::print_product;
use super::{CommandError, Shop};

pub async fn list(shop: &Shop) {
    print_favorites(&shop.favorites().favorites().await);
}

/// Fetch a product and mark it as a favorite.
///
/// # Errors
///
/// Returns an API error if the product cannot be fetched.
pub async fn add(shop: &Shop, id: ProductId) -> Result<(), CommandError> {
    let product = shop.catalog().product(id).await?;
    print_favorites(&shop.favorites().add_to_favorites(product).await);
    Ok(())
}

pub async fn remove(shop: &Shop, id: ProductId) {
    print_favorites(&shop.favorites().remove_from_favorites(id).await);
}

pub async fn clear(shop: &Shop) {
    print_favorites(&shop.favorites().clear_favorites().await);
}

#[allow(clippy::print_stdout)]
fn print_favorites(favorites: &Favorites) {
    println!("{} favorites", favorites.len());
    for product in favorites.products() {
        print_product(product);
    }
}
