//! Cart commands.
//!
//! Each run is a fresh process, so the signed-in user's cart is loaded from
//! storage before it is changed.

use tote_core::{Cart, ProductId, UserId, format_usd};

use super::{CommandError, Shop};

fn signed_in_user(shop: &Shop) -> Result<UserId, CommandError> {
    shop.user_id().ok_or(CommandError::NotSignedIn)
}

/// Print the signed-in user's cart.
///
/// # Errors
///
/// Returns `CommandError::NotSignedIn` without a session.
pub async fn show(shop: &Shop) -> Result<(), CommandError> {
    let user_id = signed_in_user(shop)?;
    print_cart(&shop.cart().load_cart(user_id).await);
    Ok(())
}

/// Fetch a product and add one unit of it.
///
/// # Errors
///
/// Returns `CommandError::NotSignedIn` without a session, or an API error if
/// the product cannot be fetched.
pub async fn add(shop: &Shop, id: ProductId) -> Result<(), CommandError> {
    let user_id = signed_in_user(shop)?;
    let product = shop.catalog().product(id).await?;
    print_cart(&shop.cart().add_to_cart(&product, user_id).await);
    Ok(())
}

/// # Errors
///
/// Returns `CommandError::Cart` if the product is not in the cart.
pub async fn increment(shop: &Shop, id: ProductId) -> Result<(), CommandError> {
    shop.cart().load_cart(signed_in_user(shop)?).await;
    print_cart(&shop.cart().increment_quantity(id).await?);
    Ok(())
}

/// # Errors
///
/// Returns `CommandError::Cart` if the product is not in the cart.
pub async fn decrement(shop: &Shop, id: ProductId) -> Result<(), CommandError> {
    shop.cart().load_cart(signed_in_user(shop)?).await;
    print_cart(&shop.cart().decrement_quantity(id).await?);
    Ok(())
}

/// # Errors
///
/// Returns `CommandError::NotSignedIn` without a session.
pub async fn remove(shop: &Shop, id: ProductId) -> Result<(), CommandError> {
    shop.cart().load_cart(signed_in_user(shop)?).await;
    print_cart(&shop.cart().remove_product_from_cart(id).await?);
    Ok(())
}

/// # Errors
///
/// Returns `CommandError::NotSignedIn` without a session.
pub async fn clear(shop: &Shop) -> Result<(), CommandError> {
    shop.cart().load_cart(signed_in_user(shop)?).await;
    if let Some(cart) = shop.cart().clear_cart().await {
        print_cart(&cart);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart {} is empty", cart.id());
        return;
    }

    println!("Cart {}", cart.id());
    for line in cart.products() {
        println!(
            "{:>5}  {:<40} x{:<3} {:>10} {:>10}",
            line.id,
            line.title,
            line.quantity,
            format_usd(line.total),
            format_usd(line.discounted_total)
        );
    }
    println!(
        "{} products, {} items, total {} ({} after discounts)",
        cart.total_products(),
        cart.total_quantity(),
        format_usd(cart.total()),
        format_usd(cart.discounted_total())
    );
}
