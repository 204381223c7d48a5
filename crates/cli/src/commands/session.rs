//! Session commands: login, logout, whoami.

use tracing::info;

use super::{CommandError, Shop};

/// Sign in and print who is now signed in.
///
/// # Errors
///
/// Returns `CommandError::SignIn` if the credentials are empty or rejected.
pub async fn login(shop: &Shop, username: &str, password: &str) -> Result<(), CommandError> {
    shop.session().sign_in(username, password).await?;
    whoami(shop)
}

pub async fn logout(shop: &Shop) {
    shop.session().sign_out().await;
    info!("Session deleted");
}

/// Print the signed-in user.
///
/// # Errors
///
/// Returns `CommandError::NotSignedIn` if there is no session or the profile
/// could not be loaded.
#[allow(clippy::print_stdout)]
pub fn whoami(shop: &Shop) -> Result<(), CommandError> {
    let state = shop.session().state();
    let user = state.user().ok_or(CommandError::NotSignedIn)?;

    println!("{} ({})", user.full_name(), user.username);
    println!("  id:    {}", user.id);
    println!("  email: {}", user.email);
    println!("  token storage: {:?}", shop.session().security_level());
    Ok(())
}
