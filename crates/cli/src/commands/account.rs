//! Account commands.

use secrecy::SecretString;

use julid_storefront::error::StorefrontError;
use julid_storefront::services::reset_token_from_link;
use julid_storefront::state::AppState;

use crate::output;

pub async fn login(state: &AppState, email: &str, password: String) -> Result<(), StorefrontError> {
    let password = SecretString::from(password);
    let identity = state.auth().login(email, &password).await?;
    state
        .notices()
        .success(format!("Welcome back, {}!", identity.display_name()));
    reload_cart(state).await;
    Ok(())
}

pub async fn register(
    state: &AppState,
    name: &str,
    email: &str,
    password: String,
    confirm: String,
) -> Result<(), StorefrontError> {
    let password = SecretString::from(password);
    let confirm = SecretString::from(confirm);
    let identity = state
        .auth()
        .register(name, email, &password, &confirm)
        .await?;
    state
        .notices()
        .success(format!("Welcome, {}! Your account is ready.", identity.display_name()));
    reload_cart(state).await;
    Ok(())
}

pub fn logout(state: &AppState) -> Result<(), StorefrontError> {
    if !state.session().is_authenticated() {
        state.notices().info("You are not signed in");
        return Ok(());
    }
    state.auth().logout()?;
    state.notices().success("Logged out");
    Ok(())
}

pub fn whoami(state: &AppState) {
    match state.identity() {
        Some(identity) => output::line(&format!(
            "{} <{}> (user {})",
            identity.display_name(),
            identity.email,
            identity.id
        )),
        None => output::line("Not signed in"),
    }
}

pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), StorefrontError> {
    state.auth().forgot_password(email).await?;
    state
        .notices()
        .success("Password reset link sent. Check your email.");
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    link: Option<&str>,
    token: Option<String>,
    password: String,
    confirm: String,
) -> Result<(), StorefrontError> {
    let token = token
        .or_else(|| link.and_then(reset_token_from_link))
        .unwrap_or_default();
    let password = SecretString::from(password);
    let confirm = SecretString::from(confirm);
    state
        .auth()
        .reset_password(&token, &password, &confirm)
        .await?;
    state
        .notices()
        .success("Password reset successful. You can now log in.");
    Ok(())
}

/// The cart is per user; fetch the new user's cart after signing in.
async fn reload_cart(state: &AppState) {
    state.cart().load().await;
}
