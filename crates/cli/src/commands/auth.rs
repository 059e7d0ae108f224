//! Session and account commands.
//!
//! # Usage
//!
//! ```bash
//! cr-cli login -u meera -p 'correct horse'
//! cr-cli signup -u meera -e meera@example.com -p 'correct horse' --confirm 'correct horse'
//! cr-cli whoami
//! cr-cli password change --old 'correct horse' --new 'battery staple'
//! cr-cli password forgot -e meera@example.com
//! cr-cli logout
//! ```

use crafted_roots_storefront::services::SignupForm;
use crafted_roots_storefront::{ClientError, Storefront};
use secrecy::SecretString;

pub async fn login(
    storefront: &Storefront,
    username: &str,
    password: String,
) -> Result<(), ClientError> {
    let identity = storefront
        .auth()
        .login(username, &SecretString::from(password))
        .await?;

    tracing::info!("Logged in as {} ({})", identity.username, identity.role);
    if identity.role.is_seller() {
        tracing::info!("Seller dashboard: {}", identity.role.landing_route());
    }
    Ok(())
}

pub async fn signup(
    storefront: &Storefront,
    username: String,
    email: String,
    password: String,
    confirm: String,
) -> Result<(), ClientError> {
    let form = SignupForm {
        username,
        email,
        password: SecretString::from(password),
        confirm_password: SecretString::from(confirm),
    };
    storefront.auth().register(&form).await?;

    tracing::info!(
        "Account {} created. Run `cr-cli login` to sign in.",
        form.username
    );
    Ok(())
}

pub async fn logout(storefront: &Storefront) -> Result<(), ClientError> {
    match storefront.auth().logout().await {
        Ok(()) => tracing::info!("Logged out"),
        // The local session is gone either way.
        Err(ClientError::Http(e)) => {
            tracing::warn!("Logged out locally; the server could not be reached: {e}");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

pub async fn whoami(storefront: &Storefront) -> Result<(), ClientError> {
    match storefront.auth().current_user().await? {
        Some(identity) => tracing::info!("{} ({})", identity.username, identity.role),
        None => tracing::info!("Not logged in"),
    }
    Ok(())
}

pub async fn change_password(
    storefront: &Storefront,
    old: String,
    new: String,
) -> Result<(), ClientError> {
    let message = storefront
        .auth()
        .change_password(&SecretString::from(old), &SecretString::from(new))
        .await?;
    tracing::info!("{message}");
    Ok(())
}

pub async fn forgot_password(storefront: &Storefront, email: &str) -> Result<(), ClientError> {
    let message = storefront.auth().forgot_password(email).await?;
    tracing::info!("{message}");
    Ok(())
}
