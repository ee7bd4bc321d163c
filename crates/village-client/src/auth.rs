use crate::api::ApiClient;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::ClientError;

fn require(value: &str, field: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Invalid(format!("{field} is required")));
    }
    Ok(())
}

/// Exchange a username and password for a token and persist it.
pub async fn login(
    api: &ApiClient,
    store: &CredentialStore,
    username: &str,
    password: &str,
) -> Result<Credentials, ClientError> {
    let username = username.trim();
    require(username, "Username")?;
    require(password, "Password")?;

    let token = api.login(username, password).await?;
    let creds = Credentials::new(token, username);
    store.save(&creds)?;
    tracing::info!(user = %username, "Logged in");
    Ok(creds)
}

/// Create an account. Does not log in.
pub async fn register(
    api: &ApiClient,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), ClientError> {
    let username = username.trim();
    let email = email.trim();
    require(username, "Username")?;
    require(email, "Email")?;
    require(password, "Password")?;
    if !email.contains('@') {
        return Err(ClientError::Invalid("Email address is not valid".into()));
    }

    api.register(username, email, password).await?;
    tracing::info!(user = %username, "Registered");
    Ok(())
}

/// Forget the persisted login.
pub fn logout(store: &CredentialStore) -> Result<(), ClientError> {
    store.clear()?;
    tracing::info!("Logged out");
    Ok(())
}
