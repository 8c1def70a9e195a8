//! CINC OAuth 2.0 authorization-code flow.
//!
//! Tokens are wrapped in `SecretString` as soon as they are received and are
//! never written to the log.

use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::config::settings::CincSettings;
use crate::utils::error::{EtlError, Result};

/// Scopes requested from CINC.
pub const OAUTH_SCOPES: &[&str] = &["api:create", "api:read", "api:update", "api:event"];

const STATE_LENGTH: usize = 16;

/// Access and refresh token pair.
#[derive(Debug)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

/// Raw token endpoint response; both tokens are checked before use.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self, context: &str) -> Result<TokenSet> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(TokenSet {
                    access_token: SecretString::from(access),
                    refresh_token: SecretString::from(refresh),
                })
            }
            _ => Err(EtlError::auth(format!(
                "Access or Refresh token not found in {} response.",
                context
            ))),
        }
    }
}

/// Random CSRF state: ASCII letters and digits.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: std::sync::Arc<SecretString>,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, settings: &CincSettings) -> Self {
        Self {
            http,
            auth_url: settings.auth_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: std::sync::Arc::new(SecretString::from(
                settings.client_secret.expose_secret().to_string(),
            )),
            redirect_uri: settings.redirect_uri.clone(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.auth_url)
    }

    /// Builds the link the user opens to grant access.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_url)).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "CINC_AUTH_URL".to_string(),
                value: self.auth_url.clone(),
                reason: e.to_string(),
            }
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &OAUTH_SCOPES.join(" "));

        Ok(url.to_string())
    }

    /// Exchanges an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        tracing::info!("Exchanging authorization code for tokens");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];
        self.request_tokens(&params, "token").await
    }

    /// Trades a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenSet> {
        tracing::info!("Refreshing CINC access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];
        self.request_tokens(&params, "refresh").await
    }

    async fn request_tokens(&self, params: &[(&str, &str)], context: &str) -> Result<TokenSet> {
        let url = self.token_url();
        let response = self.http.post(&url).form(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token endpoint returned HTTP {}", status.as_u16());
            return Err(EtlError::http_status(status.as_u16(), url, &body));
        }

        let body: TokenResponse = response.json().await?;
        body.into_tokens(context)
    }
}
