use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::adapters::cinc::payload::LeadEvent;
use crate::adapters::cinc::rate_limit::RateLimiter;
use crate::adapters::cinc::session::Authenticator;
use crate::utils::error::{EtlError, Result};

const VERIFY_FAILED: &str =
    "Could not verify credentials for CINC delivery. Please re-authenticate.";

/// CINC API 用戶端
///
/// Authorization 標頭直接放 access token，不加 Bearer 前綴。
#[derive(Debug)]
pub struct CincClient {
    http: Client,
    api_url: String,
    access_token: SecretString,
    authenticator: Authenticator,
    limiter: Arc<RateLimiter>,
}

impl CincClient {
    /// 從會話檔讀取 token，尚未登入時回傳 AuthError
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        authenticator: Authenticator,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let tokens = authenticator.tokens()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: tokens.access_token,
            authenticator,
            limiter,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(header::AUTHORIZATION, self.access_token.expose_secret())
            .header(header::CONTENT_TYPE, "application/json")
    }

    async fn me_status(&self) -> Result<StatusCode> {
        self.limiter.acquire().await;
        let url = format!("{}/me", self.api_url);
        let response = self.authorized(self.http.get(&url)).send().await?;
        Ok(response.status())
    }

    /// GET /me；401 時更新 token 後再試一次
    pub async fn verify_credentials(&mut self) -> Result<()> {
        let mut status = self.me_status().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Access token rejected, refreshing");
            let tokens = self.authenticator.refresh().await?;
            self.access_token = tokens.access_token;
            status = self.me_status().await?;
        }

        if status.is_success() {
            tracing::info!("🔑 CINC credentials verified");
            Ok(())
        } else {
            tracing::error!("Credential check returned HTTP {}", status.as_u16());
            Err(EtlError::auth(VERIFY_FAILED))
        }
    }

    /// POST /leads，回傳 CINC 的回應內容
    pub async fn create_lead(&self, event: &LeadEvent) -> Result<serde_json::Value> {
        self.limiter.acquire().await;
        let url = format!("{}/leads", self.api_url);
        tracing::debug!("Sending lead {:?} to CINC", event.id);

        let response = self
            .authorized(self.http.post(&url))
            .json(event)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("CINC responded HTTP {} for lead {:?}", status.as_u16(), event.id);

        if !status.is_success() {
            return Err(EtlError::http_status(status.as_u16(), url, &body));
        }

        if body.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        // 非 JSON 的 2xx 回應（例如維護頁面）視為失敗
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("CINC returned a non-JSON body for lead {:?}", event.id);
            EtlError::from(e)
        })
    }
}
