use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::cinc::auth::{generate_state, OAuthClient, TokenSet};
use crate::utils::error::{EtlError, Result};

/// 會話檔內容
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// 以 JSON 檔保存 OAuth state 與 token
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SessionFile> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, session: &SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_private(&self.path, &serde_json::to_vec_pretty(session)?)
    }

    /// 清除整個會話
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!("Session cleared ({})", self.path.display());
        }
        Ok(())
    }

    pub fn save_state(&self, state: &str) -> Result<()> {
        let mut session = self.read()?;
        session.state = Some(state.to_string());
        session.updated_at = Some(Utc::now());
        self.write(&session)
    }

    pub fn pending_state(&self) -> Result<Option<String>> {
        Ok(self.read()?.state)
    }

    /// 保存 token 並清掉已使用的 state
    pub fn save_tokens(&self, tokens: &TokenSet) -> Result<()> {
        let session = SessionFile {
            state: None,
            access_token: Some(tokens.access_token.expose_secret().to_string()),
            refresh_token: Some(tokens.refresh_token.expose_secret().to_string()),
            updated_at: Some(Utc::now()),
        };
        self.write(&session)
    }

    pub fn load_tokens(&self) -> Result<Option<TokenSet>> {
        let session = self.read()?;
        Ok(match (session.access_token, session.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenSet {
                access_token: SecretString::from(access),
                refresh_token: SecretString::from(refresh),
            }),
            _ => None,
        })
    }
}

/// 檔案建立時即為 0600，已存在的檔案先收緊權限再寫入
#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data)?;
    Ok(())
}

/// 授權流程：產生連結、交換 code、更新 token
#[derive(Debug, Clone)]
pub struct Authenticator {
    oauth: OAuthClient,
    store: SessionStore,
}

impl Authenticator {
    pub fn new(oauth: OAuthClient, store: SessionStore) -> Self {
        Self { oauth, store }
    }

    /// 產生新的 state 並回傳授權連結
    pub fn begin_authorization(&self) -> Result<String> {
        let state = generate_state();
        self.store.save_state(&state)?;
        self.oauth.authorization_url(&state)
    }

    /// 驗證 state 後交換 token，失敗時清除會話
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<()> {
        let result = self.exchange_checked(code, state).await;
        if let Err(e) = &result {
            tracing::error!("Authentication failed: {}", e);
            self.store.reset()?;
        }
        result
    }

    async fn exchange_checked(&self, code: &str, state: &str) -> Result<()> {
        let expected = self.store.pending_state()?;
        if expected.as_deref() != Some(state) {
            tracing::warn!("State mismatch - possible CSRF attempt");
            return Err(EtlError::StateMismatchError);
        }

        let tokens = self.oauth.exchange_code(code).await?;
        self.store.save_tokens(&tokens)?;
        tracing::info!("✅ Authenticated with CINC");
        Ok(())
    }

    pub fn tokens(&self) -> Result<TokenSet> {
        self.store.load_tokens()?.ok_or_else(|| {
            EtlError::auth("Not authenticated. Run `ri-cinc authorize` first.")
        })
    }

    /// 用 refresh token 換新的 token 並寫回會話檔
    pub async fn refresh(&self) -> Result<TokenSet> {
        let current = self.tokens()?;
        match self.oauth.refresh(&current.refresh_token).await {
            Ok(tokens) => {
                self.store.save_tokens(&tokens)?;
                Ok(tokens)
            }
            Err(e @ EtlError::AuthError { .. }) => {
                self.store.reset()?;
                Err(e)
            }
            // refresh token 過期或被撤銷
            Err(EtlError::HttpStatusError { status: 400 | 401, body, .. }) => {
                tracing::warn!("Refresh token rejected by CINC");
                self.store.reset()?;
                Err(EtlError::auth(format!(
                    "Refresh token was rejected ({}). Please re-authenticate.",
                    body
                )))
            }
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.store.reset()
    }
}
