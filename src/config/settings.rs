use crate::config::toml_config::{CincSection, TomlConfig};
use crate::domain::model::Assignments;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_SESSION_FILE: &str = ".cinc-session.json";
pub const DEFAULT_OUTPUT_FILE: &str = "converted_file.csv";
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// 未被替換的 ${VAR} 視為沒有設定
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| !(v.starts_with("${") && v.ends_with('}')))
}

/// CINC OAuth 與 API 設定
#[derive(Debug)]
pub struct CincSettings {
    pub auth_url: String,
    pub api_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
}

impl CincSettings {
    /// 環境變數優先，其次是 TOML 的 [cinc] 區段
    pub fn from_env(toml: Option<&TomlConfig>) -> Result<Self> {
        Self::resolve(toml, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(toml: Option<&TomlConfig>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = toml.map(TomlConfig::cinc).unwrap_or_default();
        let CincSection {
            auth_url,
            api_url,
            client_id,
            client_secret,
            redirect_uri,
        } = section;

        let pick = |key: &str, fallback: Option<String>| present(lookup(key)).or(present(fallback));

        let auth_url = pick("CINC_AUTH_URL", auth_url);
        let api_url = pick("CINC_API_URL", api_url);
        let client_id = pick("CLIENT_ID", client_id);
        let client_secret = pick("CLIENT_SECRET", client_secret);
        let redirect_uri = pick("REDIRECT_URI", redirect_uri);

        let settings = Self {
            auth_url: trim_slash(validation::validate_required_field("CINC_AUTH_URL", &auth_url)?),
            api_url: trim_slash(validation::validate_required_field("CINC_API_URL", &api_url)?),
            client_id: validation::validate_required_field("CLIENT_ID", &client_id)?.clone(),
            client_secret: SecretString::from(
                validation::validate_required_field("CLIENT_SECRET", &client_secret)?.clone(),
            ),
            redirect_uri: validation::validate_required_field("REDIRECT_URI", &redirect_uri)?
                .clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl Validate for CincSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("CINC_AUTH_URL", &self.auth_url)?;
        validation::validate_url("CINC_API_URL", &self.api_url)?;
        validation::validate_url("REDIRECT_URI", &self.redirect_uri)?;
        validation::validate_non_empty_string("CLIENT_ID", &self.client_id)?;
        validation::validate_non_empty_string("CLIENT_SECRET", self.client_secret.expose_secret())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSettings {
    pub input: String,
    pub output: String,
    pub assignments: Assignments,
}

impl Validate for ConvertSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_file_extension("input", &self.input, &["csv"])?;
        validation::validate_path("output", &self.output)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub input: String,
    pub assignments: Assignments,
    pub concurrency: usize,
    pub requests_per_second: u32,
    pub failures_out: Option<String>,
}

impl Validate for UploadSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_file_extension("input", &self.input, &["csv"])?;
        validation::validate_range("concurrency", self.concurrency, 1, 32)?;
        validation::validate_range("requests_per_second", self.requests_per_second, 0, 100)?;
        if let Some(path) = &self.failures_out {
            validation::validate_path("failures_out", path)?;
        }
        Ok(())
    }
}
