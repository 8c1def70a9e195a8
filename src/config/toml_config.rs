use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 選用的 TOML 設定檔，所有區段都可以省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub cinc: Option<CincSection>,
    pub session: Option<SessionSection>,
    pub convert: Option<ConvertSection>,
    pub upload: Option<UploadSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CincSection {
    pub auth_url: Option<String>,
    pub api_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertSection {
    pub output: Option<String>,
    pub agent_assigned: Option<String>,
    pub listing_agent: Option<String>,
    pub partner: Option<String>,
    pub pipeline: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSection {
    pub concurrency: Option<usize>,
    pub requests_per_second: Option<u32>,
    pub primary_agent: Option<String>,
    pub listing_agent: Option<String>,
    pub partner: Option<String>,
    pub failures_out: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLIENT_SECRET})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn cinc(&self) -> CincSection {
        self.cinc.clone().unwrap_or_default()
    }

    pub fn convert(&self) -> ConvertSection {
        self.convert.clone().unwrap_or_default()
    }

    pub fn upload(&self) -> UploadSection {
        self.upload.clone().unwrap_or_default()
    }

    pub fn session_file(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.file.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(upload) = &self.upload {
            if let Some(concurrency) = upload.concurrency {
                validation::validate_range("upload.concurrency", concurrency, 1, 32)?;
            }
        }
        if let Some(file) = self.session_file() {
            validation::validate_path("session.file", file)?;
        }
        Ok(())
    }
}
