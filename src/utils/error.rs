use thiserror::Error;

/// HTTP 錯誤回應內容最多保留的字元數
const MAX_BODY_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Input file is missing required columns: {}", .columns.join(", "))]
    MissingColumnsError { columns: Vec<String> },

    #[error("Authentication error: {message}")]
    AuthError { message: String },

    #[error("Invalid state parameter. Could not authenticate.")]
    StateMismatchError,

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatusError {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Authentication,
    Network,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    /// 建立 HTTP 狀態錯誤，回應內容會被截斷
    pub fn http_status(status: u16, url: impl Into<String>, body: &str) -> Self {
        let body: String = body.chars().take(MAX_BODY_CHARS).collect();
        Self::HttpStatusError {
            status,
            url: url.into(),
            body,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::MissingColumnsError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Input,
            EtlError::AuthError { .. } | EtlError::StateMismatchError => {
                ErrorCategory::Authentication
            }
            EtlError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::IoError(_) | EtlError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Input
            | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::MissingColumnsError { .. } => {
                "Export the leads from Real Intent again and keep the default column names"
            }
            EtlError::CsvError(_) => "Check that the input file is a well-formed CSV",
            EtlError::StateMismatchError => "Run `ri-cinc authorize` again and use the new link",
            EtlError::AuthError { .. } => "Run `ri-cinc authorize` and `ri-cinc login` to re-authenticate",
            EtlError::MissingConfigError { .. } => {
                "Set the value in the environment, a .env file or the --config TOML file"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => "Fix the configuration value and retry",
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => {
                "Check the network connection and the CINC service status, then retry"
            }
            EtlError::IoError(_) => "Check the file path and its permissions",
            EtlError::SerializationError(_) => "The session file may be corrupted; run `ri-cinc logout`",
            EtlError::ProcessingError { .. } => "Review the input data and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingColumnsError { columns } => format!(
                "The uploaded file does not contain the required columns: {}.",
                columns.join(", ")
            ),
            EtlError::HttpStatusError { status, url, .. } => {
                format!("CINC returned HTTP {} for {}", status, url)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
