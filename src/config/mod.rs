pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::settings::{
    ConvertSettings, UploadSettings, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_FILE,
    DEFAULT_REQUESTS_PER_SECOND, DEFAULT_SESSION_FILE,
};
#[cfg(feature = "cli")]
use crate::config::toml_config::TomlConfig;
#[cfg(feature = "cli")]
use crate::domain::model::Assignments;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "ri-cinc", version)]
#[command(about = "Convert Real Intent lead exports for CINC, or upload them through the CINC API")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Optional TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Where the CINC session tokens are kept")]
    pub session_file: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Convert a Real Intent CSV into a CINC import CSV
    Convert(ConvertArgs),
    /// Print the CINC authorization link
    Authorize,
    /// Exchange the authorization code returned by CINC for tokens
    Login(LoginArgs),
    /// Forget the stored CINC session
    Logout,
    /// Upload the leads of a Real Intent CSV directly to CINC
    Upload(UploadArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    #[arg(short, long)]
    pub input: String,

    #[arg(short, long, help = "Defaults to converted_file.csv")]
    pub output: Option<String>,

    #[arg(long, help = "Assign every lead to this agent")]
    pub agent_assigned: Option<String>,

    #[arg(long)]
    pub listing_agent: Option<String>,

    #[arg(long)]
    pub partner: Option<String>,

    #[arg(long, help = "Pipeline stage; does not trigger any CINC actions")]
    pub pipeline: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub state: String,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    #[arg(short, long)]
    pub input: String,

    #[arg(long)]
    pub primary_agent: Option<String>,

    #[arg(long)]
    pub listing_agent: Option<String>,

    #[arg(long)]
    pub partner: Option<String>,

    #[arg(long, help = "Leads sent in parallel (1-32)")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Request rate limit, 0 disables it")]
    pub requests_per_second: Option<u32>,

    #[arg(long, help = "Write the leads that failed to this CSV")]
    pub failures_out: Option<String>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 --config 指定的檔案，沒有指定時回傳 None
    pub fn load_toml(&self) -> crate::Result<Option<TomlConfig>> {
        self.config
            .as_deref()
            .map(TomlConfig::from_file)
            .transpose()
    }

    pub fn session_file(&self, toml: Option<&TomlConfig>) -> String {
        self.session_file
            .clone()
            .or_else(|| toml.and_then(|t| t.session_file().map(str::to_string)))
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string())
    }
}

#[cfg(feature = "cli")]
impl ConvertArgs {
    /// 命令列參數優先於 TOML
    pub fn resolve(&self, toml: Option<&TomlConfig>) -> ConvertSettings {
        let section = toml.map(TomlConfig::convert).unwrap_or_default();
        ConvertSettings {
            input: self.input.clone(),
            output: self
                .output
                .clone()
                .or(section.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string()),
            assignments: Assignments {
                agent_assigned: self.agent_assigned.clone().or(section.agent_assigned),
                listing_agent: self.listing_agent.clone().or(section.listing_agent),
                partner: self.partner.clone().or(section.partner),
                pipeline: self.pipeline.clone().or(section.pipeline),
            }
            .normalized(),
        }
    }
}

#[cfg(feature = "cli")]
impl UploadArgs {
    pub fn resolve(&self, toml: Option<&TomlConfig>) -> UploadSettings {
        let section = toml.map(TomlConfig::upload).unwrap_or_default();
        UploadSettings {
            input: self.input.clone(),
            assignments: Assignments {
                agent_assigned: self.primary_agent.clone().or(section.primary_agent),
                listing_agent: self.listing_agent.clone().or(section.listing_agent),
                partner: self.partner.clone().or(section.partner),
                pipeline: None,
            }
            .normalized(),
            concurrency: self
                .concurrency
                .or(section.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            requests_per_second: self
                .requests_per_second
                .or(section.requests_per_second)
                .unwrap_or(DEFAULT_REQUESTS_PER_SECOND),
            failures_out: self.failures_out.clone().or(section.failures_out),
        }
    }
}
