use clap::Parser;
use ri_cinc::adapters::cinc::{
    build_http_client, Authenticator, CincClient, OAuthClient, RateLimiter, SessionStore,
};
use ri_cinc::config::settings::CincSettings;
use ri_cinc::config::toml_config::TomlConfig;
use ri_cinc::config::Command;
use ri_cinc::utils::error::ErrorSeverity;
use ri_cinc::utils::{logger, validation::Validate};
use ri_cinc::{CliConfig, ConvertPipeline, EtlEngine, EtlError, LocalStorage, UploadPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在時忽略
    dotenv::dotenv().ok();

    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting ri-cinc");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ ri-cinc failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(config: CliConfig) -> ri_cinc::Result<()> {
    let toml = config.load_toml()?;
    if let Some(toml) = &toml {
        toml.validate()?;
        tracing::info!("📁 Loaded configuration from {}", config.config.as_deref().unwrap_or_default());
    }
    let session_file = config.session_file(toml.as_ref());

    match &config.command {
        Command::Convert(args) => {
            let settings = args.resolve(toml.as_ref());
            settings.validate()?;

            let pipeline = ConvertPipeline::new(LocalStorage::default(), settings);
            let summary = EtlEngine::new(pipeline).run().await?;

            println!("✅ Converted {} leads", summary.processed_rows);
            if let Some(path) = summary.output_path {
                println!("📁 Output saved to: {}", path);
            }
        }
        Command::Authorize => {
            let authenticator = authenticator(toml.as_ref(), &session_file)?.1;
            let link = authenticator.begin_authorization()?;
            println!("Open this link to grant access to CINC:\n\n  {}\n", link);
            println!("Then run: ri-cinc login --code <code> --state <state>");
        }
        Command::Login(args) => {
            let authenticator = authenticator(toml.as_ref(), &session_file)?.1;
            authenticator
                .complete_authorization(args.code.trim(), args.state.trim())
                .await?;
            println!("✅ Authenticated with CINC");
        }
        Command::Logout => {
            SessionStore::new(&session_file).reset()?;
            println!("✅ Session cleared");
        }
        Command::Upload(args) => {
            let settings = args.resolve(toml.as_ref());
            settings.validate()?;

            let (cinc, authenticator) = authenticator(toml.as_ref(), &session_file)?;
            let limiter = Arc::new(RateLimiter::per_second(settings.requests_per_second));
            let client = CincClient::new(build_http_client()?, cinc.api_url, authenticator, limiter)?;

            let pipeline = UploadPipeline::connect(LocalStorage::default(), settings, client).await?;
            let summary = EtlEngine::new(pipeline).run().await?;

            println!(
                "✅ Delivered {}/{} leads to CINC",
                summary.processed_rows, summary.input_rows
            );
            if summary.failed_rows > 0 {
                eprintln!("⚠️  {} leads failed", summary.failed_rows);
                if let Some(path) = summary.output_path {
                    eprintln!("📁 Failed leads saved to: {}", path);
                }
            }
        }
    }

    Ok(())
}

fn authenticator(
    toml: Option<&TomlConfig>,
    session_file: &str,
) -> Result<(CincSettings, Authenticator), EtlError> {
    let cinc = CincSettings::from_env(toml)?;
    let oauth = OAuthClient::new(build_http_client()?, &cinc);
    Ok((cinc, Authenticator::new(oauth, SessionStore::new(session_file))))
}
