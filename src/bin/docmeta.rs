//! CLI binary for edgequake-docmeta.
//!
//! A thin shim over the library crate that maps CLI flags (and the
//! deployment's environment variables) to `AnalyzerConfig`, analyzes one
//! document and prints the result as JSON on stdout. Logs go to stderr.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use edgequake_docmeta::{AnalyzerConfig, DocumentAnalyzer};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze one stored document (MinIO on localhost, Groq model)
  docmeta --owner-id patient-17 --document-id doc-42 \
          --minio-endpoint localhost:9000 --groq-api-key gsk_...

  # Same, configured through the environment or a .env file
  export MINIO_ENDPOINT=localhost:9000 GROQ_API_KEY=gsk_...
  docmeta --owner-id patient-17 --document-id doc-42 --pretty

  # Use another provider through edgequake-llm
  OPENAI_API_KEY=sk-... docmeta --provider openai --model gpt-4.1-mini \
          --owner-id patient-17 --document-id doc-42

  # Check that storage and the model endpoint are reachable
  docmeta --health

OUTPUT:
  {"success": true, "summary": "...", "tags": ["..."], "error_code": null, "error_message": null}

  error_code is one of DOCUMENT_NOT_FOUND, MINIO_CONNECTION_FAILED,
  PDF_EXTRACTION_FAILED, AI_GENERATION_FAILED, INTERNAL_ERROR.
  The exit status is 1 whenever success is false.
"#;

/// Summarise and tag a medical PDF stored in MinIO / S3.
#[derive(Parser, Debug)]
#[command(
    name = "docmeta",
    version,
    about = "Summarise and tag a medical PDF stored in MinIO / S3",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Owner (patient) identifier.
    #[arg(long, required_unless_present = "health")]
    owner_id: Option<String>,

    /// Document identifier.
    #[arg(long, required_unless_present = "health")]
    document_id: Option<String>,

    /// Probe storage and model, print a health report and exit.
    #[arg(long)]
    health: bool,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,

    /// MinIO / S3 endpoint (host:port or URL).
    #[arg(long, env = "MINIO_ENDPOINT", default_value = "minio:9000")]
    minio_endpoint: String,

    #[arg(long, env = "MINIO_ACCESS_KEY", default_value = "minioadmin", hide_env_values = true)]
    minio_access_key: String,

    #[arg(long, env = "MINIO_SECRET_KEY", default_value = "minioadmin", hide_env_values = true)]
    minio_secret_key: String,

    /// Bucket holding the documents.
    #[arg(long, env = "MINIO_BUCKET_NAME", default_value = "documents")]
    minio_bucket: String,

    /// Use HTTPS for the storage endpoint.
    #[arg(long, env = "MINIO_SECURE", default_value = "false",
          action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
    minio_secure: bool,

    /// S3 region.
    #[arg(long, env = "MINIO_REGION", default_value = "us-east-1")]
    minio_region: String,

    /// API key for the OpenAI-compatible endpoint.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "GROQ_BASE_URL", default_value = "https://api.groq.com/openai/v1")]
    base_url: String,

    /// Model ID.
    #[arg(long, env = "GROQ_MODEL", default_value = "openai/gpt-oss-120b")]
    model: String,

    /// Named edgequake-llm provider (openai, anthropic, gemini, ollama, ...).
    /// When set, the provider's own API key variable is used.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max model output tokens.
    #[arg(long, env = "GROQ_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Model temperature (0.0 to 2.0).
    #[arg(long, env = "GROQ_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Model request timeout in seconds.
    #[arg(long, env = "GROQ_TIMEOUT_SECONDS", default_value_t = 60)]
    api_timeout: u64,

    /// Attempts per stage for connection failures and rate limits.
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Base backoff delay in seconds.
    #[arg(long, env = "RETRY_DELAY_SECONDS", default_value_t = 1.0)]
    retry_delay: f64,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn to_config(&self) -> Result<AnalyzerConfig> {
        let mut builder = AnalyzerConfig::builder()
            .storage_endpoint(&self.minio_endpoint)
            .storage_credentials(&self.minio_access_key, &self.minio_secret_key)
            .bucket(&self.minio_bucket)
            .region(&self.minio_region)
            .secure(self.minio_secure)
            .base_url(&self.base_url)
            .model(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .request_timeout_secs(self.api_timeout)
            .max_retries(self.max_retries)
            .retry_delay_secs(self.retry_delay)
            .log_level(&self.log_level);

        if let Some(ref key) = self.groq_api_key {
            builder = builder.api_key(key);
        }
        if let Some(ref provider) = self.provider {
            builder = builder.provider_name(provider);
        }

        builder.build().context("Invalid configuration")
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,reqwest=warn,object_store=warn",
            level.to_lowercase()
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write result")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.to_config()?;
    let analyzer =
        DocumentAnalyzer::from_config(&config).context("Failed to initialise analyzer")?;

    if cli.health {
        let report = analyzer.health().await;
        print_json(&report, cli.pretty)?;
        return Ok(if report.is_healthy() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let (Some(owner_id), Some(document_id)) = (cli.owner_id.as_deref(), cli.document_id.as_deref())
    else {
        anyhow::bail!("--owner-id and --document-id are required");
    };

    let result = analyzer.analyze_document(owner_id, document_id).await;
    print_json(&result, cli.pretty)?;

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
