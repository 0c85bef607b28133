// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use doctrans::app_config::{self, Config, ProviderKind};
use doctrans::app_controller::Controller;
use doctrans::document::{DomainProfile, OutputMode};
use doctrans::pipeline::BatchState;

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Google,
    Mock,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Anthropic => ProviderKind::Anthropic,
            CliProvider::Google => ProviderKind::Google,
            CliProvider::Mock => ProviderKind::Mock,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliDomain {
    General,
    Arts,
    Technical,
    Sports,
}

impl From<CliDomain> for DomainProfile {
    fn from(cli_domain: CliDomain) -> Self {
        match cli_domain {
            CliDomain::General => DomainProfile::General,
            CliDomain::Arts => DomainProfile::Arts,
            CliDomain::Technical => DomainProfile::Technical,
            CliDomain::Sports => DomainProfile::Sports,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum CliOutputMode {
    KeepOriginal,
    Pdf,
    SpreadsheetSummary,
    DocumentSummary,
}

impl From<CliOutputMode> for OutputMode {
    fn from(cli_mode: CliOutputMode) -> Self {
        match cli_mode {
            CliOutputMode::KeepOriginal => OutputMode::KeepOriginal,
            CliOutputMode::Pdf => OutputMode::Pdf,
            CliOutputMode::SpreadsheetSummary => OutputMode::SpreadsheetSummary,
            CliOutputMode::DocumentSummary => OutputMode::DocumentSummary,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate documents using AI or machine translation providers
    Translate(TranslateArgs),

    /// Generate shell completions for doctrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Documents or directories to translate
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Target language code (e.g., 'ko', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Source language code, or 'auto'
    #[arg(short, long)]
    source_language: Option<String>,

    /// Domain profile biasing the translation style
    #[arg(short, long, value_enum)]
    domain: Option<CliDomain>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// How translated documents are written
    #[arg(long, value_enum)]
    output_mode: Option<CliOutputMode>,

    /// Directory receiving translated documents (defaults to next to each source)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Documents translated at the same time
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable the translation cache
    #[arg(long)]
    no_cache: bool,

    /// Write the batch result as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "doctrans.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// doctrans - batch document translation
///
/// Extracts the text of spreadsheets, word-processor documents, presentations
/// and PDF text, translates it with an AI or machine translation provider and
/// writes translated documents back.
#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(version)]
#[command(about = "Batch document translation tool")]
#[command(long_about = "doctrans translates the text of office documents while keeping their structure.

EXAMPLES:
    doctrans translate report.xlsx.json -t ko             # Translate to Korean using default config
    doctrans translate -p anthropic -d technical docs/ -t de
    doctrans translate --output-mode pdf -o out/ slides.pptx.json -t fr
    doctrans translate -p mock -t es docs/                # Dry run without a provider account
    doctrans completions bash > doctrans.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in doctrans.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    openai    - OpenAI chat completions (requires API key)
    anthropic - Anthropic messages API (requires API key)
    google    - Google Cloud Translation v2 (requires API key)
    mock      - Offline echo provider for dry runs")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is lowered once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doctrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(domain) = &options.domain {
        config.domain = domain.clone().into();
    }

    if let Some(mode) = &options.output_mode {
        config.output.mode = mode.clone().into();
    }

    if let Some(dir) = &options.output_dir {
        config.output.directory = Some(dir.clone());
    }

    if let Some(jobs) = options.jobs {
        config.pipeline.max_concurrent_documents = jobs;
    }

    if options.no_cache {
        config.cache.enabled = false;
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let (mut config, created) = Config::load_or_create(&options.config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", options.config_path);
    }

    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    info!(
        "Translating to {} with {} ({})",
        config.target_language,
        config.translation.provider,
        config.translation.get_model()
    );

    let controller = Controller::with_config(config)?;
    let result = controller.run(&options.inputs).await?;

    if let Some(report_path) = &options.report {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize batch result")?;
        std::fs::write(report_path, json).with_context(|| format!("Failed to write report to {:?}", report_path))?;
        info!("Report written to {:?}", report_path);
    }

    match result.state {
        BatchState::Completed => Ok(()),
        BatchState::CompletedWithErrors => {
            warn!("Batch finished with errors");
            Ok(())
        }
        BatchState::Cancelled => Err(anyhow!("Batch cancelled")),
        BatchState::Failed => Err(anyhow!(
            "{} document(s) failed",
            result.failed_documents().count()
        )),
    }
}
