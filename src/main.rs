// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use notewai::app_config::{self, Config, TranslationProvider};
use notewai::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Gemini,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
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
    /// Translate a JSON file of notes (default command)
    Translate(TranslateArgs),

    /// Send a tiny request to the configured provider
    Check(CheckArgs),

    /// Generate shell completions for notewai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct SharedArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// JSON file holding an array of notes
    #[arg(value_name = "RECORDS_JSON")]
    input_path: PathBuf,

    /// Output file (defaults to <input>.<target>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code or name (e.g., 'ja', 'Japanese')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'en', 'English')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Maximum concurrent provider requests
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    #[command(flatten)]
    shared: SharedArgs,
}

/// notewai - Note translation with AI
///
/// Duplicates flashcard notes and fills the copies with AI translations.
#[derive(Parser, Debug)]
#[command(name = "notewai")]
#[command(version)]
#[command(about = "AI-powered note translation tool")]
#[command(long_about = "notewai duplicates notes and translates the mapped fields of each copy using AI providers.

EXAMPLES:
    notewai deck.json                           # Translate using default config
    notewai -p gemini -m gemini-1.5-pro deck.json  # Use specific provider and model
    notewai -s ja -t fr -j 2 deck.json          # Japanese to French, 2 requests at a time
    notewai check                               # Test the configured provider
    notewai completions bash > notewai.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys left empty in the file are read from
    OPENAI_API_KEY or GEMINI_API_KEY.

SUPPORTED PROVIDERS:
    openai - OpenAI chat completions API (default: gpt-4o-mini)
    gemini - Google Gemini API (default: gemini-1.5-flash)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON file holding an array of notes
    #[arg(value_name = "RECORDS_JSON")]
    input_path: Option<PathBuf>,

    /// Output file (defaults to <input>.<target>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code or name (e.g., 'ja', 'Japanese')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'en', 'English')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Maximum concurrent provider requests
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    #[command(flatten)]
    shared: SharedArgs,
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

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
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
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with trace and narrow it once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "notewai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Check(args)) => run_check(args).await,
        None => {
            // Default behavior - use top-level args
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("RECORDS_JSON is required when no subcommand is specified")
            })?;

            let translate_args = TranslateArgs {
                input_path,
                output: cli.output,
                source_language: cli.source_language,
                target_language: cli.target_language,
                concurrency: cli.concurrency,
                shared: cli.shared,
            };
            run_translate(translate_args).await
        }
    }
}

/// Load the config file and apply the options shared by every subcommand
fn load_config(shared: &SharedArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &shared.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config_path = Path::new(&shared.config_path);
    let (mut config, created) = Config::load_or_create(config_path)?;
    if created {
        warn!(
            "Config file not found at '{}', created a default config.",
            config_path.display()
        );
    }

    // Override config with CLI options if provided
    if let Some(provider) = &shared.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &shared.model {
        let provider = config.translation.provider;
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    if let Some(log_level) = &shared.log_level {
        config.log_level = log_level.clone().into();
    } else {
        log::set_max_level(level_filter(&config.log_level));
    }

    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut config = load_config(&options.shared)?;

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.common.concurrent_requests = concurrency;
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    if !options.input_path.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", options.input_path));
    }

    let controller = Controller::with_config(config)?;
    let report = controller.run(&options.input_path, options.output).await?;

    if report.stats.skipped > 0 {
        info!(
            "{} of {} notes were not translated, see the output file for reasons",
            report.stats.skipped,
            report.len()
        );
    }
    Ok(())
}

async fn run_check(options: CheckArgs) -> Result<()> {
    let config = load_config(&options.shared)?;
    config.validate().context("Configuration validation failed")?;
    Controller::with_config(config)?.check_connection().await
}
