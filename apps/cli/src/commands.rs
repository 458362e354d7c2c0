//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use contentforge_core::{GenerationSession, LogSink, RunState};
use contentforge_shared::{
    ApiKey, AppConfig, GenerationRequest, LogEvent, PipelineConfig, Severity, api_key_from_env,
    init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ContentForge: generate a Markdown article from a keyword and a source page.
#[derive(Parser)]
#[command(
    name = "contentforge",
    version,
    about = "Generate a Markdown article from a keyword and a source web page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate an article. API keys are read from the environment variables
    /// named in the config file.
    Generate(GenerateArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct GenerateArgs {
    /// Main topic keyword, also used as the search query.
    #[arg(short, long)]
    pub keyword: String,

    /// Source website URL (http:// or https://).
    #[arg(short, long)]
    pub url: String,

    /// Write the article to this file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Maximum number of sections expanded at once.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Chat model to use instead of the configured one.
    #[arg(long)]
    pub model: Option<String>,

    /// Fetch the source page and search related content at the same time.
    #[arg(long)]
    pub parallel_prefetch: bool,

    /// Write the run's log events as JSON to this file.
    #[arg(long)]
    pub events: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contentforge=warn",
        1 => "contentforge=info",
        2 => "contentforge=debug",
        _ => "contentforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Merge flag overrides into the configured pipeline settings.
fn pipeline_config(config: &AppConfig, args: &GenerateArgs) -> PipelineConfig {
    let mut pipeline = PipelineConfig::from(config);
    if let Some(n) = args.concurrency {
        pipeline.section_concurrency = n.max(1);
    }
    if let Some(model) = &args.model {
        pipeline.model = model.clone();
    }
    if args.parallel_prefetch {
        pipeline.parallel_prefetch = true;
    }
    pipeline
}

/// Missing variables become empty keys so validation names the missing one.
fn request_from_env(config: &AppConfig, args: &GenerateArgs) -> GenerationRequest {
    GenerationRequest {
        keyword: args.keyword.clone(),
        website_url: args.url.clone(),
        model_key: api_key_from_env(&config.llm.api_key_env).unwrap_or_else(|| ApiKey::new("")),
        extraction_key: api_key_from_env(&config.extraction.api_key_env)
            .unwrap_or_else(|| ApiKey::new("")),
    }
}

async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let start = Instant::now();
    let config = load_config()?;
    let pipeline_config = pipeline_config(&config, &args);
    let request = request_from_env(&config, &args);

    info!(
        keyword = %request.keyword,
        url = %request.website_url,
        model = %pipeline_config.model,
        concurrency = pipeline_config.section_concurrency,
        "generating article"
    );

    let progress = Arc::new(CliLog::new()?);
    let session = Arc::new(GenerationSession::new(pipeline_config).with_observer(progress.clone()));

    let interrupt = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling run");
                session.cancel();
            }
        })
    };

    let outcome = session.generate(&request).await;
    interrupt.abort();
    progress.finish();

    if let Some(path) = &args.events {
        write_events(path, &session.events())?;
    }

    let document = outcome?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, &document.content)
                .wrap_err_with(|| format!("cannot write article to {}", path.display()))?;
            eprintln!();
            eprintln!("  Article generated!");
            eprintln!("  Words:  {}", document.content.split_whitespace().count());
            eprintln!("  Path:   {}", path.display());
            eprintln!("  Time:   {:.1}s", start.elapsed().as_secs_f64());
            eprintln!();
        }
        None => println!("{}", document.content),
    }

    Ok(())
}

fn write_events(path: &Path, events: &[LogEvent]) -> Result<()> {
    let json = serde_json::to_string_pretty(events)?;
    std::fs::write(path, json)
        .wrap_err_with(|| format!("cannot write events to {}", path.display()))
}

// ---------------------------------------------------------------------------
// CLI log sink
// ---------------------------------------------------------------------------

/// Renders run events on an indicatif spinner.
struct CliLog {
    spinner: ProgressBar,
}

impl CliLog {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl LogSink for CliLog {
    fn emit(&self, event: LogEvent) {
        match event.severity {
            Severity::Info => self.spinner.set_message(event.message.clone()),
            Severity::Success => self.spinner.println(format!("  ✓ {}", event.message)),
            Severity::Error => self.spinner.println(format!("  ✗ {}", event.message)),
        }
    }

    fn state_changed(&self, state: RunState) {
        if state == RunState::ExpandingSections {
            self.spinner.set_message("Expanding sections");
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
