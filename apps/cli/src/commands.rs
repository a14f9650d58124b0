//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use ragpipe_chat::{ChatHandler, Incoming, MemorySessionStore};
use ragpipe_crawler::{CrawlObserver, Crawler};
use ragpipe_dataset::JsonlWriter;
use ragpipe_pipeline::{AnswerChain, DatasetRetriever, OpenAiCompatClient, clean};
use ragpipe_shared::{
    AppConfig, CrawlConfig, SessionId, init_config, load_config, validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ragpipe — turn a website into an answerable knowledge dataset.
#[derive(Parser)]
#[command(
    name = "ragpipe",
    version,
    about = "Crawl a site into a JSONL dataset and answer questions over it.",
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
    /// Crawl a website into a JSON Lines dataset.
    Crawl {
        /// Seed URL; traversal stays within its origin.
        url: String,

        /// Output dataset path (defaults to the configured dataset path).
        #[arg(short, long)]
        out: Option<String>,

        /// Override the content settle delay in milliseconds.
        #[arg(long)]
        settle_ms: Option<u64>,
    },

    /// Convert a crawl CSV export into fine-tuning JSONL.
    Convert {
        /// Input CSV with Title and Content columns.
        input: String,

        /// Output JSONL path (defaults to the input with a .jsonl extension).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Ask a single question against a crawled dataset.
    Ask {
        /// The question to answer.
        question: String,

        /// Dataset to answer from (defaults to the configured dataset path).
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Interactive chat session over a crawled dataset.
    Chat {
        /// Dataset to answer from (defaults to the configured dataset path).
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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
        0 => "ragpipe=info",
        1 => "ragpipe=debug",
        _ => "ragpipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            url,
            out,
            settle_ms,
        } => cmd_crawl(&url, out.as_deref(), settle_ms).await,
        Command::Convert { input, out } => cmd_convert(&input, out.as_deref()).await,
        Command::Ask { question, dataset } => cmd_ask(&question, dataset.as_deref()).await,
        Command::Chat { dataset } => cmd_chat(dataset.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

async fn cmd_crawl(url: &str, out: Option<&str>, settle_ms: Option<u64>) -> Result<()> {
    let config = load_config()?;

    let seed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let mut crawl_config = CrawlConfig::from(&config);
    if let Some(ms) = settle_ms {
        crawl_config.settle_ms = ms;
    }

    let out_path = PathBuf::from(out.unwrap_or(&config.defaults.dataset_path));
    let mut sink = JsonlWriter::create(&out_path)?;

    info!(url, out = %out_path.display(), "starting crawl");

    let crawler = Crawler::new(&crawl_config)?;
    let reporter = CliProgress::new();
    let summary = crawler.crawl(&seed, &mut sink, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Crawl complete!");
    println!("  Pages:   {}", summary.pages_fetched);
    println!("  Skipped: {}", summary.pages_skipped);
    println!("  Errors:  {}", summary.errors.len());
    println!("  Output:  {}", out_path.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Crawl progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CrawlObserver for CliProgress {
    fn page_visited(&self, url: &str, fetched: usize, frontier_len: usize) {
        self.spinner.set_message(format!(
            "Crawling [{fetched} done, {frontier_len} queued] {url}"
        ));
    }
}

// ---------------------------------------------------------------------------
// convert
// ---------------------------------------------------------------------------

async fn cmd_convert(input: &str, out: Option<&str>) -> Result<()> {
    let config = load_config()?;

    let input_path = PathBuf::from(input);
    let out_path = match out {
        Some(p) => PathBuf::from(p),
        None => input_path.with_extension("jsonl"),
    };

    info!(input, out = %out_path.display(), "converting dataset");

    let summary =
        ragpipe_dataset::convert_csv(&input_path, &out_path, config.converter.char_limit)?;

    println!();
    println!("  Conversion complete!");
    println!("  Written: {}", summary.written);
    println!("  Dropped: {}", summary.dropped);
    println!("  Output:  {}", out_path.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// ask / chat
// ---------------------------------------------------------------------------

/// Build the answer chain from config and a dataset path.
fn build_chain(config: &AppConfig, dataset: Option<&str>) -> Result<AnswerChain> {
    validate_api_key(config)?;

    let dataset_path = PathBuf::from(dataset.unwrap_or(&config.defaults.dataset_path));
    let retriever = DatasetRetriever::from_file(&dataset_path)?;
    if retriever.is_empty() {
        return Err(eyre!(
            "dataset '{}' has no records — run `ragpipe crawl` first",
            dataset_path.display()
        ));
    }

    info!(
        dataset = %dataset_path.display(),
        records = retriever.len(),
        "dataset loaded"
    );

    let client = OpenAiCompatClient::new(&config.llm)?;
    let chain = AnswerChain::new(
        Arc::new(client),
        Arc::new(retriever),
        config.defaults.retrieval_k,
    )?;

    Ok(chain)
}

async fn cmd_ask(question: &str, dataset: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let chain = build_chain(&config, dataset)?;

    let response = chain.answer(question).await;
    println!("{}", clean(&response.result.output));

    Ok(())
}

async fn cmd_chat(dataset: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let chain = build_chain(&config, dataset)?;

    let store = Arc::new(MemorySessionStore::new());
    let handler = ChatHandler::new(store, chain);
    let session = SessionId::new();

    println!("Chatting over the dataset. Empty line or Ctrl-D to quit.");

    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            break;
        }

        let reply = handler
            .handle(&session, Incoming::Text(text.to_string()))
            .await;
        println!("{reply}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
