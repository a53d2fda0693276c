use anyhow::Context;
use chat_import::cache::ShareCache;
use chat_import::config::{Config, Environment};
use chat_import::{ImportOptions, ModeOverride, Role, RoleChoice, ShareResolver, SplitMode};
use reqwest::Url;
use std::io::Read;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "chat-import",
    about = "Import chat transcripts and AI share pages as user/assistant turns"
)]
enum Command {
    /// Parse a transcript, share-page HTML or share link and print the session as JSON
    Import(ImportArgs),
    /// Run the same-origin proxy for share-page fetches
    Proxy(ProxyArgs),
}

#[derive(StructOpt, Debug)]
struct ImportArgs {
    /// Input file, or `-` for stdin
    #[structopt(default_value = "-")]
    input: PathBuf,

    /// Parsing mode (auto, speaker or alternate)
    #[structopt(short = "m", long)]
    mode: Option<ModeOverride>,

    /// Alternate-mode split (line or paragraph)
    #[structopt(short = "s", long)]
    split: Option<SplitMode>,

    /// Speaker whose turns become the user's
    #[structopt(long)]
    self_speaker: Option<String>,

    /// Role of the first alternate-mode entry (user or assistant)
    #[structopt(long)]
    first_role: Option<Role>,

    /// Invert every assigned role
    #[structopt(long)]
    swap: bool,

    /// Do not read or write the share-page cache (cached pages never expire)
    #[structopt(long)]
    no_cache: bool,

    /// Path to a TOML config file
    #[structopt(short = "c", long)]
    config: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
struct ProxyArgs {
    /// Address to listen on, overriding the config file
    #[structopt(short = "b", long)]
    bind: Option<std::net::SocketAddr>,

    /// Path to a TOML config file
    #[structopt(short = "c", long)]
    config: Option<PathBuf>,
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    let mut data = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_end(&mut data)?;
    } else {
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .read_to_end(&mut data)?;
    }
    String::from_utf8(data).context("Input is not valid UTF-8")
}

async fn run_import(args: ImportArgs, environment: Environment) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref()).await?;
    let defaults = config.import.options();
    let options = ImportOptions {
        mode: args.mode.unwrap_or(defaults.mode),
        split: args.split.unwrap_or(defaults.split),
    };
    let choice = RoleChoice {
        self_speaker: args.self_speaker,
        first_role: args.first_role.unwrap_or(config.import.first_role),
        swap: args.swap,
    };

    let raw = read_input(&args.input)?;

    let proxy_base = environment
        .chat_import_proxy
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("CHAT_IMPORT_PROXY is not a valid URL")?;
    let cache = if args.no_cache || environment.chat_import_no_cache {
        None
    } else {
        match ShareCache::new().await {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(%err, "share-page cache unavailable");
                None
            }
        }
    };
    let resolver =
        ShareResolver::new(proxy_base, cache).context("Failed to build HTTP client")?;

    let parsed = chat_import::import(&raw, &options, &resolver).await;
    let session = parsed.session(&choice);
    info!(
        mode = %session.detected_mode,
        entries = session.entries.len(),
        ignored = session.ignored_line_count,
        "import finished"
    );
    if !session.notice.is_empty() {
        eprintln!("{}", session.notice);
    }

    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

async fn run_proxy(args: ProxyArgs) -> anyhow::Result<()> {
    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(bind) = args.bind {
        config.proxy.bind = bind;
    }
    chat_import::proxy::serve(&config.proxy).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let environment = Environment::load()?;

    match Command::from_args() {
        Command::Import(args) => run_import(args, environment).await,
        Command::Proxy(args) => run_proxy(args).await,
    }
}
