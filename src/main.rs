use background_service::{
    AppState, BackgroundService, DesktopNotifier, MirrorPipeline, PipelineSettings,
};
use clap::Parser;
use mirror_core::{
    BotConfig, CacheBackend, CommentComposer, CoreError, DomainDispatcher, ErrorExt, PostFilter,
    SeenStore,
};
use mirror_services::{build_converters, build_http_client, HttpMediaResolver};
use reddit_client::{RedditClient, RedditOAuth2Config};
use seen_store::{FileSeenStore, PersistMode, RedisSeenStore, SeenCache};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "gfy_mirror=info,background_service=info,reddit_client=info,\
mirror_services=info,seen_store=info,mirror_core=info";

#[derive(Debug, Parser)]
#[command(
    name = "gfy_mirror",
    version,
    about = "Mirrors gif and short video posts and comments the links"
)]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Process posts but never comment or persist the seen-set
    #[arg(short, long)]
    dry_run: bool,

    /// Desktop notification after each poll cycle
    #[arg(short, long)]
    notify: bool,

    /// Ask to clear the seen-set
    #[arg(short, long)]
    flush_cache: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Remove one post id or URL from the seen-set and exit
    #[arg(long, value_name = "KEY")]
    forget: Option<String>,
}

fn main() -> Result<(), CoreError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cli)).inspect_err(|e| {
        e.log_error();
        tracing::error!("{}", e.user_friendly_message());
    })
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    tracing::info!("Starting gfy_mirror");

    let mut config = BotConfig::load(cli.config.as_deref())?;
    config.apply_process_env();
    config.apply_credentials_file()?;
    config.validate()?;

    let store = open_store(&config)?;

    if let Some(key) = cli.forget.as_deref() {
        let mut cache = SeenCache::load(store, PersistMode::OnShutdown).await?;
        cache.remove(key).await?;
        cache.flush().await?;
        return Ok(());
    }

    if cli.flush_cache {
        if confirm("Are you sure you want to flush the seen-set cache?")? {
            tracing::warn!("Flushing the seen-set is not implemented, nothing was removed");
        } else {
            tracing::info!("Cache flush cancelled");
        }
        return Ok(());
    }

    let credentials = config.credentials()?;
    let reddit = RedditClient::new(RedditOAuth2Config::from_credentials(
        &credentials,
        &config.reddit.user_agent,
    ))?;
    if let Err(e) = reddit.authenticate().await {
        tracing::error!("Login failed, exiting");
        return Err(e);
    }

    let http = build_http_client(Duration::from_secs(config.mirrors.request_timeout_secs))?;
    let resolver = Arc::new(HttpMediaResolver::new(http));
    let converters = build_converters(&config.mirrors)?;

    let filter = PostFilter::new(&config.filter, credentials.username.clone());
    let composer = CommentComposer::new(&config.footer, DomainDispatcher::default());
    let pipeline = MirrorPipeline::new(
        Arc::new(reddit),
        resolver,
        converters,
        filter,
        composer,
        PipelineSettings::from_config(&config, cli.dry_run),
    );

    let mode = PersistMode::for_backend(config.cache.backend, cli.dry_run);
    let cache = SeenCache::load(store, mode).await?;
    if cli.dry_run {
        tracing::info!("Dry run: no comments are posted and the seen-set is not saved");
    }

    let mut service = BackgroundService::new(
        AppState::new(pipeline, cache),
        config.polling.interval(),
        cli.once || config.polling.run_once,
    );
    if cli.notify {
        service = service.with_notifier(Arc::new(DesktopNotifier));
    }

    let state = service.start().await;
    tracing::info!(
        "Exiting after {} cycles with {} seen entries",
        state.cycles,
        state.cache.seen().len()
    );
    Ok(())
}

fn open_store(config: &BotConfig) -> Result<Arc<dyn SeenStore>, CoreError> {
    let store: Arc<dyn SeenStore> = match config.cache.backend {
        CacheBackend::File => Arc::new(FileSeenStore::new(config.cache.path.clone())),
        CacheBackend::Redis => {
            let url = config.cache.redis_url.as_deref().unwrap_or_default();
            Arc::new(RedisSeenStore::new(url, config.cache.redis_key.clone())?)
        }
    };
    Ok(store)
}

fn confirm(question: &str) -> Result<bool, CoreError> {
    print!("{} (y/n) ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
