use anyhow::Context;
use clap::{Parser, Subcommand};
use news_aggregator::web::{create_app, AppState};
use news_aggregator::{ArticleStore, Config, NewsAggregator, Scheduler};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-aggregator", about = "Daily political news ingestion and listing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the scheduler and the HTTP API
    Serve {
        /// Address to bind, overrides NEWS_BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
        /// Skip the startup ingestion even if today has no articles
        #[arg(long)]
        no_startup_run: bool,
    },
    /// Run a single ingestion and exit
    Fetch,
    /// Print stored articles grouped by day
    List {
        /// Only today's articles
        #[arg(long)]
        today: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let store = ArticleStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open article store at {}", config.database_url))?;

    match cli.command {
        Command::Serve { bind, no_startup_run } => serve(config, store, bind, no_startup_run).await,
        Command::Fetch => {
            let aggregator = NewsAggregator::from_config(&config, store)?;
            let report = aggregator.run().await.context("ingestion run failed")?;
            info!(
                "Added {} articles ({} entries seen, {} skipped)",
                report.committed,
                report.entries_seen,
                report.skipped.values().sum::<usize>()
            );
            Ok(())
        }
        Command::List { today } => {
            if today {
                for article in store.list_today().await? {
                    println!("{}  {}", article.created_at.format("%H:%M"), article.title);
                }
            } else {
                for group in store.list_grouped_by_day().await? {
                    println!("== {} ({} articles)", group.day, group.articles.len());
                    for article in group.articles {
                        println!("  {}  {}", article.title, article.source_url);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config, store: ArticleStore, bind: Option<String>, no_startup_run: bool) -> anyhow::Result<()> {
    let aggregator = Arc::new(NewsAggregator::from_config(&config, store)?);
    let scheduler = Arc::new(Scheduler::new(aggregator, config.schedule));

    if !no_startup_run {
        if let Err(e) = scheduler.run_startup_if_empty().await {
            error!("Startup ingestion failed: {}", e);
        }
    }
    scheduler.start().await.context("failed to start scheduler")?;

    let bind_addr = bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    let app = create_app(AppState {
        scheduler: scheduler.clone(),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    scheduler.stop().await;
    Ok(())
}
