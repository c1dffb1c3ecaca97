use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use nw_cache::MemoryCache;
use nw_core::storage::SourceRepository;
use nw_core::Error;
use nw_fetch::scheduler::CandidateImporter;
use nw_fetch::{FetchDispatcher, FetchScheduler};
use nw_images::ImageService;
use nw_news::{CategoryService, NewsService, SourceService};
use nw_web::AppState;

/// Interval like `1h`, `30m`, `1h15m30s`; a bare number means seconds.
#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut number = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                number.push(c);
            } else if !c.is_whitespace() {
                let value: u64 = number
                    .parse()
                    .map_err(|_| format!("expected a number before '{}'", c))?;
                number.clear();
                total_seconds += match c {
                    's' => value,
                    'm' => value * 60,
                    'h' => value * 3600,
                    'd' => value * 86400,
                    other => return Err(format!("invalid duration unit: {}", other)),
                };
            }
        }

        if !number.is_empty() {
            total_seconds += number.parse::<u64>().map_err(|_| "invalid number".to_string())?;
        }
        if total_seconds == 0 {
            return Err("duration must be positive".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "News ingestion and serving pipeline", long_about = None)]
struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "memory")]
    storage: String,

    /// Database file used by the sqlite backend
    #[arg(long, default_value = "newswire.db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Fetch all due sources once, or one source by slug
    Fetch {
        /// Source slug to fetch regardless of its interval
        #[arg(long)]
        source: Option<String>,
    },
    /// Run the fetch cycle on a fixed interval until interrupted
    Schedule {
        #[arg(long, default_value = "10m")]
        interval: HumanDuration,
    },
    /// Drop every cached news and search entry
    ClearCache,
}

struct Services {
    news: Arc<NewsService>,
    categories: Arc<CategoryService>,
    sources: Arc<SourceService>,
    images: Arc<ImageService>,
    scheduler: Arc<FetchScheduler>,
    backend: nw_storage::Backend,
}

async fn build_services(cli: &Cli) -> anyhow::Result<Services> {
    let backend = nw_storage::create_storage(&cli.storage, Some(cli.db_path.as_path()))
        .await
        .context("failed to initialize storage")?;
    info!("💾 Storage initialized (using {})", cli.storage);

    let cache = Arc::new(MemoryCache::new());
    let images = Arc::new(ImageService::new(backend.blobs.clone()));

    let news = Arc::new(NewsService::new(
        backend.articles.clone(),
        backend.sources.clone(),
        backend.categories.clone(),
        cache.clone(),
        images.clone(),
    ));
    let categories = Arc::new(CategoryService::new(
        backend.categories.clone(),
        backend.articles.clone(),
        cache.clone(),
    ));
    let sources = Arc::new(SourceService::new(backend.sources.clone(), cache));

    let scheduler = Arc::new(FetchScheduler::new(
        backend.sources.clone(),
        FetchDispatcher::new(),
        news.clone() as Arc<dyn CandidateImporter>,
    ));
    info!("🗞️ Fetch pipeline initialized");

    Ok(Services {
        news,
        categories,
        sources,
        images,
        scheduler,
        backend,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let services = build_services(&cli).await?;

    match cli.command {
        Commands::Serve { addr } => {
            let app = nw_web::create_app(AppState {
                news: services.news,
                categories: services.categories,
                sources: services.sources,
                images: services.images,
                scheduler: services.scheduler,
            });

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            info!("🌐 Listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Fetch { source } => match source {
            Some(slug) => {
                let source = services
                    .backend
                    .sources
                    .by_slug(&slug)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("source {}", slug)))?;
                let accepted = services.scheduler.run_one(source.id).await?;
                info!("📰 Imported {} articles from {}", accepted, source.name);
            }
            None => services.scheduler.run_all_due().await,
        },
        Commands::Schedule { interval } => {
            info!(
                "⏰ Running fetch cycle every {}s",
                interval.0.as_secs()
            );
            loop {
                services.scheduler.run_all_due().await;
                info!("waiting {}s before next cycle", interval.0.as_secs());
                tokio::time::sleep(interval.0).await;
            }
        }
        Commands::ClearCache => {
            services.news.clear_news_cache().await?;
            info!("🧹 News cache cleared");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration_units() {
        assert_eq!(HumanDuration::from_str("90").unwrap().0.as_secs(), 90);
        assert_eq!(HumanDuration::from_str("30m").unwrap().0.as_secs(), 1800);
        assert_eq!(
            HumanDuration::from_str("1h15m30s").unwrap().0.as_secs(),
            4530
        );
        assert!(HumanDuration::from_str("x").is_err());
        assert!(HumanDuration::from_str("0s").is_err());
    }
}
