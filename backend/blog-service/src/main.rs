use actix_web::{web, HttpServer};
use anyhow::{bail, Context};
use blog_service::config::{Config, StorageBackend};
use blog_service::db::{create_pool, run_migrations, BlogStore, DbConfig, MemoryStore, PgStore};
use blog_service::models::NewGroup;
use blog_service::{build_app, AppState};
use page_cache::{MemoryPageCache, PageCache, RedisPageCache};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect_postgres(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let db_config = DbConfig::new(&config.database.url, config.database.max_connections);
    db_config.log_config();
    create_pool(&db_config)
        .await
        .context("Failed to connect to PostgreSQL")
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn BlogStore>> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let pool = connect_postgres(config).await?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn build_page_cache(config: &Config) -> anyhow::Result<Arc<dyn PageCache>> {
    match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisPageCache::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Page cache: redis");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!("Page cache: in-process (REDIS_URL not set)");
            Ok(Arc::new(MemoryPageCache::new()))
        }
    }
}

/// `blog-service create-group <slug> <title> [description]`
async fn create_group(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let (slug, title) = match args {
        [slug, title, ..] => (slug.clone(), title.clone()),
        _ => bail!("usage: blog-service create-group <slug> <title> [description]"),
    };
    let description = args.get(2).cloned().unwrap_or_default();

    let store = build_store(config).await?;
    let group = store
        .create_group(NewGroup {
            title,
            slug,
            description,
        })
        .await
        .context("Failed to create group")?;

    tracing::info!(group_id = group.id, slug = %group.slug, "group created");
    println!("{}\t{}\t{}", group.id, group.slug, group.title);
    Ok(())
}

/// Container healthcheck against the local server
async fn healthcheck(config: &Config) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{}/health", config.app.port);
    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .context("healthcheck HTTP error")?;
    if !resp.status().is_success() {
        bail!("healthcheck HTTP status: {}", resp.status());
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = build_store(&config).await?;
    let page_cache = build_page_cache(&config).await?;

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("Failed to create media root {}", config.media.root))?;

    let state = web::Data::new(AppState::from_config(&config, store, page_cache));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || build_app(state.clone()))
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await
        .context("HTTP server error")?;

    tracing::info!("blog-service shut down");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => {
            tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Environment: {}", config.app.env);
            serve(config).await
        }
        Some("migrate") => {
            let pool = connect_postgres(&config).await?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Ok(())
        }
        Some("create-group") => create_group(&config, &args[1..]).await,
        Some("healthcheck") => healthcheck(&config).await,
        Some(other) => bail!(
            "unknown command '{}'; expected serve, migrate, create-group or healthcheck",
            other
        ),
    }
}
