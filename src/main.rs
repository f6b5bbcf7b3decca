use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetdesk::infrastructure::AppState;
use assetdesk::services::sticker_service;
use assetdesk::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assetdesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // --profile wins over PROFILE
    let args: Vec<String> = std::env::args().collect();
    let config = match args.iter().position(|arg| arg == "--profile") {
        Some(pos) => match args.get(pos + 1) {
            Some(profile) => config::Config::for_profile(profile.clone()),
            None => {
                tracing::error!("--profile needs a value");
                std::process::exit(2);
            }
        },
        None => config::Config::from_env(),
    };

    if let Err(e) = std::fs::create_dir_all(&config.media_root) {
        tracing::error!("Failed to create media root {:?}: {}", config.media_root, e);
        std::process::exit(1);
    }

    // Initialize database
    let db = match db::init_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    // Maintenance mode: deactivate stickers of retired products, then exit
    if args.iter().any(|arg| arg == "--sweep-stickers") {
        match sticker_service::sweep(&db, &config.media_root).await {
            Ok(count) => tracing::info!("Swept {} orphaned stickers", count),
            Err(e) => {
                tracing::error!("Sticker sweep failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db).await {
            tracing::error!("Failed to seed data: {}", e);
        }
    }

    let state = AppState::new(db, config);
    if let Err(e) = server::serve(state).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
