use std::net::SocketAddr;

use thrift_api::automation::AutomationTracker;
use thrift_api::config::Config;
use thrift_api::rate_limit::CounterStore;
use thrift_api::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "thrift_api=debug,tower_http=debug".into());
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load config
    let config = Config::from_env()?;

    let args: Vec<String> = std::env::args().collect();

    // Automation report: cargo run -- automation-report [limit]
    if args.get(1).is_some_and(|a| a == "automation-report") {
        let limit = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

        let store = thrift_api::db::pool::connect_automation(&config.automation_database_url).await?;
        thrift_api::db::migration::run_automation(&store).await?;
        let tracker = AutomationTracker::new(store);

        println!("=== Recent automation runs ===\n");
        for run in tracker.recent_runs(limit).await? {
            println!(
                "  #{:<5} started {}  duration {}  processed {}  skipped {}  errors {}",
                run.id,
                run.started_at,
                run.duration_seconds
                    .map(|d| format!("{d:.1}s"))
                    .unwrap_or_else(|| "running".to_string()),
                run.posts_processed,
                run.posts_skipped,
                run.errors_count,
            );
        }

        println!("\n=== Unresolved errors ===\n");
        for error in tracker.unresolved_errors(limit).await? {
            println!(
                "  #{:<5} r/{} {}: {}",
                error.id, error.subreddit, error.post_id, error.error_message
            );
        }

        return Ok(());
    }

    // Connect to database
    let db = thrift_api::db::pool::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    thrift_api::db::migration::run(&db).await?;
    tracing::info!("Migrations applied");

    // Token cleanup: cargo run -- purge-tokens
    if args.get(1).is_some_and(|a| a == "purge-tokens") {
        let now = chrono::Utc::now().naive_utc();
        let purged = thrift_api::auth::tokens::purge_expired(&db, now).await?;
        println!("Purged {purged} expired refresh tokens.");
        return Ok(());
    }

    // Initialize JWT manager
    let jwt = thrift_api::auth::jwt::JwtManager::new(&config)?;

    // Build app state
    let state = AppState {
        db,
        jwt,
        config: config.clone(),
        counters: CounterStore::new(),
    };

    // Build router
    let app = thrift_api::routes::create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
