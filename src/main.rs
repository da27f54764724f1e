use buybox_guard::marketplace::TrendyolClient;
use buybox_guard::notify::{DisabledChannel, NotificationChannel, TelegramChannel};
use buybox_guard::orchestration::{
    AutoPilot, BatchRunner, JobLock, JobRunner, ManualPricing, PriceApplier, PricingService,
    Poller, ScheduledJob,
};
use buybox_guard::{api, config::Config, db::init_db, MarketplacePriceClient, PricingEngine, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let client: Arc<dyn MarketplacePriceClient> =
        match TrendyolClient::new(config.trendyol_config()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("Failed to build marketplace client: {}", e);
                std::process::exit(1);
            }
        };
    let notifier: Arc<dyn NotificationChannel> = match &config.telegram {
        Some(tg) => Arc::new(TelegramChannel::new(tg.bot_token.clone(), tg.chat_id.clone())),
        None => Arc::new(DisabledChannel),
    };

    let engine = PricingEngine::new(config.fee_basis);
    let pricing = PricingService::new(repo.clone(), engine);
    let applier = PriceApplier::new(repo.clone(), client.clone(), engine);
    let manual = ManualPricing::new(
        repo.clone(),
        pricing.clone(),
        applier.clone(),
        BatchRunner::new(config.batch_concurrency),
    );
    let jobs = Arc::new(JobRunner::new(
        JobLock::new(repo.clone(), config.job_lock_ttl_seconds),
        AutoPilot::new(repo.clone(), pricing.clone(), applier, notifier.clone()),
        Poller::new(repo.clone(), client, pricing.clone(), notifier),
    ));

    tracing::info!(
        fee_basis = %config.fee_basis,
        seller_id = config.trendyol_seller_id,
        telegram = config.telegram.is_some(),
        "Pricing engine configured"
    );

    // Scheduled jobs; an interval of 0 leaves the job manual-only
    for (job, secs) in [
        (ScheduledJob::AutoPilot, config.autopilot_interval_secs),
        (ScheduledJob::Polling, config.poll_interval_secs),
    ] {
        if secs > 0 {
            tokio::spawn(jobs.clone().schedule(job, Duration::from_secs(secs)));
        }
    }

    // Create router
    let app = api::create_router(api::AppState::new(repo, pricing, manual, jobs));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
