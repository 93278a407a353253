//! Hotel Express — real-time hotel pricing, availability, and loyalty
//! platform. Main entry point that wires every subsystem together and
//! either starts the HTTP/WebSocket server or runs a one-shot operator
//! command.

use clap::{Parser, Subcommand};
use hotel_availability::{AvailabilityService, StoreBackedRecompute};
use hotel_cache::hybrid::{CacheTuning, HybridCache};
use hotel_cache::kv::RedisDriver;
use hotel_core::clock::{Clock, SystemClock};
use hotel_core::config::AppConfig;
use hotel_core::error::HotelResult;
use hotel_core::event_bus::EventSink;
use hotel_core::types::{
    CacheSettings, CacheStrategy, Coordinates, Hotel, HotelId, InvalidationStrategy, QrSecurityLevel,
    QrSettings, Room, RoomId, RoomStatus, RoomType, YieldManagementConfig,
};
use hotel_loyalty::LoyaltyEngine;
use hotel_pricing::demand::DemandTracker;
use hotel_pricing::engine::PricingEngine;
use hotel_pricing::providers::{CachingCompetitorProvider, CompetitorProvider, NoopCurrencyProvider, UnavailableCompetitorProvider};
use hotel_pubsub::hub::PubSubHub;
use hotel_pubsub::watch::WatchRegistry;
use hotel_store::{InMemoryStore, StoreGateway};
use hotel_workers::directory::HotelDirectory;
use hotel_workers::jobs::{
    CacheWarmingJob, CompetitorRefreshJob, DemandRefreshJob, ExpiredCacheSweepJob, LoyaltyExpiryScanJob, MetricRolloverJob,
};
use hotel_workers::scheduler::{Cadence, Scheduler};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "hotel-express")]
#[command(about = "Real-time hotel pricing, availability, and loyalty platform")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "HOTEL__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "HOTEL__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// WebSocket port, advertised only — the server shares the HTTP listener
    #[arg(long, env = "HOTEL__API__WS_PORT")]
    ws_port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cache operator actions
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Pricing operator actions
    Pricing {
        #[command(subcommand)]
        action: PricingAction,
    },
    /// Loyalty operator actions
    Loyalty {
        #[command(subcommand)]
        action: LoyaltyAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Precompute and populate availability/pricing for a hotel
    Warm { hotel: String },
    /// Clear every cache entry tagged with `tag` across both tiers
    Flush { tag: String },
}

#[derive(Subcommand, Debug)]
enum PricingAction {
    /// Invalidate and recompute a hotel's pricing and availability
    Recompute { hotel: String },
}

#[derive(Subcommand, Debug)]
enum LoyaltyAction {
    /// Run the loyalty points expiry scan immediately
    ExpireNow,
}

#[derive(Serialize)]
struct OperatorResult {
    ok: bool,
    affected: u64,
}

/// Every constructed subsystem, shared between `serve` and the one-shot
/// operator subcommands so both paths build the stack identically.
struct System {
    store: Arc<dyn StoreGateway>,
    cache: Arc<HybridCache>,
    pricing: Arc<PricingEngine>,
    availability: Arc<AvailabilityService>,
    loyalty: Arc<LoyaltyEngine>,
    hub: Arc<PubSubHub>,
    watches: Arc<WatchRegistry>,
    directory: Arc<HotelDirectory>,
    clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_express=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Hotel Express starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id.clone() {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.ws_port {
        config.api.ws_port = port;
    }

    if let Some(command) = cli.command {
        return run_operator_command(command, &config).await;
    }

    serve(config).await
}

/// Connect to an external service with exponential backoff (3 attempts).
async fn connect_with_retry<T, F, Fut>(service_name: &str, connect_fn: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let delays = [
        Duration::from_secs(0),
        Duration::from_secs(2),
        Duration::from_secs(4),
    ];
    let mut last_err = None;
    for (attempt, delay) in delays.iter().enumerate() {
        if attempt > 0 {
            warn!(service = service_name, attempt, "retrying connection after {}s", delay.as_secs());
            tokio::time::sleep(*delay).await;
        }
        match connect_fn().await {
            Ok(conn) => {
                info!(service = service_name, "connected successfully");
                return Ok(conn);
            }
            Err(e) => {
                error!(service = service_name, attempt, error = %e, "connection failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} connection failed", service_name)))
}

/// Seeds a single demo hotel so the fresh in-memory reference store has
/// something for the API, workers, and operator commands to act on. The
/// in-memory store holds nothing across process restarts, so every launch
/// reseeds the same fixture under a stable id.
async fn seed_demo_data(store: &Arc<dyn StoreGateway>) -> anyhow::Result<HotelId> {
    let hotel_id = HotelId::from("hotel-demo-1");
    if store.get_hotel(&hotel_id).await.is_ok() {
        return Ok(hotel_id);
    }

    let hotel = Hotel {
        id: hotel_id.clone(),
        code: "DEMO1".to_string(),
        stars: 4,
        coordinates: Some(Coordinates { lat: 48.8566, lon: 2.3522 }),
        timezone: "UTC".to_string(),
        qr_settings: QrSettings {
            enabled: false,
            security_level: QrSecurityLevel::Standard,
            enabled_for_check_in: false,
            enabled_for_room_service: false,
            enabled_for_payment: false,
            expiry_hours: 24,
            requires_geolocation: false,
            geo_radius_meters: None,
        },
        cache_settings: CacheSettings {
            strategy: CacheStrategy::Balanced,
            custom_ttl_secs: Default::default(),
            invalidation_strategy: InvalidationStrategy::Smart,
            delayed_invalidation_ms: 5_000,
            compression_threshold_bytes: 1024,
            compression_algorithm: hotel_core::types::CompressionAlgorithm::Gzip,
        },
        yield_management: YieldManagementConfig {
            enabled: true,
            base_pricing: Default::default(),
            price_constraints: Default::default(),
            occupancy_thresholds: Default::default(),
            day_of_week_multipliers: [1.0, 1.0, 1.0, 1.0, 1.1, 1.2, 1.2],
            lead_time_pricing: vec![],
            length_of_stay_discounts: vec![],
            event_pricing: vec![],
            seasonal_pricing: vec![],
            revenue_targets: Default::default(),
        },
        performance_metrics: Default::default(),
    };
    store.put_hotel(hotel).await?;

    let rooms = [
        ("101", RoomType::Simple, 90.0),
        ("102", RoomType::Simple, 90.0),
        ("201", RoomType::Double, 130.0),
        ("202", RoomType::Double, 130.0),
        ("301", RoomType::DoubleConfort, 160.0),
        ("401", RoomType::Suite, 260.0),
    ];
    for (number, room_type, base_price) in rooms {
        store
            .put_room(Room {
                id: RoomId::from(format!("{hotel_id}-{number}")),
                hotel_id: hotel_id.clone(),
                number: number.to_string(),
                floor: number[..1].parse().unwrap_or(1),
                room_type,
                base_price,
                status: RoomStatus::Available,
                amenities: vec![],
                yield_override: None,
                current_dynamic_price: None,
                price_history: Default::default(),
                yield_suggestions: Default::default(),
            })
            .await?;
    }

    Ok(hotel_id)
}

async fn build_system(config: &AppConfig) -> anyhow::Result<System> {
    let store: Arc<dyn StoreGateway> = Arc::new(InMemoryStore::new());
    let demo_hotel = seed_demo_data(&store).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let redis = connect_with_retry("Redis", || RedisDriver::connect(&config.redis)).await?;
    let cache = Arc::new(HybridCache::new(Arc::new(redis), config.cache.local_cache_capacity, clock.clone()));

    let hub = Arc::new(PubSubHub::new());
    let watches = Arc::new(WatchRegistry::new(hub.clone() as Arc<dyn EventSink>));
    let events: Arc<dyn EventSink> = watches.clone();

    let recompute = Arc::new(StoreBackedRecompute::new(store.clone()));
    let demand = Arc::new(DemandTracker::new(cache.clone(), recompute));

    let currency = Arc::new(NoopCurrencyProvider);
    let competitor: Arc<dyn CompetitorProvider> = Arc::new(CachingCompetitorProvider::new(
        Arc::new(UnavailableCompetitorProvider),
        cache.clone(),
        Duration::from_secs(3600),
    ));

    let pricing = Arc::new(PricingEngine::new(
        demand,
        currency,
        competitor,
        config.pricing.valid_window_minutes,
        config.pricing.min_price_floor_pct,
        config.pricing.max_daily_price_change_pct,
    ));

    let availability = Arc::new(AvailabilityService::new(
        store.clone(),
        cache.clone(),
        pricing.clone(),
        events.clone(),
        config.cache.availability_ttl_secs,
        config.cache.occupancy_ttl_secs,
    ));

    let loyalty = Arc::new(LoyaltyEngine::new(store.clone(), events.clone(), clock.clone(), config.loyalty.clone()));

    let directory = Arc::new(HotelDirectory::new());
    directory.register(demo_hotel);

    Ok(System {
        store,
        cache,
        pricing,
        availability,
        loyalty,
        hub,
        watches,
        directory,
        clock,
    })
}

fn spawn_scheduler(system: &System, config: &AppConfig) -> anyhow::Result<()> {
    let mut scheduler = Scheduler::new(system.clock.clone());

    scheduler.register(
        Arc::new(DemandRefreshJob::new(system.pricing.clone(), system.watches.clone(), system.directory.clone())),
        Cadence::Interval(Duration::from_millis(config.workers.demand_refresh_interval_ms)),
    );
    scheduler.register(
        Arc::new(CacheWarmingJob::new(system.availability.clone(), system.directory.clone(), config.workers.warm_horizon_days)),
        Cadence::Interval(Duration::from_millis(config.workers.cache_warm_interval_ms)),
    );
    let competitor: Arc<dyn CompetitorProvider> = Arc::new(UnavailableCompetitorProvider);
    scheduler.register(
        Arc::new(CompetitorRefreshJob::new(competitor, system.directory.clone())),
        Cadence::Interval(Duration::from_millis(config.workers.competitor_refresh_interval_ms)),
    );
    scheduler.register(
        Arc::new(ExpiredCacheSweepJob::new(system.cache.clone())),
        Cadence::Cron(cron::Schedule::from_str(&config.cache.scheduled_sweep_cron)?),
    );
    scheduler.register(
        Arc::new(MetricRolloverJob::new(system.store.clone(), system.hub.clone(), system.watches.clone(), system.directory.clone())),
        Cadence::Interval(Duration::from_millis(config.workers.metric_rollover_interval_ms)),
    );
    scheduler.register(
        Arc::new(LoyaltyExpiryScanJob::new(system.loyalty.clone())),
        Cadence::Interval(Duration::from_millis(config.workers.loyalty_expiry_scan_interval_ms)),
    );

    let scheduler = Arc::new(scheduler);
    tokio::spawn(scheduler.run_forever(Duration::from_secs(5)));
    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let system = build_system(&config).await?;
    spawn_scheduler(&system, &config)?;

    let state = hotel_api::AppState {
        store: system.store.clone(),
        availability: system.availability.clone(),
        pricing: system.pricing.clone(),
        loyalty: system.loyalty.clone(),
        hub: system.hub.clone(),
        watches: system.watches.clone(),
        directory: system.directory.clone(),
        clock: system.clock.clone(),
        node_id: config.node_id.clone(),
        start_time: std::time::Instant::now(),
    };

    let router = hotel_api::build_router(state, &config.cors_origin);

    let metrics_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = metrics_builder
        .with_http_listener(std::net::SocketAddr::new(config.api.host.parse()?, config.metrics.port))
        .install_recorder()?;
    info!(port = config.metrics.port, "metrics exporter started");
    std::mem::forget(metrics_handle);

    info!(node_id = %config.node_id, http_port = config.api.http_port, "Hotel Express is ready to serve traffic");

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("received SIGINT, shutting down");
        }
    };

    let addr = std::net::SocketAddr::new(config.api.host.parse()?, config.api.http_port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "starting HTTP server");
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    info!("Hotel Express shut down cleanly");
    Ok(())
}

async fn run_operator_command(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    let system = build_system(config).await?;
    let now = system.clock.now();

    let outcome: HotelResult<u64> = match command {
        Commands::Cache { action: CacheAction::Warm { hotel } } => system
            .availability
            .warm(&HotelId::from(hotel), config.workers.warm_horizon_days, now)
            .await
            .map(u64::from),
        Commands::Cache { action: CacheAction::Flush { tag } } => system
            .cache
            .invalidate(&tag, InvalidationStrategy::Immediate, CacheTuning::default())
            .await
            .map(|_| 1u64),
        Commands::Pricing { action: PricingAction::Recompute { hotel } } => {
            let hotel_id = HotelId::from(hotel);
            for tag in [
                format!("avail:{hotel_id}"),
                format!("price:{hotel_id}"),
                format!("occupancy:{hotel_id}"),
            ] {
                system
                    .cache
                    .invalidate(&tag, InvalidationStrategy::Immediate, CacheTuning::default())
                    .await?;
            }
            system
                .availability
                .warm(&hotel_id, config.workers.warm_horizon_days, now)
                .await
                .map(u64::from)
        }
        Commands::Loyalty { action: LoyaltyAction::ExpireNow } => system
            .loyalty
            .run_expiry_scan()
            .await
            .map(|report| report.transactions_expired as u64),
    };

    match outcome {
        Ok(affected) => {
            println!("{}", serde_json::to_string(&OperatorResult { ok: true, affected })?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string(&OperatorResult { ok: false, affected: 0 })?);
            error!(error = %err, "operator command failed");
            std::process::exit(1);
        }
    }
}
