use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `HOTEL__` (double underscore separates nesting) and, where a
/// hotel overrides a default inline, from that hotel's stored `cacheSettings`
/// / `yieldManagement` documents — never from this struct directly.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub cache: CacheDefaults,
    #[serde(default)]
    pub pricing: PricingDefaults,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_auth_secret")]
    pub auth_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_ws_port() -> u16 {
    8081
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_pool_size() -> u32 {
    32
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_currency() -> String {
    "EUR".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_cors_origin() -> String {
    "*".to_string()
}
fn default_auth_secret() -> String {
    "dev-secret-change-me".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            pool_size: default_pool_size(),
            ttl_secs: default_ttl_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            redis: RedisConfig::default(),
            metrics: MetricsConfig::default(),
            cache: CacheDefaults::default(),
            pricing: PricingDefaults::default(),
            loyalty: LoyaltyConfig::default(),
            workers: WorkersConfig::default(),
            default_currency: default_currency(),
            default_timezone: default_timezone(),
            cors_origin: default_cors_origin(),
            auth_secret: default_auth_secret(),
        }
    }
}

// ─── Hybrid Cache defaults ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CacheDefaults {
    #[serde(default = "default_availability_ttl_secs")]
    pub availability_ttl_secs: u64,
    #[serde(default = "default_pricing_ttl_secs")]
    pub pricing_ttl_secs: u64,
    #[serde(default = "default_demand_ttl_secs")]
    pub demand_ttl_secs: u64,
    #[serde(default = "default_occupancy_ttl_secs")]
    pub occupancy_ttl_secs: u64,
    #[serde(default = "default_hotel_ttl_secs")]
    pub hotel_ttl_secs: u64,
    #[serde(default = "default_compression_threshold_bytes")]
    pub compression_threshold_bytes: usize,
    #[serde(default = "default_delayed_invalidation_ms")]
    pub delayed_invalidation_ms: u64,
    #[serde(default = "default_local_cache_capacity")]
    pub local_cache_capacity: usize,
    #[serde(default = "default_scheduled_sweep_cron")]
    pub scheduled_sweep_cron: String,
}

fn default_availability_ttl_secs() -> u64 {
    120
}
fn default_pricing_ttl_secs() -> u64 {
    1800
}
fn default_demand_ttl_secs() -> u64 {
    900
}
fn default_occupancy_ttl_secs() -> u64 {
    120
}
fn default_hotel_ttl_secs() -> u64 {
    3600
}
fn default_compression_threshold_bytes() -> usize {
    1024
}
fn default_delayed_invalidation_ms() -> u64 {
    5_000
}
fn default_local_cache_capacity() -> usize {
    1_000_000
}
fn default_scheduled_sweep_cron() -> String {
    "0 */15 * * * *".to_string()
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            availability_ttl_secs: default_availability_ttl_secs(),
            pricing_ttl_secs: default_pricing_ttl_secs(),
            demand_ttl_secs: default_demand_ttl_secs(),
            occupancy_ttl_secs: default_occupancy_ttl_secs(),
            hotel_ttl_secs: default_hotel_ttl_secs(),
            compression_threshold_bytes: default_compression_threshold_bytes(),
            delayed_invalidation_ms: default_delayed_invalidation_ms(),
            local_cache_capacity: default_local_cache_capacity(),
            scheduled_sweep_cron: default_scheduled_sweep_cron(),
        }
    }
}

// ─── Pricing Engine defaults ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PricingDefaults {
    #[serde(default = "default_valid_window_minutes")]
    pub valid_window_minutes: i64,
    #[serde(default = "default_min_price_floor_pct")]
    pub min_price_floor_pct: f64,
    #[serde(default = "default_max_daily_price_change_pct")]
    pub max_daily_price_change_pct: f64,
}

fn default_valid_window_minutes() -> i64 {
    30
}
fn default_min_price_floor_pct() -> f64 {
    0.5
}
fn default_max_daily_price_change_pct() -> f64 {
    0.2
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            valid_window_minutes: default_valid_window_minutes(),
            min_price_floor_pct: default_min_price_floor_pct(),
            max_daily_price_change_pct: default_max_daily_price_change_pct(),
        }
    }
}

// ─── Loyalty Engine config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    #[serde(default = "default_loyalty_enabled")]
    pub enabled: bool,
    #[serde(default = "default_accrual_expiry_months")]
    pub accrual_expiry_months: u32,
    #[serde(default = "default_expiry_scan_minimum_points")]
    pub expiry_scan_minimum_points: i64,
    #[serde(default = "default_tier_upgrade_bonus_points")]
    pub tier_upgrade_bonus_points: i64,
}

fn default_loyalty_enabled() -> bool {
    true
}
fn default_accrual_expiry_months() -> u32 {
    24
}
fn default_expiry_scan_minimum_points() -> i64 {
    50
}
fn default_tier_upgrade_bonus_points() -> i64 {
    0
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            enabled: default_loyalty_enabled(),
            accrual_expiry_months: default_accrual_expiry_months(),
            expiry_scan_minimum_points: default_expiry_scan_minimum_points(),
            tier_upgrade_bonus_points: default_tier_upgrade_bonus_points(),
        }
    }
}

// ─── Background worker intervals ────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_demand_refresh_interval_ms")]
    pub demand_refresh_interval_ms: u64,
    #[serde(default = "default_cache_warm_interval_ms")]
    pub cache_warm_interval_ms: u64,
    #[serde(default = "default_competitor_refresh_interval_ms")]
    pub competitor_refresh_interval_ms: u64,
    #[serde(default = "default_cache_sweep_interval_ms")]
    pub cache_sweep_interval_ms: u64,
    #[serde(default = "default_metric_rollover_interval_ms")]
    pub metric_rollover_interval_ms: u64,
    #[serde(default = "default_loyalty_expiry_scan_interval_ms")]
    pub loyalty_expiry_scan_interval_ms: u64,
    #[serde(default = "default_warm_horizon_days")]
    pub warm_horizon_days: i64,
}

fn default_demand_refresh_interval_ms() -> u64 {
    60_000
}
fn default_cache_warm_interval_ms() -> u64 {
    300_000
}
fn default_competitor_refresh_interval_ms() -> u64 {
    3_600_000
}
fn default_cache_sweep_interval_ms() -> u64 {
    30_000
}
fn default_metric_rollover_interval_ms() -> u64 {
    86_400_000
}
fn default_loyalty_expiry_scan_interval_ms() -> u64 {
    86_400_000
}
fn default_warm_horizon_days() -> i64 {
    14
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            demand_refresh_interval_ms: default_demand_refresh_interval_ms(),
            cache_warm_interval_ms: default_cache_warm_interval_ms(),
            competitor_refresh_interval_ms: default_competitor_refresh_interval_ms(),
            cache_sweep_interval_ms: default_cache_sweep_interval_ms(),
            metric_rollover_interval_ms: default_metric_rollover_interval_ms(),
            loyalty_expiry_scan_interval_ms: default_loyalty_expiry_scan_interval_ms(),
            warm_horizon_days: default_warm_horizon_days(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables (`HOTEL__SECTION__FIELD`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("HOTEL")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
