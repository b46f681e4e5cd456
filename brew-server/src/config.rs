//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// brew-server configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP listen port
    pub http_port: u16,
    /// SQLite URL for the ledger and catalog
    pub database_url: String,
    /// Externally visible base URL, used to build provider redirect URLs
    pub public_base_url: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe API base URL
    pub stripe_api_base: String,
    /// ISO currency code sent with every session
    pub currency: String,
    /// HTTP timeout for session creation
    pub provider_timeout: Duration,
    /// Max skew between a webhook signature timestamp and now (seconds)
    pub webhook_tolerance_secs: i64,
    /// Processing budget for a single webhook call
    pub webhook_budget: Duration,
    /// Idle time after which a cart is dropped
    pub cart_idle_ttl: Duration,
    /// Age after which a session-less Pending order is reported as orphaned
    pub orphan_timeout: Duration,
    /// Cadence of the cart / orphan sweep
    pub sweep_interval: Duration,
    /// JWT secret shared with the identity provider
    pub jwt_secret: String,
    /// SES sender address; receipts are only logged when unset
    pub receipt_from_email: Option<String>,
    /// Log level (trace | debug | info | warn | error)
    pub log_level: String,
    /// Directory for rolling log files
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http_port: env_or("HTTP_PORT", 8080),
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:brew.db".into()),
            public_base_url,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            currency: std::env::var("CURRENCY")
                .unwrap_or_else(|_| "myr".into())
                .to_ascii_lowercase(),
            provider_timeout: Duration::from_millis(env_or("PROVIDER_TIMEOUT_MS", 10_000)),
            webhook_tolerance_secs: env_or("WEBHOOK_TOLERANCE_SECS", 300),
            webhook_budget: Duration::from_millis(env_or("WEBHOOK_BUDGET_MS", 5_000)),
            cart_idle_ttl: Duration::from_secs(env_or("CART_IDLE_TTL_SECS", 7_200)),
            orphan_timeout: Duration::from_secs(env_or("ORPHAN_TIMEOUT_SECS", 3_600)),
            sweep_interval: Duration::from_secs(env_or("SWEEP_INTERVAL_SECS", 300)),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            receipt_from_email: env_opt("RECEIPT_FROM_EMAIL"),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Success redirect handed to the provider; it substitutes the session id
    pub fn success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.public_base_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.public_base_url)
    }

    /// Storefront cart view the cancel redirect lands on
    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.public_base_url)
    }
}
