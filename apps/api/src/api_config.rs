use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rolegate_application::SubscriptionRetryPolicy;
use rolegate_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub role_store_timeout: Duration,
    pub subscription_retry: SubscriptionRetryPolicy,
    pub dev_seed: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or("API_PORT", optional("API_PORT"), 3002_u16)?;
        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let database_url = optional("DATABASE_URL");

        let timeout_ms = parse_or(
            "ROLE_STORE_TIMEOUT_MS",
            optional("ROLE_STORE_TIMEOUT_MS"),
            5000_u64,
        )?;
        if timeout_ms == 0 {
            return Err(AppError::Validation(
                "ROLE_STORE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let defaults = SubscriptionRetryPolicy::default();
        let max_attempts = parse_or(
            "ROLE_SUBSCRIPTION_RETRY_ATTEMPTS",
            optional("ROLE_SUBSCRIPTION_RETRY_ATTEMPTS"),
            defaults.max_attempts,
        )?;
        let retry_delay_ms = parse_or(
            "ROLE_SUBSCRIPTION_RETRY_DELAY_MS",
            optional("ROLE_SUBSCRIPTION_RETRY_DELAY_MS"),
            u64::try_from(defaults.retry_delay.as_millis()).unwrap_or(1000),
        )?;

        let dev_seed = match optional("DEV_SEED") {
            None => database_url.is_none(),
            Some(value) if value.eq_ignore_ascii_case("true") => true,
            Some(value) if value.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "DEV_SEED must be either 'true' or 'false', got '{other}'"
                )));
            }
        };

        Ok(Self {
            api_host,
            api_port,
            frontend_url,
            database_url,
            role_store_timeout: Duration::from_millis(timeout_ms),
            subscription_retry: SubscriptionRetryPolicy {
                max_attempts,
                retry_delay: Duration::from_millis(retry_delay_ms),
            },
            dev_seed,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
    }
}
