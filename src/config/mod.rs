use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::discovery::PipelineConfig;
use crate::models::SortStrategy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(#[from] env::VarError),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub baas_url: String,
    pub baas_anon_key: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub request_timeout_secs: u64,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let pipeline = parse_pipeline(
            env::var("RADIUS_OPTIONS").ok().as_deref(),
            env::var("DEFAULT_RADIUS").ok().as_deref(),
            env::var("SORT_STRATEGIES").ok().as_deref(),
            env::var("DEFAULT_SORT").ok().as_deref(),
        )?;

        Ok(Config {
            baas_url: env::var("BAAS_URL")?,
            baas_anon_key: env::var("BAAS_ANON_KEY")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(10),
            pipeline,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 解析管道配置；未设置的项使用默认值
pub fn parse_pipeline(
    radius_options: Option<&str>,
    default_radius: Option<&str>,
    sort_strategies: Option<&str>,
    default_sort: Option<&str>,
) -> Result<PipelineConfig, ConfigError> {
    let defaults = PipelineConfig::default();

    let radius_options = match radius_options {
        Some(raw) => raw
            .split(',')
            .map(|r| {
                r.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite() && *r >= 0.0)
                    .ok_or_else(|| invalid("RADIUS_OPTIONS", raw))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.radius_options,
    };
    if radius_options.is_empty() {
        return Err(invalid("RADIUS_OPTIONS", ""));
    }

    let default_radius = match default_radius {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("DEFAULT_RADIUS", raw))?,
        None => defaults.default_radius,
    };
    if !radius_options.contains(&default_radius) {
        return Err(invalid("DEFAULT_RADIUS", &default_radius.to_string()));
    }

    let sort_strategies = match sort_strategies {
        Some(raw) => raw
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<SortStrategy>()
                    .map_err(|_| invalid("SORT_STRATEGIES", raw))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.sort_strategies,
    };

    let default_sort = match default_sort {
        Some(raw) => raw
            .trim()
            .parse::<SortStrategy>()
            .map_err(|_| invalid("DEFAULT_SORT", raw))?,
        None => sort_strategies
            .first()
            .copied()
            .ok_or_else(|| invalid("SORT_STRATEGIES", ""))?,
    };
    if !sort_strategies.contains(&default_sort) {
        return Err(invalid("DEFAULT_SORT", default_sort.as_str()));
    }

    Ok(PipelineConfig {
        radius_options,
        default_radius,
        sort_strategies,
        default_sort,
    })
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}
