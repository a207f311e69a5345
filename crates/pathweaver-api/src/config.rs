//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use pathweaver_generator::OpenAiConfig;
use pathweaver_story::domain::settings::{GenerationSettings, IncompleteAssetsPolicy};

use crate::error::AppError;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL.
    pub database_url: String,
    /// Listen address.
    pub addr: SocketAddr,
    /// Chat-completions connection.
    pub generator: OpenAiConfig,
    /// Renderer endpoint for images.
    pub image_endpoint: String,
    /// Renderer endpoint for audio.
    pub audio_endpoint: String,
    /// Directory the renderer writes assets to.
    pub asset_root: PathBuf,
    /// Engine limits and timeouts.
    pub settings: GenerationSettings,
    /// OTLP collector endpoint, if spans should be exported.
    pub otlp_endpoint: Option<String>,
    /// Browser origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<HeaderValue>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let env = Env(&lookup);
        let defaults = GenerationSettings::default();

        let host = env.or("HOST", "0.0.0.0");
        let port: u16 = env.parse("PORT", 3000)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let image_endpoint = env.required("IMAGE_ENDPOINT")?;
        let audio_endpoint = env.or("AUDIO_ENDPOINT", &image_endpoint);

        let settings = GenerationSettings {
            max_depth: env.parse("STORY_MAX_DEPTH", defaults.max_depth)?,
            max_concurrent: env.parse("STORY_MAX_CONCURRENT", defaults.max_concurrent)?,
            generation_timeout: Duration::from_secs(env.parse(
                "STORY_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            dispatch_timeout: Duration::from_millis(env.parse(
                "STORY_DISPATCH_TIMEOUT_MS",
                u64::try_from(defaults.dispatch_timeout.as_millis()).unwrap_or(1000),
            )?),
            poll_interval: Duration::from_secs(
                env.parse("STORY_POLL_INTERVAL_SECS", defaults.poll_interval.as_secs())?,
            ),
            max_poll_iterations: env
                .parse("STORY_MAX_POLL_ITERATIONS", defaults.max_poll_iterations)?,
            incomplete_assets: env.policy("STORY_INCOMPLETE_ASSETS")?,
        };
        if settings.max_concurrent == 0 {
            return Err(AppError::Config(
                "STORY_MAX_CONCURRENT must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            addr,
            generator: OpenAiConfig {
                base_url: env.or("GENERATOR_BASE_URL", "https://api.openai.com/v1"),
                api_key: env.required("GENERATOR_API_KEY")?,
                model: env.or("GENERATOR_MODEL", "gpt-4o-mini"),
            },
            image_endpoint,
            audio_endpoint,
            asset_root: PathBuf::from(env.required("ASSET_ROOT")?),
            settings,
            otlp_endpoint: env.get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            cors_origins: env.origins("CORS_ALLOWED_ORIGINS")?,
        })
    }
}

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    fn required(&self, key: &str) -> Result<String, AppError> {
        self.get(key)
            .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
            None => Ok(default),
        }
    }

    fn origins(&self, key: &str) -> Result<Vec<HeaderValue>, AppError> {
        self.get(key)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| AppError::Config(format!("{key} is invalid: {e}")))
            })
            .collect()
    }

    fn policy(&self, key: &str) -> Result<IncompleteAssetsPolicy, AppError> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
            None => Ok(IncompleteAssetsPolicy::default()),
        }
    }
}
