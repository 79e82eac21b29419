use crate::application::synchronizer::PollSettings;
use serde::Deserialize;
use std::time::Duration;

/// Bounds the backend applies to `/events/?limit=`.
const EVENTS_LIMIT_RANGE: (u32, u32) = (1, 500);

#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    pub backend: BackendSettings,
    pub poll: PollConfig,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub events_limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PollConfig {
    pub fn to_settings(&self) -> PollSettings {
        let (min, max) = EVENTS_LIMIT_RANGE;
        PollSettings {
            interval: Duration::from_millis(self.interval_ms.max(1)),
            events_limit: self.events_limit.clamp(min, max),
        }
    }
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("backend.base_url", "http://localhost:8000/api")?
        .set_default("backend.request_timeout_ms", 8000)?
        .set_default("poll.interval_ms", 1000)?
        .set_default("poll.events_limit", 50)?
        .set_default("server.bind_addr", "0.0.0.0:8080")?)
}

/// Defaults, overlaid by `config/supervisor.*` if present, overlaid by
/// `TANK_*` environment variables (`TANK_BACKEND__BASE_URL`, ...).
pub fn load_supervisor_config() -> anyhow::Result<SupervisorConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/supervisor").required(false))
        .add_source(
            config::Environment::with_prefix("TANK")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: SupervisorConfig = builder().unwrap().build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:8000/api");
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        let poll = config.poll.to_settings();
        assert_eq!(poll.interval, Duration::from_millis(1000));
        assert_eq!(poll.events_limit, 50);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config: SupervisorConfig = builder()
            .unwrap()
            .add_source(config::File::from_str(
                "[backend]\nbase_url = \"http://tank.local/api/\"\n[poll]\nevents_limit = 9000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.backend.base_url, "http://tank.local/api/");
        assert_eq!(config.backend.request_timeout_ms, 8000);
        assert_eq!(config.poll.to_settings().events_limit, 500);
    }
}
