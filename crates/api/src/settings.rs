//! Server Settings
//!
//! Defaults overridable via an optional `slopewatch.toml` next to the
//! binary and `SLOPEWATCH_*` environment variables.

use crate::pipeline::Pipeline;
use crate::rate_limit::RateLimitConfig;
use alerting::AlertPolicy;
use notification::{
    Channel, ChannelProvider, DispatchConfig, Dispatcher, InMemoryRegistry, SimulatedProvider,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use storage::Repository;

/// A monitored zone with its adjacency list
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneSettings {
    /// Zone id as reported by sensors
    pub id: String,
    /// Operator-facing display name
    pub name: String,
    /// Zones notified alongside this one for high-severity alerts
    #[serde(default)]
    pub adjacent: Vec<String>,
}

/// Top-level server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listen address
    pub bind_addr: String,
    /// Whether medium alerts dispatch immediately
    pub dispatch_medium: bool,
    /// Duplicate-alert suppression window (seconds)
    pub dedup_window_secs: u64,
    /// Dedup-cache sweep period (seconds)
    pub sweep_interval_secs: u64,
    /// Rate limit: requests replenished per second
    pub rate_limit_per_second: u64,
    /// Rate limit: burst size
    pub rate_limit_burst: u32,
    /// Monitored zones
    pub zones: Vec<ZoneSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            dispatch_medium: false,
            dedup_window_secs: 300,
            sweep_interval_secs: 60,
            rate_limit_per_second: 2,
            rate_limit_burst: 10,
            zones: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from file and environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("slopewatch").required(false))
            .add_source(config::Environment::with_prefix("SLOPEWATCH"))
            .build()?
            .try_deserialize()
    }

    /// Rate limit view of these settings
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_second: self.rate_limit_per_second,
            burst_size: self.rate_limit_burst,
        }
    }

    fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            dedup_window_secs: self.dedup_window_secs,
            dispatch_medium: self.dispatch_medium,
            ..AlertPolicy::default()
        }
    }

    fn dispatch_config(&self) -> DispatchConfig {
        let mut config = DispatchConfig::default();
        for zone in &self.zones {
            if !zone.adjacent.is_empty() {
                config
                    .adjacency
                    .insert(zone.id.clone(), zone.adjacent.clone());
            }
        }
        config
    }

    fn zone_names(&self) -> HashMap<String, String> {
        self.zones
            .iter()
            .map(|z| (z.id.clone(), z.name.clone()))
            .collect()
    }

    /// Build the pipeline these settings describe.
    ///
    /// Providers are the simulated ones; real transports plug in behind
    /// the same trait at deployment.
    pub fn build_pipeline(&self) -> Pipeline {
        let registry = Arc::new(InMemoryRegistry::new());
        let providers: Vec<Arc<dyn ChannelProvider>> = vec![
            Arc::new(SimulatedProvider::new(Channel::Push)),
            Arc::new(SimulatedProvider::new(Channel::Sms)),
            Arc::new(SimulatedProvider::new(Channel::Email)),
        ];
        let dispatcher = Dispatcher::new(registry, providers, self.dispatch_config());

        Pipeline::new(
            self.alert_policy(),
            dispatcher,
            Arc::new(Repository::new()),
            self.zone_names(),
        )
    }
}
