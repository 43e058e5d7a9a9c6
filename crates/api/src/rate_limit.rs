//! Rate Limiting Middleware
//!
//! Per-IP GCRA rate limiting via tower_governor. No background reaper
//! is needed; quota headers are added to every response.

use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config with quota headers enabled
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests replenished per second
    pub per_second: u64,
    /// Burst size allowed before throttling
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 2,
            burst_size: 10,
        }
    }
}

/// Build a governor config for the GovernorLayer.
///
/// Uses PeerIpKeyExtractor; the service must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` so peer IPs
/// are available. X-RateLimit-* headers are added for quota visibility.
pub fn create_governor_config(config: &RateLimitConfig) -> Arc<DefaultGovernorConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.per_second)
            .burst_size(config.burst_size)
            .use_headers()
            .finish()
            .unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.per_second, 2);
        assert_eq!(config.burst_size, 10);
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::default());
        assert!(Arc::strong_count(&governor) > 0);
    }
}
