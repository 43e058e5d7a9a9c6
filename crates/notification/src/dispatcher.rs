//! Notification Dispatcher
//!
//! Recipient selection widens with severity: zone devices, plus adjacent
//! zones for high, or a full broadcast for critical. Sends fan out
//! concurrently per (device, channel) under a semaphore so a broadcast
//! cannot open unbounded provider connections.

use crate::channel::{ChannelError, ChannelProvider, NotificationMessage};
use crate::delivery::{Channel, DeliveryState, DeliveryStatus};
use crate::device::{Device, DeviceRegistry};
use crate::DispatchError;
use alerting::{Alert, Severity};
use chrono::{Local, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Channel template per severity tier
pub fn channels_for_severity(severity: Severity) -> &'static [Channel] {
    match severity {
        Severity::Low => &[],
        Severity::Medium => &[Channel::Push],
        Severity::High => &[Channel::Push, Channel::Email],
        Severity::Critical => &[Channel::Push, Channel::Sms, Channel::Email],
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum in-flight provider sends (default: 16)
    pub max_concurrent_sends: usize,
    /// Per-send timeout in milliseconds (default: 5000)
    pub send_timeout_ms: u64,
    /// Static zone adjacency map used to widen high-severity reach
    pub adjacency: HashMap<String, Vec<String>>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: 16,
            send_timeout_ms: 5000,
            adjacency: HashMap::new(),
        }
    }
}

/// Multi-channel alert dispatcher
pub struct Dispatcher {
    registry: Arc<dyn DeviceRegistry>,
    providers: Vec<Arc<dyn ChannelProvider>>,
    config: DispatchConfig,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry and a provider set
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        providers: Vec<Arc<dyn ChannelProvider>>,
        config: DispatchConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_sends));
        Self {
            registry,
            providers,
            config,
            semaphore,
        }
    }

    fn provider_for(&self, channel: Channel) -> Option<Arc<dyn ChannelProvider>> {
        self.providers
            .iter()
            .find(|p| p.channel() == channel)
            .cloned()
    }

    /// Select candidate devices for an alert, before preference filtering.
    ///
    /// Critical broadcasts to every active device; high adds statically
    /// adjacent zones; otherwise only the alert's zone.
    pub fn select_recipients(&self, alert: &Alert) -> Vec<Device> {
        let mut devices = match alert.severity {
            Severity::Critical => self.registry.all_active_devices(),
            Severity::High => {
                let mut selected = self.registry.devices_in_zone(&alert.zone_id);
                if let Some(adjacent) = self.config.adjacency.get(&alert.zone_id) {
                    for zone in adjacent {
                        selected.extend(self.registry.devices_in_zone(zone));
                    }
                }
                selected
            }
            _ => self.registry.devices_in_zone(&alert.zone_id),
        };

        let mut seen = std::collections::HashSet::new();
        devices.retain(|d| seen.insert(d.id.clone()));
        devices
    }

    /// Per-device eligibility: active, severity at or above the device's
    /// minimum, and outside quiet hours (critical bypasses quiet hours).
    fn is_eligible(device: &Device, severity: Severity, local_hour: u32) -> bool {
        if !device.is_active {
            return false;
        }
        if severity < device.preferences.minimum_severity {
            return false;
        }
        if severity != Severity::Critical {
            if let Some(window) = device.preferences.quiet_hours {
                if window.contains(local_hour) {
                    return false;
                }
            }
        }
        true
    }

    /// Dispatch an alert to all eligible devices across their channels.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DeliveryStatus> {
        self.dispatch_inner(alert, None, Local::now().hour()).await
    }

    /// Dispatch to an explicit device set (manual re-send path), still
    /// applying per-device eligibility.
    pub async fn dispatch_to(
        &self,
        alert: &Alert,
        target_device_ids: &[String],
    ) -> Vec<DeliveryStatus> {
        self.dispatch_inner(alert, Some(target_device_ids), Local::now().hour())
            .await
    }

    async fn dispatch_inner(
        &self,
        alert: &Alert,
        targets: Option<&[String]>,
        local_hour: u32,
    ) -> Vec<DeliveryStatus> {
        let candidates = match targets {
            Some(ids) => ids.iter().filter_map(|id| self.registry.get(id)).collect(),
            None => self.select_recipients(alert),
        };

        let eligible: Vec<Device> = candidates
            .into_iter()
            .filter(|d| Self::is_eligible(d, alert.severity, local_hour))
            .collect();

        info!(
            alert_id = %alert.id,
            severity = alert.severity.as_str(),
            eligible = eligible.len(),
            "Dispatching alert"
        );

        let mut statuses = Vec::new();
        let mut join_set = JoinSet::new();
        let timeout = Duration::from_millis(self.config.send_timeout_ms);

        for device in eligible {
            for &channel in channels_for_severity(alert.severity) {
                if !device.channel_enabled(channel) {
                    continue;
                }
                let Some(provider) = self.provider_for(channel) else {
                    warn!(channel = channel.as_str(), "No provider registered");
                    let mut record = DeliveryStatus::pending(&alert.id, &device.id, channel);
                    record.status = DeliveryState::Failed;
                    record.error_message =
                        Some(DispatchError::NoProvider(channel.as_str()).to_string());
                    statuses.push(record);
                    continue;
                };

                let mut record = DeliveryStatus::pending(&alert.id, &device.id, channel);
                let message = NotificationMessage::render(alert, channel);
                let device = device.clone();
                let semaphore = self.semaphore.clone();
                let timeout_ms = self.config.send_timeout_ms;

                join_set.spawn(async move {
                    // Permit bounds outbound concurrency; closed semaphore
                    // cannot happen while the dispatcher is alive
                    let _permit = semaphore.acquire_owned().await;

                    record.delivery_attempts = 1;
                    let outcome =
                        tokio::time::timeout(timeout, provider.send(&device, &message)).await;

                    match outcome {
                        Ok(Ok(())) => {
                            record.status = DeliveryState::Sent;
                            record.sent_at = Some(Utc::now());
                        }
                        Ok(Err(e)) => {
                            record.status = DeliveryState::Failed;
                            record.error_message = Some(e.to_string());
                        }
                        Err(_) => {
                            record.status = DeliveryState::Failed;
                            record.error_message =
                                Some(ChannelError::Timeout(timeout_ms).to_string());
                        }
                    }
                    record
                });
            }
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(record) => {
                    if record.status == DeliveryState::Failed {
                        warn!(
                            delivery_id = %record.id,
                            device_id = %record.device_id,
                            channel = record.channel.as_str(),
                            error = record.error_message.as_deref().unwrap_or("unknown"),
                            "Delivery failed"
                        );
                    }
                    statuses.push(record);
                }
                Err(e) => warn!(error = %e, "Send task panicked"),
            }
        }

        statuses
    }
}
