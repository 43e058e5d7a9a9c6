//! Device Registry
//!
//! Devices are owned by an external registry collaborator; the
//! dispatcher only reads them. An in-memory implementation is provided
//! for tests and demo wiring.

use crate::delivery::Channel;
use alerting::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-device quiet-hours window, in local wall-clock hours.
///
/// A window may wrap midnight (e.g. 22 to 6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuietHours {
    /// Start hour (0-23), inclusive
    pub start_hour: u32,
    /// End hour (0-23), exclusive
    pub end_hour: u32,
}

impl QuietHours {
    /// Whether the given hour falls inside the window
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Notification preferences for one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicePreferences {
    /// Channels the device has opted into
    pub channels_enabled: Vec<Channel>,
    /// Lowest severity this device wants to receive
    pub minimum_severity: Severity,
    /// Optional suppression window for non-critical alerts
    pub quiet_hours: Option<QuietHours>,
}

impl Default for DevicePreferences {
    fn default() -> Self {
        Self {
            channels_enabled: vec![Channel::Push],
            minimum_severity: Severity::Medium,
            quiet_hours: None,
        }
    }
}

/// Per-channel contact endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Push token
    pub push_token: Option<String>,
    /// Phone number for SMS
    pub phone: Option<String>,
    /// Email address
    pub email: Option<String>,
}

/// A registered notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique device id
    pub id: String,
    /// Zone the device is assigned to
    pub zone_assignment: String,
    /// Whether the device currently receives notifications
    pub is_active: bool,
    /// Notification preferences
    pub preferences: DevicePreferences,
    /// Contact endpoints per channel
    pub contact: ContactInfo,
}

impl Device {
    /// Whether the device has opted into a channel
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        self.preferences.channels_enabled.contains(&channel)
    }

    /// Contact endpoint for a channel, if configured
    pub fn contact_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Push => self.contact.push_token.as_deref(),
            Channel::Sms => self.contact.phone.as_deref(),
            Channel::Email => self.contact.email.as_deref(),
        }
    }
}

/// Read-only view of the external device registry
pub trait DeviceRegistry: Send + Sync {
    /// Devices assigned to a zone (active and inactive)
    fn devices_in_zone(&self, zone_id: &str) -> Vec<Device>;

    /// All active devices across zones
    fn all_active_devices(&self) -> Vec<Device>;

    /// Look up one device by id
    fn get(&self, device_id: &str) -> Option<Device>;
}

/// In-memory registry for tests and demo wiring
#[derive(Default)]
pub struct InMemoryRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a device
    pub fn upsert(&self, device: Device) {
        if let Ok(mut devices) = self.devices.write() {
            devices.insert(device.id.clone(), device);
        }
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.devices.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceRegistry for InMemoryRegistry {
    fn devices_in_zone(&self, zone_id: &str) -> Vec<Device> {
        self.devices
            .read()
            .map(|devices| {
                devices
                    .values()
                    .filter(|d| d.zone_assignment == zone_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_active_devices(&self) -> Vec<Device> {
        self.devices
            .read()
            .map(|devices| devices.values().filter(|d| d.is_active).cloned().collect())
            .unwrap_or_default()
    }

    fn get(&self, device_id: &str) -> Option<Device> {
        self.devices
            .read()
            .ok()
            .and_then(|devices| devices.get(device_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, zone: &str, active: bool) -> Device {
        Device {
            id: id.to_string(),
            zone_assignment: zone.to_string(),
            is_active: active,
            preferences: DevicePreferences::default(),
            contact: ContactInfo {
                push_token: Some(format!("token-{}", id)),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_quiet_hours_same_day() {
        let window = QuietHours {
            start_hour: 9,
            end_hour: 17,
        };
        assert!(window.contains(9));
        assert!(window.contains(12));
        assert!(!window.contains(17));
        assert!(!window.contains(3));
    }

    #[test]
    fn test_quiet_hours_wraps_midnight() {
        let window = QuietHours {
            start_hour: 22,
            end_hour: 6,
        };
        assert!(window.contains(23));
        assert!(window.contains(0));
        assert!(window.contains(5));
        assert!(!window.contains(6));
        assert!(!window.contains(12));
    }

    #[test]
    fn test_registry_zone_lookup() {
        let registry = InMemoryRegistry::new();
        registry.upsert(device("d1", "zone-a", true));
        registry.upsert(device("d2", "zone-a", false));
        registry.upsert(device("d3", "zone-b", true));

        assert_eq!(registry.devices_in_zone("zone-a").len(), 2);
        assert_eq!(registry.all_active_devices().len(), 2);
        assert!(registry.get("d3").is_some());
        assert!(registry.get("d9").is_none());
    }

    #[test]
    fn test_contact_for_channel() {
        let d = device("d1", "zone-a", true);
        assert!(d.contact_for(Channel::Push).is_some());
        assert!(d.contact_for(Channel::Sms).is_none());
    }
}
