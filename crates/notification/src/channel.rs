//! Channel Providers
//!
//! Concrete transports (FCM, SMS gateways, SMTP) live behind a uniform
//! async send contract; only that boundary is part of this core. A
//! simulated provider is included for tests and demo wiring.

use crate::delivery::Channel;
use crate::device::Device;
use alerting::{Alert, Severity};
use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Channel send error types
#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    /// Provider rejected or failed the send
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Device has no contact endpoint for this channel
    #[error("Device has no {0} contact configured")]
    MissingContact(&'static str),

    /// Provider call exceeded the per-send timeout
    #[error("Send timed out after {0}ms")]
    Timeout(u64),
}

/// A rendered notification ready for a provider
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// Message body
    pub body: String,
    /// Companion vibration signal, set for critical push notifications
    pub vibrate: bool,
}

impl NotificationMessage {
    /// Render the per-channel message for an alert.
    ///
    /// Placeholders come from the alert record: zone name, risk score,
    /// probability, predicted timeline, creation time, and actions.
    pub fn render(alert: &Alert, channel: Channel) -> Self {
        let body = match channel {
            // Push payloads stay short
            Channel::Push => format!(
                "[{}] {} (risk {:.1}/10)",
                alert.severity.as_str().to_uppercase(),
                alert.message,
                alert.risk_score,
            ),
            Channel::Sms => format!(
                "[{}] {} Risk {:.1}/10, probability {:.0}%. {}",
                alert.severity.as_str().to_uppercase(),
                alert.message,
                alert.risk_score,
                alert.risk_probability * 100.0,
                alert.predicted_timeline,
            ),
            Channel::Email => format!(
                "Alert severity: {}\nZone: {}\nRaised: {}\nRisk score: {:.1}/10 (probability {:.0}%)\nTimeline: {}\n\n{}\n\nRecommended actions:\n{}",
                alert.severity.as_str(),
                alert.zone_name,
                alert.created_at.to_rfc3339(),
                alert.risk_score,
                alert.risk_probability * 100.0,
                alert.predicted_timeline,
                alert.message,
                alert
                    .recommended_actions
                    .iter()
                    .map(|a| format!("- {}", a))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        };

        Self {
            body,
            vibrate: channel == Channel::Push && alert.severity == Severity::Critical,
        }
    }
}

/// Uniform provider contract for one notification channel
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// The channel this provider serves
    fn channel(&self) -> Channel;

    /// Send a rendered message to a device.
    ///
    /// One attempt per call; callers needing retries add them at the
    /// integration boundary.
    async fn send(&self, device: &Device, message: &NotificationMessage)
        -> Result<(), ChannelError>;
}

/// In-memory provider that records sends, for tests and demos
pub struct SimulatedProvider {
    channel: Channel,
    fail_sends: bool,
    sent: Mutex<Vec<(String, NotificationMessage)>>,
}

impl SimulatedProvider {
    /// Create a provider that accepts every send
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            fail_sends: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that fails every send
    pub fn failing(channel: Channel) -> Self {
        Self {
            channel,
            fail_sends: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Messages accepted so far, as (device id, message) pairs
    pub fn sent_messages(&self) -> Vec<(String, NotificationMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of accepted sends
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChannelProvider for SimulatedProvider {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        device: &Device,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        if device.contact_for(self.channel).is_none() {
            return Err(ChannelError::MissingContact(self.channel.as_str()));
        }

        if self.fail_sends {
            return Err(ChannelError::SendFailed("simulated provider failure".to_string()));
        }

        debug!(
            device_id = %device.id,
            channel = self.channel.as_str(),
            "Simulated send accepted"
        );
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((device.id.clone(), message.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertManager, AlertPolicy};

    fn critical_alert() -> Alert {
        AlertManager::new(AlertPolicy::default())
            .classify_and_maybe_create("zone-a", "North Pit", 92.0)
            .unwrap()
            .alert
    }

    #[test]
    fn test_push_render_vibrates_for_critical() {
        let alert = critical_alert();
        let message = NotificationMessage::render(&alert, Channel::Push);
        assert!(message.vibrate);
        assert!(message.body.contains("CRITICAL"));

        let email = NotificationMessage::render(&alert, Channel::Email);
        assert!(!email.vibrate);
        assert!(email.body.contains("North Pit"));
        assert!(email.body.contains("Recommended actions"));
    }

    #[tokio::test]
    async fn test_simulated_provider_records_sends() {
        let provider = SimulatedProvider::new(Channel::Push);
        let device = Device {
            id: "d1".to_string(),
            zone_assignment: "zone-a".to_string(),
            is_active: true,
            preferences: Default::default(),
            contact: crate::device::ContactInfo {
                push_token: Some("token".to_string()),
                ..Default::default()
            },
        };
        let message = NotificationMessage::render(&critical_alert(), Channel::Push);

        provider.send(&device, &message).await.unwrap();
        assert_eq!(provider.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_contact_rejected() {
        let provider = SimulatedProvider::new(Channel::Sms);
        let device = Device {
            id: "d1".to_string(),
            zone_assignment: "zone-a".to_string(),
            is_active: true,
            preferences: Default::default(),
            contact: Default::default(),
        };
        let message = NotificationMessage::render(&critical_alert(), Channel::Sms);

        assert!(matches!(
            provider.send(&device, &message).await,
            Err(ChannelError::MissingContact("sms"))
        ));
    }
}
