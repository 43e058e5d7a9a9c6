//! Delivery Records and Tracker

use crate::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Sms,
    Email,
}

impl Channel {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

/// Delivery lifecycle state.
///
/// Transitions are forward-only: pending -> sent -> delivered -> read,
/// with pending|sent -> failed as the terminal failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Sent,
    Delivered,
    Failed,
    Read,
}

impl DeliveryState {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "pending",
            DeliveryState::Sent => "sent",
            DeliveryState::Delivered => "delivered",
            DeliveryState::Failed => "failed",
            DeliveryState::Read => "read",
        }
    }

    /// Whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: DeliveryState) -> bool {
        matches!(
            (self, next),
            (DeliveryState::Pending, DeliveryState::Sent)
                | (DeliveryState::Pending, DeliveryState::Failed)
                | (DeliveryState::Sent, DeliveryState::Delivered)
                | (DeliveryState::Sent, DeliveryState::Failed)
                | (DeliveryState::Delivered, DeliveryState::Read)
        )
    }
}

/// Lifecycle record of one notification attempt on one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Unique delivery id
    pub id: String,
    /// Alert being delivered
    pub alert_id: String,
    /// Target device
    pub device_id: String,
    /// Channel used
    pub channel: Channel,
    /// Current lifecycle state
    pub status: DeliveryState,
    /// Send attempts made (always 1 in this core; retries are an
    /// integration concern)
    pub delivery_attempts: u32,
    /// Error detail when failed
    pub error_message: Option<String>,
    /// Time the provider accepted the send
    pub sent_at: Option<DateTime<Utc>>,
    /// Time the provider confirmed delivery
    pub delivered_at: Option<DateTime<Utc>>,
    /// Time the recipient read the notification
    pub read_at: Option<DateTime<Utc>>,
}

impl DeliveryStatus {
    /// Create a pending record for one (alert, device, channel) attempt
    pub fn pending(alert_id: &str, device_id: &str, channel: Channel) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_id: alert_id.to_string(),
            device_id: device_id.to_string(),
            channel,
            status: DeliveryState::Pending,
            delivery_attempts: 0,
            error_message: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
        }
    }
}

/// In-memory tracker for delivery records
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    records: HashMap<String, DeliveryStatus>,
    by_alert: HashMap<String, Vec<String>>,
}

impl DeliveryTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivery status
    pub fn record(&mut self, status: DeliveryStatus) {
        self.by_alert
            .entry(status.alert_id.clone())
            .or_default()
            .push(status.id.clone());
        self.records.insert(status.id.clone(), status);
    }

    /// Advance a delivery to a new state, enforcing the state machine.
    pub fn update(
        &mut self,
        delivery_id: &str,
        new_state: DeliveryState,
        error: Option<String>,
    ) -> Result<DeliveryStatus, DispatchError> {
        let record = self
            .records
            .get_mut(delivery_id)
            .ok_or_else(|| DispatchError::UnknownDelivery(delivery_id.to_string()))?;

        if !record.status.can_transition_to(new_state) {
            return Err(DispatchError::InvalidTransition {
                from: record.status.as_str(),
                to: new_state.as_str(),
            });
        }

        let now = Utc::now();
        match new_state {
            DeliveryState::Sent => record.sent_at = Some(now),
            DeliveryState::Delivered => record.delivered_at = Some(now),
            DeliveryState::Read => record.read_at = Some(now),
            DeliveryState::Failed => record.error_message = error.clone(),
            DeliveryState::Pending => {}
        }
        record.status = new_state;

        debug!(delivery_id, state = new_state.as_str(), "Delivery updated");
        Ok(record.clone())
    }

    /// All delivery records for an alert
    pub fn query(&self, alert_id: &str) -> Vec<DeliveryStatus> {
        self.by_alert
            .get(alert_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get one record by id
    pub fn get(&self, delivery_id: &str) -> Option<&DeliveryStatus> {
        self.records.get(delivery_id)
    }

    /// Total records tracked
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the tracker is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
