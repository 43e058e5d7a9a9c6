//! Notification Dispatch
//!
//! Selects target devices for an alert (zone, adjacency, or broadcast),
//! filters by device preference, fans out across channels with bounded
//! concurrency, and tracks each delivery through its lifecycle.

mod channel;
mod delivery;
mod device;
mod dispatcher;

pub use channel::{ChannelError, ChannelProvider, NotificationMessage, SimulatedProvider};
pub use delivery::{Channel, DeliveryState, DeliveryStatus, DeliveryTracker};
pub use device::{ContactInfo, Device, DevicePreferences, DeviceRegistry, InMemoryRegistry, QuietHours};
pub use dispatcher::{channels_for_severity, DispatchConfig, Dispatcher};

use thiserror::Error;

/// Dispatch error types
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Delivery id not known to the tracker
    #[error("Unknown delivery: {0}")]
    UnknownDelivery(String),

    /// Delivery state machine violation
    #[error("Invalid delivery transition {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// No provider registered for a channel
    #[error("No provider registered for channel: {0}")]
    NoProvider(&'static str),
}
