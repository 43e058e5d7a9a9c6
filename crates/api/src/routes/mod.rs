//! Route Handlers

pub mod alerts;
pub mod deliveries;
pub mod readings;
