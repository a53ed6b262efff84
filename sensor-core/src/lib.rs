//! Sentinel Sensor - Core Service
//!
//! The endpoint side of Sentinel: a persistent sensor id, saved settings,
//! a heartbeat loop against HQ, policy checks on local content, and the
//! bridge the desktop UI talks to.

pub mod bridge;
pub mod client;
pub mod config;
pub mod constants;
pub mod dlp;
pub mod identity;
pub mod manager;

#[cfg(test)]
mod test_support;

pub use bridge::{BridgeError, BridgeHandle, BridgeRequest};
pub use client::{HqClient, HqError};
pub use dlp::{DlpAction, DlpMatch, PolicyMatcher};
pub use manager::{ConnectionStatus, SensorManager, SensorStatusReport};
