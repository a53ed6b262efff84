//! Data models

pub mod telemetry;
pub mod sensor;
pub mod policy;
pub mod command;
pub mod audit;
pub mod system_log;
pub mod application;
pub mod gateway;
pub mod stats;
pub mod system_config;

pub use telemetry::*;
pub use sensor::*;
pub use policy::*;
pub use command::*;
pub use audit::*;
pub use system_log::*;
pub use application::*;
pub use gateway::*;
pub use stats::*;
pub use system_config::{default_system_config, SystemConfig, UpdateConfigRequest};
