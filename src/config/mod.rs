// src/config/mod.rs
pub mod gateway;

pub use gateway::{EngineKind, GatewayConfig};
