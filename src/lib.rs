// Library exports for testing and reuse
pub mod cache;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use models::entitlement::EntitlementResult;
