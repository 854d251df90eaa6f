pub mod alert_service;
pub mod catalog_service;
pub mod entitlement_service;
pub mod lifecycle_service;

pub use alert_service::{AlertNotifier, AlertService, TracingNotifier};
pub use catalog_service::CatalogService;
pub use entitlement_service::EntitlementService;
pub use lifecycle_service::LifecycleService;
