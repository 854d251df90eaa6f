pub mod common;
pub mod entitlement;
