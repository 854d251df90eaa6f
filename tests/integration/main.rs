// Integration tests against an in-memory SQLite store with migrations
// applied, so the suite runs without external services.

mod support;

mod alert_test;
mod lifecycle_test;
