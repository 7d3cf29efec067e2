//! Scenario-focused integration tests

mod admin_overrides;
mod match_lifecycle;
