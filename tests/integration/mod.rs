//! Integration tests for the Sordello project tracking system

mod config_integration;
mod extraction_flow;
mod reconcile_flow;
mod service_flow;
mod test_utils;
