//! Unit tests for the board context.

mod status_registry_tests;
mod support;
mod view_tests;
