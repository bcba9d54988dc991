//! Terminal calendar whose events live in a hosted backend-as-a-service.

pub mod app;
pub mod auth;
pub mod calendar;
pub mod components;
pub mod config;
pub mod logging;
pub mod remote;
pub mod theme;
pub mod tui;
