// src/events/handlers/mod.rs
//
// Event Handlers - INTERNAL MODULE
//
// Handlers use closure-based subscription via EventBus::subscribe.
// Only registration functions are exported.

pub mod statistics_handler;

pub use statistics_handler::register_statistics_handlers;
