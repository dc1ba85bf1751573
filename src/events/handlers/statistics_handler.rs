// src/events/handlers/statistics_handler.rs
//
// Statistics Event Handler
//
// Refreshes the derived statistics snapshot whenever the archive changes in bulk.
//
// CRITICAL RULES:
// - Delegates all logic to StatisticsService
// - Handles errors without crashing the event bus
// - Uses closure-based subscription (EventHandler is internal to bus)

use std::sync::Arc;

use crate::events::{EventBus, PostsDeleted, ScanCompleted, TaskFinished};
use crate::services::StatisticsService;

/// Registers all statistics handlers with the event bus.
pub fn register_statistics_handlers(bus: &EventBus, service: Arc<StatisticsService>) {
    let scan_service = Arc::clone(&service);
    bus.subscribe::<ScanCompleted, _>(move |event| {
        if event.new_urls > 0 {
            refresh(&scan_service, "ScanCompleted");
        }
    });

    let task_service = Arc::clone(&service);
    bus.subscribe::<TaskFinished, _>(move |_| {
        refresh(&task_service, "TaskFinished");
    });

    let delete_service = Arc::clone(&service);
    bus.subscribe::<PostsDeleted, _>(move |event| {
        if !event.post_ids.is_empty() {
            refresh(&delete_service, "PostsDeleted");
        }
    });

    log::debug!("Statistics handlers registered");
}

fn refresh(service: &StatisticsService, trigger: &str) {
    match service.refresh_snapshot() {
        Ok(stats) => log::debug!(
            "Statistics refreshed after {}: {} posts",
            trigger,
            stats.total
        ),
        Err(e) => log::warn!("Statistics refresh after {} failed: {}", trigger, e),
    }
}
