//! The press loop.

use std::sync::Arc;

use presslog_core::EdgeDebouncer;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::sink::LiveSink;
use crate::state::AppState;

/// Poll the debouncer and drain the event queue every `pollIntervalMs`.
///
/// Runs until the task is dropped.
pub async fn run_press_loop(state: AppState, debouncer: Arc<EdgeDebouncer>) {
    let mut interval = tokio::time::interval(state.config.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sink = state.sink();

    info!(
        "Press loop started (GPIO{}, {} ms debounce)",
        state.config.button_pin,
        debouncer.window_ms()
    );
    loop {
        interval.tick().await;
        poll_once(&state, &debouncer, &mut sink).await;
    }
}

/// One loop iteration. Returns the number of events persisted.
pub async fn poll_once(state: &AppState, debouncer: &EdgeDebouncer, sink: &mut LiveSink) -> usize {
    let mut logger = state.logger.lock().await;
    logger.poll(debouncer, sink)
}
