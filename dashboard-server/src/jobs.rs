//! Background jobs

use std::time::Duration;

use tokio::task::JoinHandle;

use sentinel_core::logic::analysis_loop;

use crate::AppState;

/// Start live polling when a time-series source is configured
pub fn spawn_live_polling(state: &AppState) -> Option<JoinHandle<()>> {
    let source = state.timeseries.clone()?;
    let pipeline = state.pipeline.clone();
    let session = state.session.clone();
    let period = Duration::from_secs(state.config.poll_interval_secs);

    tracing::info!(
        "Live polling {} every {}s",
        source.config().measurement,
        period.as_secs()
    );

    Some(tokio::spawn(async move {
        analysis_loop::run(&*pipeline, &*session, &*source, period).await;
    }))
}
