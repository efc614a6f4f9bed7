//! Wall-clock refresh scheduler
//!
//! Refreshes the feed at fixed local times regardless of traffic.

use super::FeedCache;
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Returns the first instant strictly after `now` that falls on one of `times`
///
/// Local times skipped by a DST jump are ignored for that day; ambiguous
/// ones resolve to their earlier instant. `None` when `times` is empty.
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, times: &[NaiveTime]) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();

    (0..=2u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .flat_map(|date| times.iter().map(move |time| date.and_time(*time)))
        .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
        .filter(|candidate| candidate > now)
        .min()
}

/// Spawns the background task that refreshes `cache` at each of `times`
pub fn spawn_scheduler(cache: Arc<FeedCache>, times: Vec<NaiveTime>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = next_occurrence(&now, &times) else {
                tracing::warn!("No feed refresh times configured, scheduler stopped");
                return;
            };

            let wait = (next.clone() - now).to_std().unwrap_or_default();
            tracing::info!("Next scheduled feed refresh at {}", next.format("%Y-%m-%d %H:%M"));
            tokio::time::sleep(wait).await;

            tracing::info!("Running scheduled feed refresh");
            cache.refresh_scheduled().await;
        }
    })
}
