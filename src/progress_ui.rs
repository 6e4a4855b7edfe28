//! Progress bar driven by a job's progress feed.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rangeget_core::ProgressFeed;

const BAR_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Spawns the progress bar when requested.
///
/// The task renders every snapshot published on `feed` and finishes once the
/// publishing side is dropped. Returns `None` when `enabled` is false.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    feed: ProgressFeed,
    label: String,
) -> Option<tokio::task::JoinHandle<()>> {
    if !enabled {
        return None;
    }
    Some(tokio::spawn(render(feed, label)))
}

async fn render(mut feed: ProgressFeed, label: String) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(label);
    bar.enable_steady_tick(Duration::from_millis(200));

    while feed.changed().await.is_ok() {
        let snapshot = *feed.borrow_and_update();
        if snapshot.total > 0 {
            bar.set_length(snapshot.total);
        }
        bar.set_position(snapshot.downloaded);
    }

    bar.finish_and_clear();
}
