//! Background reader for the line-oriented update feed.
//!
//! One line is consumed per interval. A missing file is retried on the next
//! tick; at end of file the handle stays open and is polled again, so lines
//! appended later are picked up. A line is only applied once its newline has
//! been written.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use portal_proto::{classify_feed_line, FeedLine};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::shared::{FeedDisposition, SharedPortal};

/// Apply one raw feed line. Returns the extra pause requested by the line,
/// or `None` when the line carried no update or failed to parse.
pub fn process_feed_line(portal: &SharedPortal, line: &str) -> Option<Duration> {
    match classify_feed_line(line) {
        FeedLine::Blank => None,
        FeedLine::Comment => {
            portal.metrics_handle().record_comment();
            debug!(target: "portal::feed", "feed.comment_skipped");
            None
        }
        FeedLine::Update(payload) => match portal.apply_feed_line(payload) {
            Ok(outcome) => {
                if outcome.disposition == FeedDisposition::Unchanged {
                    debug!(target: "portal::feed", "feed.unchanged");
                }
                Some(outcome.delay)
            }
            Err(err) => {
                warn!(target: "portal::feed", error = %err, "feed.line_ignored");
                None
            }
        },
    }
}

pub fn spawn_feed_task(
    portal: Arc<SharedPortal>,
    path: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run_feed(portal, path, interval))
}

async fn run_feed(portal: Arc<SharedPortal>, path: PathBuf, interval: Duration) {
    let mut reader: Option<BufReader<File>> = None;
    let mut line_number: u64 = 0;
    let mut line = String::new();

    loop {
        if reader.is_none() {
            match File::open(&path).await {
                Ok(file) => {
                    info!(target: "portal::feed", path = %path.display(), "feed.opened");
                    reader = Some(BufReader::new(file));
                    line_number = 0;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(target: "portal::feed", path = %path.display(), "feed.file_missing");
                }
                Err(err) => {
                    warn!(
                        target: "portal::feed",
                        path = %path.display(),
                        error = %err,
                        "feed.open_failed"
                    );
                }
            }
        }

        let mut pause = interval;
        if let Some(active) = reader.as_mut() {
            // `line` keeps an unterminated fragment until the rest arrives.
            match active.read_line(&mut line).await {
                Ok(0) => {}
                Ok(_) if !line.ends_with('\n') => {
                    debug!(target: "portal::feed", bytes = line.len(), "feed.partial_line");
                }
                Ok(_) => {
                    line_number += 1;
                    debug!(target: "portal::feed", line_number, "feed.line_read");
                    if let Some(delay) = process_feed_line(&portal, &line) {
                        pause += delay;
                    }
                    line.clear();
                }
                Err(err) => {
                    warn!(
                        target: "portal::feed",
                        line_number,
                        error = %err,
                        "feed.read_failed"
                    );
                    line.clear();
                    reader = None;
                }
            }
        }

        tokio::time::sleep(pause).await;
    }
}
