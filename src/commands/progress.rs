// src/commands/progress.rs
//! Terminal rendering of library events
//!
//! A background task drains the event stream into a spinner line. Retries
//! are printed above it so they stay visible once the spinner moves on.

use buckaroo::events::{Event, EventStream};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct EventReporter {
    bar: ProgressBar,
    handle: JoinHandle<()>,
}

impl EventReporter {
    /// Start rendering `stream`; with `quiet` nothing is drawn
    pub fn spawn(mut stream: EventStream, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };

        let handle = {
            let bar = bar.clone();
            tokio::spawn(async move {
                while let Some(event) = stream.recv().await {
                    debug!("{}", event);
                    match &event {
                        Event::Retrying { .. } => bar.println(format!("  {}", event)),
                        Event::HashVerified { .. } | Event::FileHashed { .. } => {}
                        _ => bar.set_message(event.to_string()),
                    }
                }
            })
        };

        Self { bar, handle }
    }

    /// Stop rendering and clear the spinner line
    pub fn finish(self) {
        self.handle.abort();
        self.bar.finish_and_clear();
    }
}
