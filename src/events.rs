// src/events.rs

//! Progress events emitted by the resolver, acquisition and filesystem tasks
//!
//! Library code never prints. Every observable step is reported as an
//! [`Event`] pushed through an [`EventSink`]; the CLI owns the matching
//! [`EventStream`] and renders it. The stream ends once every sink clone has
//! been dropped, so a reporter can simply drain it to completion.
//!
//! ```ignore
//! let (sink, mut stream) = events::channel();
//! let reporter = tokio::spawn(async move {
//!     while let Some(event) = stream.recv().await {
//!         println!("{event}");
//!     }
//! });
//! tasks::install(&root, &context, &sink).await?;
//! drop(sink);
//! reporter.await?;
//! ```

use crate::hash::Sha256Hash;
use crate::model::RecipeIdentifier;
use crate::version::SemanticVersion;
use futures::Stream;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Something observable happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ReadFile {
        path: PathBuf,
    },
    WriteFile {
        path: PathBuf,
    },
    TouchFile {
        path: PathBuf,
    },
    DeleteFile {
        path: PathBuf,
    },
    CreateDirectory {
        path: PathBuf,
    },
    DeleteDirectory {
        path: PathBuf,
    },
    /// A transfer began; `total` is the advertised length, if any
    DownloadStarted {
        url: String,
        target: PathBuf,
        total: Option<u64>,
    },
    DownloadProgress {
        url: String,
        received: u64,
        total: Option<u64>,
    },
    DownloadFinished {
        url: String,
        target: PathBuf,
        bytes: u64,
    },
    /// The target already existed, so no transfer was made
    DownloadSkipped {
        url: String,
        target: PathBuf,
    },
    FileHashed {
        path: PathBuf,
        sha256: Sha256Hash,
    },
    HashVerified {
        path: PathBuf,
        sha256: Sha256Hash,
    },
    Unzipped {
        archive: PathBuf,
        target: PathBuf,
    },
    /// A transient failure is about to be retried
    Retrying {
        operation: String,
        attempt: u32,
        error: String,
    },
    RecipeFetched {
        identifier: RecipeIdentifier,
        versions: usize,
    },
    ResolvedDependencies {
        resolved: Vec<(RecipeIdentifier, SemanticVersion)>,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path } => write!(f, "Reading {}", path.display()),
            Self::WriteFile { path } => write!(f, "Writing {}", path.display()),
            Self::TouchFile { path } => write!(f, "Touching {}", path.display()),
            Self::DeleteFile { path } => write!(f, "Deleting {}", path.display()),
            Self::CreateDirectory { path } => write!(f, "Creating {}", path.display()),
            Self::DeleteDirectory { path } => write!(f, "Removing {}", path.display()),
            Self::DownloadStarted { url, .. } => write!(f, "Downloading {}", url),
            Self::DownloadProgress {
                url,
                received,
                total: Some(total),
            } => write!(f, "Downloading {} ({}/{} bytes)", url, received, total),
            Self::DownloadProgress { url, received, .. } => {
                write!(f, "Downloading {} ({} bytes)", url, received)
            }
            Self::DownloadFinished { url, bytes, .. } => {
                write!(f, "Downloaded {} ({} bytes)", url, bytes)
            }
            Self::DownloadSkipped { target, .. } => {
                write!(f, "Already have {}", target.display())
            }
            Self::FileHashed { path, sha256 } => {
                write!(f, "Hashed {} ({})", path.display(), sha256)
            }
            Self::HashVerified { path, .. } => write!(f, "Verified {}", path.display()),
            Self::Unzipped { archive, target } => {
                write!(f, "Unzipped {} into {}", archive.display(), target.display())
            }
            Self::Retrying {
                operation,
                attempt,
                error,
            } => write!(f, "Retrying {} (attempt {}): {}", operation, attempt, error),
            Self::RecipeFetched {
                identifier,
                versions,
            } => write!(f, "Fetched recipe for {} ({} versions)", identifier, versions),
            Self::ResolvedDependencies { resolved } => {
                write!(f, "Resolved {} dependencies", resolved.len())
            }
        }
    }
}

/// Sending half of the event channel
///
/// Cheap to clone; every concurrent branch gets its own clone. Emitting never
/// fails: if the receiver is gone the event is dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    /// A sink that discards everything
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: Event) {
        if let Some(tx) = &self.tx {
            // Ignore send errors (receiver dropped)
            let _ = tx.send(event);
        }
    }
}

/// Receiving half of the event channel, in emission order per sender
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Next event, or `None` once every sink has been dropped
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Drain whatever is buffered right now without waiting
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a connected sink/stream pair
pub fn channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx: Some(tx) }, EventStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_sinks_drop() {
        let (sink, stream) = channel();
        let clone = sink.clone();
        sink.emit(Event::TouchFile {
            path: PathBuf::from("a"),
        });
        clone.emit(Event::DeleteFile {
            path: PathBuf::from("b"),
        });
        drop(sink);
        drop(clone);

        let events: Vec<Event> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::TouchFile { .. }));
        assert!(matches!(events[1], Event::DeleteFile { .. }));
    }

    #[test]
    fn test_silent_sink_discards() {
        let sink = EventSink::silent();
        sink.emit(Event::ReadFile {
            path: PathBuf::from("x"),
        });
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, stream) = channel();
        drop(stream);
        sink.emit(Event::ReadFile {
            path: PathBuf::from("x"),
        });
    }

    #[test]
    fn test_display() {
        let event = Event::DownloadProgress {
            url: "https://example.com/a.zip".to_string(),
            received: 10,
            total: Some(100),
        };
        assert_eq!(event.to_string(), "Downloading https://example.com/a.zip (10/100 bytes)");
    }
}
