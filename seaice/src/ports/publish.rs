//! Metadata publishers.

use parking_lot::RwLock;
use tracing::{debug, info, Level};

use crate::core::Provenance;

/// Forwards human-readable provenance (thumbnail links, label counts) to an
/// observability surface.
///
/// Publishing is informational: it must not block and must never fail the
/// stage. Implementations log and swallow their own transport errors.
pub trait MetadataPublisher: Send + Sync {
    /// Publishes the notes produced by `stage`.
    fn publish(&self, stage: &str, notes: &Provenance);
}

/// A publisher that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPublisher;

impl MetadataPublisher for NoOpPublisher {
    fn publish(&self, _stage: &str, _notes: &Provenance) {}
}

/// A publisher that writes notes to the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingPublisher {
    level: Level,
}

impl Default for LoggingPublisher {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingPublisher {
    /// Creates a logging publisher with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging publisher.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl MetadataPublisher for LoggingPublisher {
    fn publish(&self, stage: &str, notes: &Provenance) {
        for (key, value) in notes.iter() {
            if self.level == Level::DEBUG {
                debug!(stage = %stage, key = %key, value = %value, "Stage metadata");
            } else {
                info!(stage = %stage, key = %key, value = %value, "Stage metadata");
            }
        }
    }
}

/// A publisher that keeps everything, for tests.
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    published: RwLock<Vec<(String, Provenance)>>,
}

impl CollectingPublisher {
    /// Creates an empty collecting publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All publications so far, in order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Provenance)> {
        self.published.read().clone()
    }

    /// The notes most recently published by `stage`.
    #[must_use]
    pub fn latest(&self, stage: &str) -> Option<Provenance> {
        self.published
            .read()
            .iter()
            .rev()
            .find(|(name, _)| name == stage)
            .map(|(_, notes)| notes.clone())
    }
}

impl MetadataPublisher for CollectingPublisher {
    fn publish(&self, stage: &str, notes: &Provenance) {
        self.published.write().push((stage.to_string(), notes.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Provenance {
        let mut notes = Provenance::new();
        notes.insert("thumbnail", "![seaice](http://localhost/a.png)");
        notes
    }

    #[test]
    fn test_collecting_publisher_keeps_order() {
        let publisher = CollectingPublisher::new();
        publisher.publish("thumbnail", &notes());
        publisher.publish("analyze", &Provenance::new());

        let published = publisher.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "thumbnail");
        assert_eq!(
            publisher.latest("thumbnail").and_then(|n| n.get("thumbnail").map(String::from)),
            Some("![seaice](http://localhost/a.png)".to_string())
        );
        assert!(publisher.latest("report").is_none());
    }

    #[test]
    fn test_logging_and_noop_publishers_do_not_panic() {
        LoggingPublisher::default().publish("fetch", &notes());
        LoggingPublisher::debug().publish("fetch", &notes());
        NoOpPublisher.publish("fetch", &notes());
    }
}
