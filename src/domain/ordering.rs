//! Timestamp ordering guard for deterministic replay.

use crate::domain::TimeUs;

/// Tracks the latest timestamp seen in a stream and rejects regressions.
///
/// Equal timestamps are allowed; the stream keeps its log order for ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingGuard {
    last: Option<TimeUs>,
}

impl OrderingGuard {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Record `time`, or return the earlier-seen later timestamp it violates.
    pub fn observe(&mut self, time: TimeUs) -> Result<(), TimeUs> {
        match self.last {
            Some(previous) if time < previous => Err(previous),
            _ => {
                self.last = Some(time);
                Ok(())
            }
        }
    }
}
