//! Cost logs read from disk, plain or lz4-framed.

use super::{EventBuilder, EventSource, IngestError, RawEvents};
use crate::config::MalformedPolicy;
use crate::domain::Source;
use crate::fees::FeeOracle;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// Reads one or more log files in the order given and concatenates them.
#[derive(Clone)]
pub struct LogFileSource {
    paths: Vec<String>,
    fees: Arc<dyn FeeOracle>,
    crossing_opp: bool,
    policy: MalformedPolicy,
}

impl fmt::Debug for LogFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFileSource")
            .field("paths", &self.paths)
            .field("crossing_opp", &self.crossing_opp)
            .field("policy", &self.policy)
            .finish()
    }
}

impl LogFileSource {
    pub fn new(paths: Vec<String>, fees: Arc<dyn FeeOracle>) -> Self {
        Self {
            paths,
            fees,
            crossing_opp: false,
            policy: MalformedPolicy::default(),
        }
    }

    /// Count the touch crossing as opportunity loss on request changes.
    pub fn with_crossing_opp(mut self, crossing_opp: bool) -> Self {
        self.crossing_opp = crossing_opp;
        self
    }

    pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn read_text(path: &str) -> Result<String, IngestError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
            path: path.to_string(),
            source,
        })?;
        let bytes = if path.ends_with(".lz4") {
            decompress_lz4_frame(&bytes).map_err(|e| IngestError::Lz4 {
                path: path.to_string(),
                message: e.to_string(),
            })?
        } else {
            bytes
        };
        let text = match String::from_utf8_lossy(&bytes) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => {
                tracing::warn!(path = %path, "Cost log is not valid UTF-8, invalid bytes replaced");
                text
            }
        };
        Ok(text)
    }
}

pub fn decompress_lz4_frame(lz4_bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = lz4_flex::frame::FrameDecoder::new(lz4_bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[async_trait]
impl EventSource for LogFileSource {
    async fn load_events(&self) -> Result<RawEvents, IngestError> {
        let mut builder = EventBuilder::new(self.fees.as_ref(), self.crossing_opp, self.policy);

        for path in &self.paths {
            let text = Self::read_text(path).await?;
            let source = Source::new(path.as_str());
            let mut lines = 0u64;
            for (i, line) in text.lines().enumerate() {
                builder.push_line(&source, i as u64 + 1, line)?;
                lines += 1;
            }
            tracing::info!(path = %path, lines, "Read cost log");
        }

        let raw = builder.finish();
        tracing::info!(
            files = self.paths.len(),
            symbols = raw.events.len(),
            events = raw.total_events(),
            skipped = raw.skipped.len(),
            "Loaded cost log events"
        );
        Ok(raw)
    }
}
