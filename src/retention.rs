//! Screenshot retention for long-running transcripts.

use agent_provider::{Message, Role};
use tracing::debug;

/// Number of screenshots kept when nothing else is configured.
pub const DEFAULT_RETAINED_IMAGES: usize = 4;

/// Keeps the `keep` most recent tool-result images and strips the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_IMAGES)
    }
}

impl RetentionPolicy {
    #[must_use]
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Strips every image older than the `keep` newest ones, in place.
    ///
    /// Only the image field changes; message count, order and every other
    /// field are left alone. Returns the number of images removed.
    pub fn apply(&self, messages: &mut [Message]) -> usize {
        let mut seen = 0usize;
        let mut evicted = 0usize;

        for message in messages.iter_mut().rev() {
            if message.role != Role::Tool {
                continue;
            }

            for part in message.content.iter_mut().rev() {
                let Some(output) = part.tool_output_mut() else {
                    continue;
                };
                if !output.has_image() {
                    continue;
                }

                if seen < self.keep {
                    seen += 1;
                } else if output.take_image().is_some() {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            debug!(evicted, kept = seen, "evicted stale screenshots");
        }
        evicted
    }
}
