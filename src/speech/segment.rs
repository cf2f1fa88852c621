//! Sentence segmentation of streamed model text
//!
//! Streamed replies are voiced sentence by sentence so speech can start
//! before the model finishes generating. The segmenter turns arbitrarily
//! chunked text into complete sentences as soon as their terminating
//! punctuation arrives.

/// Characters that end a sentence
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Splits an incrementally-arriving text stream into complete sentences
///
/// Every terminator emits one sentence, in source order. Text after the
/// last terminator is retained across [`feed`](Self::feed) calls and only
/// released by [`flush`](Self::flush) at end of stream.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    pending: String,
}

impl SentenceSegmenter {
    /// Create an empty segmenter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every sentence it completes, in order
    ///
    /// Sentences are trimmed of surrounding whitespace and include their
    /// terminator.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut sentences = Vec::new();
        while let Some(pos) = self.pending.find(TERMINATORS) {
            // Terminators are ASCII, so pos + 1 stays on a char boundary
            let rest = self.pending.split_off(pos + 1);
            let sentence = std::mem::replace(&mut self.pending, rest);
            let trimmed = sentence.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
        }
        sentences
    }

    /// Release the trailing partial sentence at end of stream, if any
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let trimmed = rest.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Not-yet-emitted text
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }
}
