//! Segmentation module - boundary-aware passage splitting
//!
//! Turns one document's raw text into an ordered list of passages: structural
//! paragraph breaks first, then a boundary-classification model inside each
//! block, then a merge pass that folds undersized fragments together.

mod boundary;
mod tokenize;

#[cfg(feature = "local-inference")]
mod candle;

pub use boundary::{boundary_probabilities, boundary_token_indices, BoundaryModel, InferenceOutput};
pub use tokenize::{Encoded, HfTokenizer, SegmentTokenizer};

#[cfg(feature = "local-inference")]
pub use candle::BertBoundaryModel;

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

/// Sigmoid probability at or above which a token is a boundary
pub const DEFAULT_BOUNDARY_THRESHOLD: f32 = 0.5;

/// Passages shorter than this (characters) are merged into a neighbor
pub const MIN_CHUNK_SIZE: usize = 100;

/// A merged passage never exceeds `max_length * MERGE_CAP_FACTOR` characters
const MERGE_CAP_FACTOR: usize = 4;

/// Boundary-aware text segmenter
///
/// Holds shared read-only handles to the tokenizer and boundary model;
/// `segment` is safe to call from concurrent requests.
pub struct Segmenter {
    tokenizer: Arc<dyn SegmentTokenizer>,
    model: Arc<dyn BoundaryModel>,
    /// Maximum token window per inference pass
    max_length: usize,
    threshold: f32,
    min_chunk_size: usize,
    block_break: Regex,
}

impl Segmenter {
    pub fn new(
        tokenizer: Arc<dyn SegmentTokenizer>,
        model: Arc<dyn BoundaryModel>,
        max_length: usize,
    ) -> Self {
        Self {
            tokenizer,
            model,
            max_length,
            threshold: DEFAULT_BOUNDARY_THRESHOLD,
            min_chunk_size: MIN_CHUNK_SIZE,
            block_break: Regex::new(r"\n\s*\n").expect("valid block-break regex"),
        }
    }

    /// Override the boundary probability threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the minimum passage size used by the merge pass
    pub fn with_min_chunk_size(mut self, min_chunk_size: usize) -> Self {
        self.min_chunk_size = min_chunk_size;
        self
    }

    /// Split raw text into trimmed, non-empty passages in document order
    ///
    /// Empty or whitespace-only input yields an empty list. Inference or
    /// tokenization anomalies degrade to "no internal split" for the affected
    /// window; they never abort the document.
    pub fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut passages = Vec::new();
        for block in self.block_break.split(text) {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            passages.extend(self.split_block(block));
        }

        let merged = merge_small_paragraphs(
            &passages,
            self.min_chunk_size,
            self.max_length * MERGE_CAP_FACTOR,
        );

        merged
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Run boundary inference over one structural block and cut it
    fn split_block(&self, block: &str) -> Vec<String> {
        let encoded = match self.tokenizer.encode(block) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Tokenization failed, keeping block whole: {}", e);
                return vec![block.to_string()];
            }
        };

        if encoded.is_empty() {
            return vec![block.to_string()];
        }

        // Non-overlapping token windows of at most max_length
        let mut cut_offsets = Vec::new();
        for window_start in (0..encoded.len()).step_by(self.max_length) {
            let window_end = (window_start + self.max_length).min(encoded.len());
            let ids = &encoded.ids[window_start..window_end];
            let attention_mask = vec![1i64; ids.len()];

            let output = match self.model.predict(ids, &attention_mask) {
                Ok(output) => output,
                Err(e) => {
                    warn!("Boundary inference failed, no internal split for window: {}", e);
                    continue;
                }
            };

            let probabilities = boundary_probabilities(&output);
            for token_idx in boundary_token_indices(&probabilities, self.threshold) {
                if let Some(&(_, end)) = encoded.offsets.get(window_start + token_idx) {
                    cut_offsets.push(end);
                }
            }
        }

        // Cut at strictly increasing, in-range character offsets; anything
        // else would produce an empty or reversed substring and is skipped.
        let mut passages = Vec::new();
        let mut last = 0usize;
        for offset in cut_offsets {
            if offset <= last || offset >= block.len() || !block.is_char_boundary(offset) {
                debug!("Skipping invalid boundary offset {} (last cut at {})", offset, last);
                continue;
            }
            passages.push(block[last..offset].to_string());
            last = offset;
        }
        passages.push(block[last..].to_string());

        passages
    }
}

/// Merge adjacent undersized passages without exceeding the merge cap
///
/// Accumulates passages left to right; a passage joins the accumulator while
/// either side is shorter than `min_len` and the merged length stays within
/// `max_merged_len`. No content is ever dropped.
pub fn merge_small_paragraphs(
    paragraphs: &[String],
    min_len: usize,
    max_merged_len: usize,
) -> Vec<String> {
    let mut merged = Vec::new();
    let mut acc = String::new();

    for paragraph in paragraphs {
        if acc.is_empty() {
            acc.push_str(paragraph);
            continue;
        }

        let undersized = acc.len() < min_len || paragraph.len() < min_len;
        if undersized && acc.len() + paragraph.len() + 2 <= max_merged_len {
            acc.push_str("\n\n");
            acc.push_str(paragraph);
        } else {
            merged.push(std::mem::take(&mut acc));
            acc.push_str(paragraph);
        }
    }

    if !acc.is_empty() {
        merged.push(acc);
    }

    merged
}

/// Boundary model that never reports an internal boundary
///
/// Default-build fallback when no inference model is configured: documents
/// still segment along structural breaks and go through the merge pass.
pub struct NoBoundaryModel;

impl BoundaryModel for NoBoundaryModel {
    fn predict(&self, input_ids: &[i64], _attention_mask: &[i64]) -> anyhow::Result<InferenceOutput> {
        Ok(InferenceOutput::Rank1(vec![f32::NEG_INFINITY; input_ids.len()]))
    }
}

/// Whitespace tokenizer fallback when no tokenizer.json is configured
///
/// Only used to window blocks for `NoBoundaryModel`; ids carry no vocabulary
/// meaning.
pub struct WhitespaceTokenizer;

impl SegmentTokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Encoded> {
        let mut encoded = Encoded::default();
        let mut start = None;

        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    encoded.ids.push(encoded.ids.len() as i64);
                    encoded.offsets.push((s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            encoded.ids.push(encoded.ids.len() as i64);
            encoded.offsets.push((s, text.len()));
        }

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Boundary model driven by a closure over the window's input ids
    struct FnModel<F>(F);

    impl<F> BoundaryModel for FnModel<F>
    where
        F: Fn(&[i64]) -> anyhow::Result<InferenceOutput> + Send + Sync,
    {
        fn predict(&self, input_ids: &[i64], _mask: &[i64]) -> anyhow::Result<InferenceOutput> {
            (self.0)(input_ids)
        }
    }

    fn scores_with_boundaries(len: usize, boundaries: &[usize]) -> InferenceOutput {
        let mut scores = vec![-10.0f32; len];
        for &b in boundaries {
            if b < len {
                scores[b] = 10.0;
            }
        }
        InferenceOutput::Rank1(scores)
    }

    fn segmenter_with<F>(model: F, max_length: usize) -> Segmenter
    where
        F: Fn(&[i64]) -> anyhow::Result<InferenceOutput> + Send + Sync + 'static,
    {
        Segmenter::new(Arc::new(WhitespaceTokenizer), Arc::new(FnModel(model)), max_length)
            .with_min_chunk_size(1)
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_passages() {
        let seg = segmenter_with(|ids| Ok(scores_with_boundaries(ids.len(), &[])), 512);
        assert!(seg.segment("").is_empty());
        assert!(seg.segment("   \n\t").is_empty());
    }

    #[test]
    fn test_single_sentence_stays_whole() {
        let seg = segmenter_with(|ids| Ok(scores_with_boundaries(ids.len(), &[])), 512);
        let passages = seg.segment("  a single sentence with no boundary  ");
        assert_eq!(passages, vec!["a single sentence with no boundary"]);
    }

    #[test]
    fn test_boundary_cuts_block() {
        // Boundary ends after token 1 ("beta").
        let seg = segmenter_with(|ids| Ok(scores_with_boundaries(ids.len(), &[1])), 512);
        let passages = seg.segment("alpha beta gamma delta");
        assert_eq!(passages, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_boundary_at_block_end_is_skipped() {
        // The last token's end offset equals the block length; cutting there
        // would leave an empty remainder.
        let seg = segmenter_with(|ids| Ok(scores_with_boundaries(ids.len(), &[1])), 512);
        let passages = seg.segment("one two");
        assert_eq!(passages, vec!["one two"]);
    }

    #[test]
    fn test_out_of_range_probabilities_are_ignored() {
        // Model emits more scores than the window has tokens.
        let seg = segmenter_with(
            |ids| Ok(scores_with_boundaries(ids.len() + 5, &[1, 7])),
            512,
        );
        let passages = seg.segment("alpha beta gamma");
        assert_eq!(passages, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_inference_failure_degrades_to_whole_block() {
        let seg = segmenter_with(|_| anyhow::bail!("bad output shape"), 512);
        let passages = seg.segment("first paragraph here\n\nsecond paragraph here");
        assert_eq!(passages, vec!["first paragraph here", "second paragraph here"]);
    }

    #[test]
    fn test_long_block_runs_windowed_inference() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let seg = segmenter_with(
            move |ids| {
                counted.fetch_add(1, Ordering::SeqCst);
                assert!(ids.len() <= 2);
                Ok(scores_with_boundaries(ids.len(), &[]))
            },
            2,
        );
        let passages = seg.segment("one two three four five");
        assert_eq!(passages, vec!["one two three four five"]);
        // 5 tokens at window size 2 -> 3 windows
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_content_is_dropped() {
        let text = "The first paragraph talks about storage engines.\n\n\
                    The second paragraph talks about retrieval.\n\n\
                    A third one, short.";
        // Boundary on every token: worst-case fragmentation.
        let seg = segmenter_with(
            |ids| Ok(InferenceOutput::Rank1(vec![10.0; ids.len()])),
            512,
        );
        let passages = seg.segment(text);
        assert!(!passages.is_empty());
        assert_eq!(non_whitespace(&passages.join("")), non_whitespace(text));
    }

    #[test]
    fn test_blocks_split_on_blank_lines() {
        let seg = segmenter_with(|ids| Ok(scores_with_boundaries(ids.len(), &[])), 512);
        let passages = seg.segment("block one text\n\n\nblock two text\n \nblock three text");
        assert_eq!(
            passages,
            vec!["block one text", "block two text", "block three text"]
        );
    }

    #[test]
    fn test_merge_small_paragraphs_preserves_content() {
        let paragraphs = vec![
            "tiny".to_string(),
            "also tiny".to_string(),
            "a considerably longer paragraph that stands on its own".to_string(),
        ];
        let merged = merge_small_paragraphs(&paragraphs, 20, 4096);
        let joined = merged.join("");
        for p in &paragraphs {
            assert!(joined.contains(p));
        }
        assert!(merged.len() < paragraphs.len());
    }

    #[test]
    fn test_merge_respects_cap() {
        let paragraphs = vec!["aaaa".to_string(), "bbbb".to_string(), "cccc".to_string()];
        // Cap of 10 fits one merge (4 + 2 + 4) but not two.
        let merged = merge_small_paragraphs(&paragraphs, 100, 10);
        assert_eq!(merged, vec!["aaaa\n\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_merge_leaves_large_paragraphs_alone() {
        let paragraphs = vec![
            "x".repeat(200),
            "y".repeat(200),
        ];
        let merged = merge_small_paragraphs(&paragraphs, 100, 4096);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_whitespace_tokenizer_offsets() {
        let encoded = WhitespaceTokenizer.encode("  ab cd ").unwrap();
        assert_eq!(encoded.ids.len(), 2);
        assert_eq!(encoded.offsets, vec![(2, 4), (5, 7)]);
    }
}
