//! Tokenizer seam for the segmenter
//!
//! Boundary inference needs token ids plus the character offsets each token
//! covers, so boundary decisions can be mapped back onto the original text.

use std::path::Path;

use tokenizers::Tokenizer;

/// A tokenized span of text
///
/// `offsets[i]` is the byte range of token `i` in the input string; `ids` and
/// `offsets` always have the same length. Special tokens are not included.
#[derive(Debug, Clone, Default)]
pub struct Encoded {
    pub ids: Vec<i64>,
    pub offsets: Vec<(usize, usize)>,
}

impl Encoded {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Trait for tokenizers used by the segmenter
pub trait SegmentTokenizer: Send + Sync {
    /// Tokenize text into ids with per-token character offsets
    fn encode(&self, text: &str) -> anyhow::Result<Encoded>;
}

/// HuggingFace tokenizer wrapper (tokenizer.json)
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    /// Load a tokenizer.json from disk
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        Ok(Self { inner })
    }
}

impl SegmentTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Encoded> {
        // No special tokens: [CLS]/[SEP] carry no offsets and would skew
        // the token-to-character mapping.
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let ids = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let offsets = encoding.get_offsets().to_vec();

        Ok(Encoded { ids, offsets })
    }
}
