//! Tokenization pipeline for [`super::InvertedIndex`] (spec.md §4.5.c):
//! a tokenizer followed by an ordered chain of filters, plus named bundles
//! (`simple`, `search`, `minimal`, `custom`).

/// Splits text into a token stream.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Transforms a token stream (lowercasing, stop-word removal, length
/// filtering, trimming, deduplication, ...).
pub trait Filter: Send + Sync {
    fn apply(&self, tokens: Vec<String>) -> Vec<String>;
}

/// Splits on ASCII whitespace.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Splits on any non-alphanumeric boundary, keeping `_` as a word character.
pub struct WordBoundaryTokenizer;

impl Tokenizer for WordBoundaryTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Produces overlapping character n-grams of a fixed size (n >= 1) from each
/// input token.
pub struct NGramTokenizer {
    n: usize,
}

impl NGramTokenizer {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }
}

impl Tokenizer for NGramTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < self.n {
            return if chars.is_empty() { Vec::new() } else { vec![text.to_string()] };
        }
        chars.windows(self.n).map(|w| w.iter().collect()).collect()
    }
}

/// Lowercases every token.
pub struct LowercaseFilter;

impl Filter for LowercaseFilter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }
}

/// Drops tokens in the default English stop-word set.
pub struct StopWordFilter {
    stop_words: std::collections::HashSet<&'static str>,
}

impl Default for StopWordFilter {
    fn default() -> Self {
        const DEFAULT_STOP_WORDS: &[&str] = &[
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in",
            "is", "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
        ];
        Self { stop_words: DEFAULT_STOP_WORDS.iter().copied().collect() }
    }
}

impl Filter for StopWordFilter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| !self.stop_words.contains(t.as_str())).collect()
    }
}

/// Drops tokens shorter than `min` or longer than `max`.
pub struct LengthFilter {
    min: usize,
    max: usize,
}

impl LengthFilter {
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Filter for LengthFilter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| t.chars().count() >= self.min && t.chars().count() <= self.max).collect()
    }
}

/// Trims leading/trailing whitespace from each token, dropping empties.
pub struct TrimFilter;

impl Filter for TrimFilter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
    }
}

/// Deduplicates tokens, preserving first-occurrence order.
pub struct UniqueFilter;

impl Filter for UniqueFilter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
    }
}

/// A tokenizer plus an ordered chain of filters.
pub struct TokenizationPipeline {
    tokenizer: Box<dyn Tokenizer>,
    filters: Vec<Box<dyn Filter>>,
}

impl TokenizationPipeline {
    #[must_use]
    pub fn new(tokenizer: Box<dyn Tokenizer>, filters: Vec<Box<dyn Filter>>) -> Self {
        Self { tokenizer, filters }
    }

    /// Runs the tokenizer, then each filter in order.
    #[must_use]
    pub fn run(&self, text: &str) -> Vec<String> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.apply(tokens);
        }
        tokens
    }

    /// Word-boundary tokenizer, lowercased, trimmed, deduplicated. A
    /// reasonable default for indexing short structured fields.
    #[must_use]
    pub fn simple() -> Self {
        Self::new(
            Box::new(WordBoundaryTokenizer),
            vec![Box::new(TrimFilter), Box::new(LowercaseFilter), Box::new(UniqueFilter)],
        )
    }

    /// Word-boundary tokenizer with stop-word removal and a minimum length,
    /// tuned for free-text search fields.
    #[must_use]
    pub fn search() -> Self {
        Self::new(
            Box::new(WordBoundaryTokenizer),
            vec![
                Box::new(TrimFilter),
                Box::new(LowercaseFilter),
                Box::new(LengthFilter::new(2, 64)),
                Box::new(StopWordFilter::default()),
                Box::new(UniqueFilter),
            ],
        )
    }

    /// Whitespace tokenizer with only lowercasing -- the cheapest pipeline.
    #[must_use]
    pub fn minimal() -> Self {
        Self::new(Box::new(WhitespaceTokenizer), vec![Box::new(LowercaseFilter)])
    }

    /// Builds a pipeline from caller-supplied tokenizer and filters.
    #[must_use]
    pub fn custom(tokenizer: Box<dyn Tokenizer>, filters: Vec<Box<dyn Filter>>) -> Self {
        Self::new(tokenizer, filters)
    }
}
