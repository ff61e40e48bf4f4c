use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Sentence-ending separators the hybrid strategy scans for, in priority
/// order. The cut lands just past the separator.
const SENTENCE_SEPS: [[char; 2]; 6] = [
    ['.', ' '],
    ['!', ' '],
    ['?', ' '],
    ['.', '\n'],
    ['!', '\n'],
    ['?', '\n'],
];

/// How text is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-width windows with a fixed step.
    Fixed,
    /// Greedy packing of whole sentences.
    Sentence,
    /// Fixed windows cut back to the nearest natural break.
    #[default]
    Hybrid,
}

impl FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(ChunkStrategy::Fixed),
            "sentence" => Ok(ChunkStrategy::Sentence),
            "hybrid" => Ok(ChunkStrategy::Hybrid),
            other => Err(format!("unknown chunk strategy '{other}'")),
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkStrategy::Fixed => write!(f, "fixed"),
            ChunkStrategy::Sentence => write!(f, "sentence"),
            ChunkStrategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Splits text into overlapping chunks. Stateless; safe to share across
/// threads. All sizes and offsets are measured in characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    strategy: ChunkStrategy,
    /// Divisor applied to `chunk_size` when deciding whether a natural break
    /// is deep enough into the window to accept (hybrid strategy only).
    break_threshold_div: usize,
}

impl TextChunker {
    /// Create a chunker. `chunk_size` must be positive and `overlap` must be
    /// strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize, strategy: ChunkStrategy) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            strategy,
            break_threshold_div: 2,
        })
    }

    /// Override the natural-break acceptance threshold divisor. The default
    /// of 2 accepts a break only past the window midpoint.
    pub fn with_break_threshold_div(mut self, div: usize) -> Result<Self> {
        if div == 0 {
            return Err(Error::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        self.break_threshold_div = div;
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Split `text` into an ordered sequence of chunks. Empty or
    /// whitespace-only input yields no chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.strategy {
            ChunkStrategy::Fixed => self.chunk_fixed(text),
            ChunkStrategy::Sentence => self.chunk_by_sentence(text),
            ChunkStrategy::Hybrid => self.chunk_hybrid(text),
        }
    }

    /// Fixed-width windows advancing by `chunk_size - overlap`. The last
    /// chunk may be shorter; with a nonzero overlap the tail of the text can
    /// surface once more as a final short window.
    fn chunk_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.fixed_windows(&chars)
    }

    fn fixed_windows(&self, chars: &[char]) -> Vec<String> {
        let n = chars.len();
        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < n {
            let end = (start + self.chunk_size).min(n);
            chunks.push(chars[start..end].iter().collect());
            start += step;
        }

        chunks
    }

    /// Greedily pack whole sentences up to `chunk_size`, joining with a
    /// single space. When a chunk closes, trailing sentences that fit within
    /// the overlap budget seed the next chunk. A single sentence longer than
    /// `chunk_size` is flushed through the fixed strategy on its own.
    fn chunk_by_sentence(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);

        let mut chunks: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();

            if sentence_len > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                    current.clear();
                    current_len = 0;
                }
                let sentence_chars: Vec<char> = sentence.chars().collect();
                chunks.extend(self.fixed_windows(&sentence_chars));
                continue;
            }

            if current_len + sentence_len > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));

                if self.overlap > 0 {
                    // Carry back as many trailing sentences as fit in the
                    // overlap budget.
                    let mut overlap_len = 0usize;
                    let mut carried: Vec<String> = Vec::new();
                    for prev in current.iter().rev() {
                        let prev_len = prev.chars().count();
                        if overlap_len + prev_len <= self.overlap {
                            carried.insert(0, prev.clone());
                            overlap_len += prev_len + 1;
                        } else {
                            break;
                        }
                    }
                    current = carried;
                    current_len = overlap_len;
                } else {
                    current.clear();
                    current_len = 0;
                }
            }

            current_len += sentence_len + 1;
            current.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Fixed windows, but each cut backtracks to the best natural break in
    /// the window: paragraph break, then newline, then sentence end, then
    /// plain space. A break counts only when it lies strictly past the
    /// acceptance threshold; otherwise the cut falls through to the next
    /// break kind and finally lands mid-word at the window edge.
    fn chunk_hybrid(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < n {
            let mut end = (start + self.chunk_size).min(n);

            if end < n {
                let threshold = start + self.chunk_size / self.break_threshold_div;

                if let Some(pos) = rfind_seq(&chars, &['\n', '\n'], start, end) {
                    if pos > threshold {
                        end = pos + 2;
                    } else {
                        end = self.fallback_break(&chars, start, end, threshold);
                    }
                } else {
                    end = self.fallback_break(&chars, start, end, threshold);
                }
            }

            chunks.push(chars[start..end].iter().collect());

            if end == n {
                break;
            }

            // Forced progress: overlap can otherwise swallow the whole
            // advance when a break lands close to the window start.
            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }

    /// Break ladder below the paragraph level: newline, sentence end, space.
    fn fallback_break(&self, chars: &[char], start: usize, end: usize, threshold: usize) -> usize {
        if let Some(pos) = rfind_char(chars, '\n', start, end) {
            if pos > threshold {
                return pos + 1;
            }
        }

        for sep in &SENTENCE_SEPS {
            if let Some(pos) = rfind_seq(chars, sep, start, end) {
                if pos > threshold {
                    return pos + sep.len();
                }
            }
        }

        if let Some(pos) = rfind_char(chars, ' ', start, end) {
            if pos > threshold {
                return pos + 1;
            }
        }

        end
    }
}

/// Split text into trimmed sentences at whitespace that immediately follows
/// `.`, `!`, or `?`. The whole whitespace run is consumed. Empty fragments
/// are dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Highest index `i` in `[start, end)` with `chars[i] == target`.
fn rfind_char(chars: &[char], target: char, start: usize, end: usize) -> Option<usize> {
    chars[start..end]
        .iter()
        .rposition(|&c| c == target)
        .map(|i| start + i)
}

/// Highest index `i` such that `pat` matches entirely within `[start, end)`.
fn rfind_seq(chars: &[char], pat: &[char], start: usize, end: usize) -> Option<usize> {
    if pat.is_empty() || end < start + pat.len() {
        return None;
    }
    let mut i = end - pat.len();
    loop {
        if chars[i..i + pat.len()] == *pat {
            return Some(i);
        }
        if i == start {
            return None;
        }
        i -= 1;
    }
}
