use once_cell::sync::Lazy;
use regex::Regex;

pub trait TokenCounter {
    fn count_tokens(&self, content: &str) -> usize;

    /// Byte offset just past the `n`th token, or `None` when `content` has
    /// no more than `n` tokens.
    fn prefix_end(&self, content: &str, n: usize) -> Option<usize>;
}

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b|[^\w\s]").expect("static regex"));

/// tokens(content) := runs of word characters plus each lone punctuation mark
#[derive(Debug, Default, Clone, Copy)]
pub struct WordPunctTokenCounter;

impl TokenCounter for WordPunctTokenCounter {
    fn count_tokens(&self, content: &str) -> usize {
        if content.is_empty() {
            0
        } else {
            TOKEN.find_iter(content).count()
        }
    }

    fn prefix_end(&self, content: &str, n: usize) -> Option<usize> {
        let mut tokens = TOKEN.find_iter(content);
        if n == 0 {
            return tokens.next().map(|_| 0);
        }
        let last = tokens.by_ref().take(n).last()?;
        tokens.next().map(|_| last.end())
    }
}

pub trait QualityScorer {
    /// Richness of `content` in `[0.0, 1.0]`.
    fn score(&self, content: &str) -> f32;
}

static HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s").expect("static regex"));

/// Rewards code, headings, links and length; penalizes very short text.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicQualityScorer;

impl QualityScorer for HeuristicQualityScorer {
    fn score(&self, content: &str) -> f32 {
        if content.is_empty() {
            return 0.0;
        }

        let mut score: f32 = 0.5;
        if content.contains('`') {
            score += 0.2;
        }
        if HEADING_LINE.is_match(content) {
            score += 0.1;
        }
        if content.contains('[') && content.contains("](") {
            score += 0.1;
        }

        let chars = content.chars().count();
        if chars < 500 {
            score -= 0.2;
        }
        if chars > 2000 {
            score += 0.1;
        }

        let score = score.clamp(0.0, 1.0);
        debug_assert!((0.0..=1.0).contains(&score), "score {score} out of range [0.0, 1.0]");
        score
    }
}
