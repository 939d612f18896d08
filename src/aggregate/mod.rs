pub mod budgeting;
pub mod ranking;

use std::cmp::Ordering;

use crate::types::ContentFragment;
pub use budgeting::{
    apply_budget, truncate_to_tokens, BudgetResult, FRAGMENT_SEPARATOR, MIN_TRUNCATION_TOKENS,
    TRUNCATION_MARKER,
};
pub use ranking::{HeuristicQualityScorer, QualityScorer, TokenCounter, WordPunctTokenCounter};

/// Output of [`Aggregator::combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub content: String,
    /// Score of the combined text, not an average of the parts.
    pub quality_score: f32,
    pub token_count: usize,
    /// Fragments that made it into `content`, in output order, scored.
    pub included: Vec<ContentFragment>,
    pub truncated: bool,
    pub fragments_excluded_by_budget: usize,
}

pub struct Aggregator<S = HeuristicQualityScorer, T = WordPunctTokenCounter> {
    scorer: S,
    tokenizer: T,
}

impl Default for Aggregator<HeuristicQualityScorer, WordPunctTokenCounter> {
    fn default() -> Self {
        Self {
            scorer: HeuristicQualityScorer,
            tokenizer: WordPunctTokenCounter,
        }
    }
}

impl<S, T> Aggregator<S, T>
where
    S: QualityScorer,
    T: TokenCounter,
{
    pub fn new(scorer: S, tokenizer: T) -> Self {
        Self { scorer, tokenizer }
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Score, order and concatenate `fragments` within `budget` tokens.
    ///
    /// Deterministic: the same fragments and budget always give the same bytes.
    pub fn combine(&self, fragments: Vec<ContentFragment>, budget: usize) -> Combined {
        // 1. Scoring Phase
        let mut scored: Vec<ContentFragment> = fragments
            .into_iter()
            .map(|mut fragment| {
                fragment.quality_score = self.scorer.score(&fragment.text);
                fragment
            })
            .collect();

        // 2. Ordering Phase
        // Quality desc; stable sort keeps fetch (priority) order on ties.
        scored.sort_by(|a, b| {
            b.quality_score
                .partial_cmp(&a.quality_score)
                .unwrap_or(Ordering::Equal)
        });

        debug_assert!(scored
            .windows(2)
            .all(|w| w[0].quality_score >= w[1].quality_score));

        // 3. Budgeting Phase
        let BudgetResult {
            parts,
            included,
            tokens_used: _,
            truncated,
            fragments_excluded_by_budget,
        } = apply_budget(&self.tokenizer, scored, budget);

        let content = parts.join(FRAGMENT_SEPARATOR);
        Combined {
            quality_score: self.scorer.score(&content),
            token_count: self.tokenizer.count_tokens(&content),
            content,
            included,
            truncated,
            fragments_excluded_by_budget,
        }
    }
}
