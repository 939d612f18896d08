use super::ranking::TokenCounter;
use crate::types::ContentFragment;

pub const FRAGMENT_SEPARATOR: &str = "\n\n---\n\n";
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

/// A fragment that does not fit is only truncated in when more than this
/// many tokens of budget remain.
pub const MIN_TRUNCATION_TOKENS: usize = 100;

/// Fraction of a truncated slice that a sentence/line back-off may not cut into.
const BOUNDARY_FLOOR: f64 = 0.8;

pub struct BudgetResult {
    pub parts: Vec<String>,
    pub included: Vec<ContentFragment>,
    pub tokens_used: usize,
    pub truncated: bool,
    pub fragments_excluded_by_budget: usize,
}

/// Walk `ordered` fragments, keeping whole ones while they fit and truncating
/// the first one that does not.
pub fn apply_budget<T: TokenCounter>(
    tokenizer: &T,
    ordered: Vec<ContentFragment>,
    budget: usize,
) -> BudgetResult {
    let total = ordered.len();
    let mut parts = Vec::new();
    let mut included = Vec::new();
    let mut tokens_used = 0;
    let mut truncated = false;

    for fragment in ordered {
        if tokens_used + fragment.token_count > budget {
            let remaining = budget - tokens_used;
            if remaining > MIN_TRUNCATION_TOKENS {
                parts.push(truncate_to_tokens(tokenizer, &fragment.text, remaining));
                tokens_used += remaining;
                included.push(fragment);
                truncated = true;
            }
            break;
        }

        tokens_used += fragment.token_count;
        parts.push(fragment.text.clone());
        included.push(fragment);
    }

    BudgetResult {
        fragments_excluded_by_budget: total - included.len(),
        parts,
        included,
        tokens_used,
        truncated,
    }
}

/// Cut `content` to its first `max_tokens` tokens.
///
/// The original text up to the last kept token is preserved. If a `.` or a
/// newline occurs in the last fifth of that slice the cut moves back to it.
/// Content that already fits is returned unchanged, without a marker.
pub fn truncate_to_tokens<T: TokenCounter>(
    tokenizer: &T,
    content: &str,
    max_tokens: usize,
) -> String {
    let Some(end) = tokenizer.prefix_end(content, max_tokens) else {
        return content.to_string();
    };

    let slice = &content[..end];
    let kept = match slice.rfind(['.', '\n']) {
        Some(cut) if cut as f64 > slice.len() as f64 * BOUNDARY_FLOOR => &slice[..=cut],
        _ => slice,
    };

    format!("{}{TRUNCATION_MARKER}", kept.trim_end_matches([' ', '\t']))
}
