//! Context assembly: greedy packing of FAQ matches under a character budget.

use crabdesk_core::knowledge::FaqMatch;

/// The assembled retrieval context for one question.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Concatenated `Q:/A:` blocks, possibly empty
    pub context: String,

    /// True when there were no matches or the best score fell below the
    /// configured threshold
    pub insufficient_evidence: bool,

    /// Score of the best match, 0.0 when there were none
    pub best_score: f32,
}

impl AssembledContext {
    /// The empty-knowledge-base outcome.
    pub fn empty() -> Self {
        Self {
            context: String::new(),
            insufficient_evidence: true,
            best_score: 0.0,
        }
    }
}

/// Pack matches into a context string under `max_chars`.
///
/// Matches are consumed in the given (descending score) order. Packing
/// stops at the first block that would overflow the budget; it never skips
/// a large block to admit a later small one, which would reorder evidence
/// by size instead of relevance. The budget accounts for the joining
/// newlines, so the result never exceeds `max_chars`.
pub fn assemble(matches: &[FaqMatch], score_threshold: f32, max_chars: usize) -> AssembledContext {
    let Some(best) = matches.first() else {
        return AssembledContext::empty();
    };

    let best_score = best.score;
    let insufficient_evidence = best_score < score_threshold;

    let mut context = String::new();
    for m in matches {
        let block = format!("Q: {}\nA: {}\n", m.question, m.answer);
        let projected = if context.is_empty() {
            block.len()
        } else {
            context.len() + 1 + block.len()
        };
        if projected > max_chars {
            break;
        }
        if !context.is_empty() {
            context.push('\n');
        }
        context.push_str(&block);
    }

    AssembledContext {
        context,
        insufficient_evidence,
        best_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(score: f32, question: &str, answer: &str) -> FaqMatch {
        FaqMatch {
            score,
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[test]
    fn no_matches_is_insufficient() {
        let ctx = assemble(&[], 0.75, 1200);
        assert!(ctx.context.is_empty());
        assert!(ctx.insufficient_evidence);
        assert_eq!(ctx.best_score, 0.0);
    }

    #[test]
    fn best_score_below_threshold_flags_insufficient_but_still_packs() {
        let ctx = assemble(&[m(0.5, "Q1", "A1")], 0.75, 1200);
        assert!(ctx.insufficient_evidence);
        assert!((ctx.best_score - 0.5).abs() < 1e-6);
        assert!(ctx.context.contains("Q: Q1"));
    }

    #[test]
    fn blocks_are_joined_with_blank_line() {
        let ctx = assemble(&[m(0.9, "Q1", "A1"), m(0.8, "Q2", "A2")], 0.75, 1200);
        assert_eq!(ctx.context, "Q: Q1\nA: A1\n\nQ: Q2\nA: A2\n");
        assert!(!ctx.insufficient_evidence);
    }

    #[test]
    fn packing_stops_at_first_overflow() {
        // First block fits, second would overflow, third would fit but must
        // not be admitted after the break.
        let matches = vec![
            m(0.9, "Q1", "A1"),
            m(0.8, "Q2", &"x".repeat(100)),
            m(0.7, "Q3", "A3"),
        ];
        let ctx = assemble(&matches, 0.75, 30);
        assert!(ctx.context.contains("Q1"));
        assert!(!ctx.context.contains("Q2"));
        assert!(!ctx.context.contains("Q3"));
    }

    #[test]
    fn oversized_top_match_yields_empty_context() {
        let ctx = assemble(&[m(0.95, "Q1", &"x".repeat(2000))], 0.75, 1200);
        assert!(ctx.context.is_empty());
        assert!(!ctx.insufficient_evidence);
        assert!((ctx.best_score - 0.95).abs() < 1e-6);
    }

    #[test]
    fn context_never_exceeds_budget() {
        let matches: Vec<FaqMatch> = (0..20)
            .map(|i| m(0.9 - i as f32 * 0.01, "What about shipping?", "3-5 days."))
            .collect();
        for budget in [10, 50, 100, 200, 1200] {
            let ctx = assemble(&matches, 0.75, budget);
            assert!(ctx.context.len() <= budget, "budget {budget} exceeded");
        }
    }
}
