//! Property-based tests for scoring, summaries and the paired tests

use proptest::prelude::*;

use consistency_benchmark::analysis::{mcnemar, majority_answer, wilcoxon_signed_rank};
use consistency_benchmark::prelude::*;

// =========================================================================
// Strategies
// =========================================================================

/// A slot: absent, no answer, or one of the option letters
fn arb_slot() -> impl Strategy<Value = StyleSlot> {
    prop_oneof![
        1 => Just(StyleSlot::Absent),
        1 => Just(StyleSlot::NoAnswer),
        4 => prop::sample::select(vec!["A", "B", "C", "D"])
            .prop_map(|t| StyleSlot::Answered(t.to_string())),
    ]
}

fn arb_answer_set() -> impl Strategy<Value = AnswerSet> {
    prop::collection::vec(arb_slot(), PromptStyle::COUNT).prop_map(|slots| {
        PromptStyle::ALL
            .iter()
            .zip(slots)
            .fold(AnswerSet::new(), |set, (&style, slot)| set.with(style, slot))
    })
}

fn arb_truth() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["A", "B", "C", "D", "a", "b"])
}

/// Agreement-like scores on the grid the scorer can produce
fn arb_agreement() -> impl Strategy<Value = f64> {
    (0u32..=5).prop_map(|k| k as f64 / 5.0)
}

// =========================================================================
// Scoring
// =========================================================================

proptest! {
    #[test]
    fn prop_scores_are_bounded(set in arb_answer_set(), truth in arb_truth()) {
        let scored = ScoreAggregator::score("q", &set, truth);
        prop_assert!((0.0..=1.0).contains(&scored.agreement_score));
        prop_assert!((0.0..=1.0).contains(&scored.missing_rate));
    }

    #[test]
    fn prop_scoring_is_deterministic(set in arb_answer_set(), truth in arb_truth()) {
        let first = ScoreAggregator::score("q", &set, truth);
        let second = ScoreAggregator::score("q", &set.clone(), truth);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_majority_is_most_frequent_and_earliest(set in arb_answer_set()) {
        let tokens: Vec<&str> = set.valid_tokens().collect();
        match majority_answer(&set) {
            Answer::NoAnswer => prop_assert!(tokens.is_empty()),
            Answer::Token(winner) => {
                let count = |t: &str| tokens.iter().filter(|x| **x == t).count();
                let best = count(&winner);
                let first_pos = tokens.iter().position(|t| *t == winner);
                for t in &tokens {
                    prop_assert!(count(t) <= best);
                    if count(t) == best {
                        // Ties go to the token seen first in style order
                        prop_assert!(tokens.iter().position(|x| x == t) >= first_pos);
                    }
                }
            }
        }
    }

    #[test]
    fn prop_accuracy_iff_majority_matches_truth(set in arb_answer_set(), truth in arb_truth()) {
        let scored = ScoreAggregator::score("q", &set, truth);
        let expected = match &scored.majority_answer {
            Answer::Token(t) => t.to_uppercase() == truth.to_uppercase(),
            Answer::NoAnswer => false,
        };
        prop_assert_eq!(scored.is_accurate, expected);
    }

    #[test]
    fn prop_all_no_answer(n_present in 1usize..=5, truth in arb_truth()) {
        let set = PromptStyle::ALL
            .iter()
            .take(n_present)
            .fold(AnswerSet::new(), |set, &style| set.with(style, StyleSlot::NoAnswer));
        let scored = ScoreAggregator::score("q", &set, truth);

        prop_assert_eq!(scored.majority_answer, Answer::NoAnswer);
        prop_assert_eq!(scored.agreement_score, 0.0);
        prop_assert_eq!(scored.missing_rate, 1.0);
        prop_assert!(!scored.is_accurate);
    }

    #[test]
    fn prop_summary_matches_recomputation(
        sets in prop::collection::vec((arb_answer_set(), arb_truth()), 1..40)
    ) {
        let scored: Vec<ScoredQuestion> = sets
            .iter()
            .enumerate()
            .map(|(i, (set, truth))| ScoreAggregator::score(i as u64, set, truth))
            .collect();
        let summary = SummaryBuilder::summarize(&scored, "medqa", "m").unwrap();
        let n = scored.len() as f64;

        let mean = scored.iter().map(|q| q.agreement_score).sum::<f64>() / n;
        let accurate = scored.iter().filter(|q| q.is_accurate).count() as f64;
        let full = scored.iter().filter(|q| q.agreement_score == 1.0).count();

        prop_assert_eq!(summary.n_questions, scored.len());
        prop_assert_eq!(summary.mean_agreement, mean);
        prop_assert_eq!(summary.overall_accuracy, accurate / n * 100.0);
        prop_assert_eq!(summary.fully_consistent, full);
        prop_assert_eq!(summary.std_agreement.is_none(), scored.len() == 1);
        for style in PromptStyle::ALL {
            let correct = scored.iter().filter(|q| q.style(style).is_correct).count() as f64;
            prop_assert_eq!(summary.style_accuracy(style), correct / n * 100.0);
        }
    }
}

// =========================================================================
// Significance tests
// =========================================================================

proptest! {
    #[test]
    fn prop_mcnemar_bounds(a_only in 0usize..200, b_only in 0usize..200) {
        let outcome = mcnemar(a_only, b_only).unwrap();
        prop_assert!(outcome.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&outcome.p_value));

        // Symmetric in the two models
        let swapped = mcnemar(b_only, a_only).unwrap();
        prop_assert_eq!(outcome, swapped);
    }

    #[test]
    fn prop_wilcoxon_bounds_and_symmetry(
        pairs in prop::collection::vec((arb_agreement(), arb_agreement()), 1..80)
    ) {
        let (a, b): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();

        match wilcoxon_signed_rank(&a, &b) {
            Ok(outcome) => {
                prop_assert!(outcome.statistic >= 0.0);
                prop_assert!((0.0..=1.0).contains(&outcome.p_value));
                let swapped = wilcoxon_signed_rank(&b, &a).unwrap();
                prop_assert_eq!(outcome, swapped);
            }
            Err(AnalysisError::Degenerate(DegenerateInput::IdenticalSamples { n })) => {
                prop_assert_eq!(n, a.len());
                prop_assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-9));
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn prop_tier_is_monotone(p in 0.0f64..=1.0, q in 0.0f64..=1.0) {
        let rank = |t: SignificanceTier| match t {
            SignificanceTier::Highly => 0,
            SignificanceTier::Very => 1,
            SignificanceTier::Significant => 2,
            SignificanceTier::NotSignificant => 3,
        };
        let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
        prop_assert!(
            rank(SignificanceTier::from_p_value(lo)) <= rank(SignificanceTier::from_p_value(hi))
        );
    }
}
