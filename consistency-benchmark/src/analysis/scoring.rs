//! Per-question consistency scoring
//!
//! Agreement and missing-rate are relative to the entries an answer set
//! actually carries. A style that upstream collection dropped entirely does
//! not enter either denominator, so a question with four recorded styles that
//! all agree scores 1.0 even though the fifth style is missing. Whether drops
//! should instead count against agreement is unresolved; the present-count
//! behaviour is kept until that is decided.

use serde::{Deserialize, Serialize};

use crate::corpus::{
    Answer, AnswerFamily, AnswerSet, PromptStyle, QuestionId, RawQuestionRecord,
};

/// Characters of question text kept on a scored record
pub const QUESTION_PREVIEW_CHARS: usize = 80;

/// One style's answer and whether it matched the ground truth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOutcome {
    pub answer: Answer,
    pub is_correct: bool,
}

impl Default for StyleOutcome {
    fn default() -> Self {
        Self {
            answer: Answer::NoAnswer,
            is_correct: false,
        }
    }
}

/// Consistency metrics for a single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuestion {
    pub id: QuestionId,
    /// Leading characters of the question text, empty when unknown
    pub question: String,
    pub correct_answer: String,
    pub majority_answer: Answer,
    pub is_accurate: bool,
    /// Fraction of present entries matching the majority answer (0.0 - 1.0)
    pub agreement_score: f64,
    /// Fraction of present entries with no extracted answer (0.0 - 1.0)
    pub missing_rate: f64,
    /// Outcome per style, indexed by [`PromptStyle::index`]
    pub styles: [StyleOutcome; PromptStyle::COUNT],
}

impl ScoredQuestion {
    pub fn style(&self, style: PromptStyle) -> &StyleOutcome {
        &self.styles[style.index()]
    }

    pub fn is_fully_consistent(&self) -> bool {
        self.agreement_score == 1.0
    }
}

/// Turns answer sets into [`ScoredQuestion`]s
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Score one question's answer set against its ground truth
    pub fn score(
        id: impl Into<QuestionId>,
        answers: &AnswerSet,
        correct_answer: &str,
    ) -> ScoredQuestion {
        let majority = majority_answer(answers);
        let is_accurate = majority.matches(correct_answer);

        let styles = PromptStyle::ALL.map(|style| match answers.get(style).answer() {
            Some(answer) => {
                let is_correct = answer.matches(correct_answer);
                StyleOutcome { answer, is_correct }
            }
            None => StyleOutcome::default(),
        });

        ScoredQuestion {
            id: id.into(),
            question: String::new(),
            correct_answer: correct_answer.trim().to_string(),
            agreement_score: agreement_score(answers),
            missing_rate: missing_rate(answers),
            majority_answer: majority,
            is_accurate,
            styles,
        }
    }

    /// Score a raw upstream record, normalizing answers for the family.
    /// The ground truth takes the family's case too (`yes`, `B`).
    pub fn score_record(record: &RawQuestionRecord, family: AnswerFamily) -> ScoredQuestion {
        let answers = record.answer_set(family);
        let correct = match family.normalize(&record.correct_answer) {
            Answer::Token(t) => t,
            Answer::NoAnswer => record.correct_answer.trim().to_string(),
        };

        let mut scored = Self::score(record.id.clone(), &answers, &correct);
        scored.question = record
            .question
            .chars()
            .take(QUESTION_PREVIEW_CHARS)
            .collect();
        scored
    }

    /// Score every record of a raw results file, preserving order
    pub fn score_all(records: &[RawQuestionRecord], family: AnswerFamily) -> Vec<ScoredQuestion> {
        records
            .iter()
            .map(|record| Self::score_record(record, family))
            .collect()
    }
}

/// Most frequent extracted token.
///
/// Ties go to the token encountered first in style order. "No answer" when
/// nothing was extracted.
pub fn majority_answer(answers: &AnswerSet) -> Answer {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for token in answers.valid_tokens() {
        match counts.iter_mut().find(|(t, _)| *t == token) {
            Some((_, count)) => *count += 1,
            None => counts.push((token, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &(token, count) in &counts {
        // Strictly greater keeps the earliest token on ties
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((token, count));
        }
    }

    best.map(|(token, _)| Answer::Token(token.to_string()))
        .unwrap_or(Answer::NoAnswer)
}

/// Valid entries matching the majority over all present entries
pub fn agreement_score(answers: &AnswerSet) -> f64 {
    let majority = match majority_answer(answers) {
        Answer::Token(t) => t,
        Answer::NoAnswer => return 0.0,
    };

    let agreeing = answers.valid_tokens().filter(|t| *t == majority).count();
    agreeing as f64 / answers.present_count() as f64
}

/// "No answer" entries over all present entries; 0.0 for an empty set
pub fn missing_rate(answers: &AnswerSet) -> f64 {
    let present = answers.present_count();
    if present == 0 {
        return 0.0;
    }
    answers.no_answer_count() as f64 / present as f64
}
