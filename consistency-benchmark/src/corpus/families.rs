//! Answer families and answer-token extraction

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Answer;

/// The shape of answers a dataset expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFamily {
    /// Option letters A-D, normalized uppercase
    MultipleChoice,
    /// yes / no / maybe, normalized lowercase
    YesNoMaybe,
}

impl AnswerFamily {
    /// Family for a known dataset name. Unrecognized datasets are treated as
    /// multiple choice.
    pub fn for_dataset(dataset: &str) -> Self {
        match dataset.trim().to_lowercase().as_str() {
            "pubmedqa" => AnswerFamily::YesNoMaybe,
            _ => AnswerFamily::MultipleChoice,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerFamily::MultipleChoice => "multiple_choice",
            AnswerFamily::YesNoMaybe => "yes_no_maybe",
        }
    }

    /// Normalize the case of an already-extracted token
    pub fn normalize(&self, token: &str) -> Answer {
        match Answer::from_token(token) {
            Answer::Token(t) => Answer::Token(match self {
                AnswerFamily::MultipleChoice => t.to_uppercase(),
                AnswerFamily::YesNoMaybe => t.to_lowercase(),
            }),
            Answer::NoAnswer => Answer::NoAnswer,
        }
    }

    /// Extract an answer token from free model output
    pub fn extract(&self, raw: &str) -> Answer {
        match self {
            AnswerFamily::MultipleChoice => extract_option_letter(raw),
            AnswerFamily::YesNoMaybe => extract_yes_no_maybe(raw),
        }
    }
}

impl std::str::FromStr for AnswerFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" | "mcq" => Ok(AnswerFamily::MultipleChoice),
            "yes_no_maybe" | "yesno" => Ok(AnswerFamily::YesNoMaybe),
            _ => Err(format!("Unknown answer family: {}", s)),
        }
    }
}

fn standalone_letter() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b([ABCD])\b").ok())
        .as_ref()
}

/// First standalone A-D in the uppercased text ("The answer is B."), falling
/// back to a leading option letter ("Bravo" -> B).
pub fn extract_option_letter(raw: &str) -> Answer {
    let text = raw.trim().to_uppercase();

    if let Some(captures) = standalone_letter().and_then(|re| re.captures(&text)) {
        if let Some(letter) = captures.get(1) {
            return Answer::Token(letter.as_str().to_string());
        }
    }

    match text.chars().next() {
        Some(c) if "ABCD".contains(c) => Answer::Token(c.to_string()),
        _ => Answer::NoAnswer,
    }
}

/// Substring match in priority order yes, no, maybe
pub fn extract_yes_no_maybe(raw: &str) -> Answer {
    let text = raw.trim().to_lowercase();
    ["yes", "no", "maybe"]
        .iter()
        .find(|word| text.contains(*word))
        .map(|word| Answer::Token(word.to_string()))
        .unwrap_or(Answer::NoAnswer)
}
