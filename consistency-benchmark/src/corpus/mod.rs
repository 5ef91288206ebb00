//! Question corpus data model: phrasing styles, answers and answer sets

pub mod families;
pub mod loader;

pub use families::AnswerFamily;
pub use loader::{
    load_prompt_bundles_file, load_prompt_bundles_str, load_raw_results_file,
    load_raw_results_str, LoadError, PromptBundle, RawQuestionRecord, RawResponse,
};

use serde::{Deserialize, Serialize};

/// Marker written wherever an answer could not be extracted
pub const NO_ANSWER_MARKER: &str = "UNKNOWN";

/// The closed, ordered set of ways a question is phrased to a model.
///
/// Declaration order is significant: majority tie-breaks and output column
/// order both follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    Original,
    Formal,
    Simplified,
    Roleplay,
    Direct,
}

impl PromptStyle {
    pub const COUNT: usize = 5;

    pub const ALL: [PromptStyle; PromptStyle::COUNT] = [
        PromptStyle::Original,
        PromptStyle::Formal,
        PromptStyle::Simplified,
        PromptStyle::Roleplay,
        PromptStyle::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Original => "original",
            PromptStyle::Formal => "formal",
            PromptStyle::Simplified => "simplified",
            PromptStyle::Roleplay => "roleplay",
            PromptStyle::Direct => "direct",
        }
    }

    /// Position in the enumeration
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::str::FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(PromptStyle::Original),
            "formal" => Ok(PromptStyle::Formal),
            "simplified" => Ok(PromptStyle::Simplified),
            "roleplay" => Ok(PromptStyle::Roleplay),
            "direct" => Ok(PromptStyle::Direct),
            _ => Err(format!("Unknown prompt style: {}", s)),
        }
    }
}

impl std::fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable question identifier.
///
/// Upstream corpora use either integer row indices or strings; both are kept
/// as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<QuestionId> for String {
    fn from(id: QuestionId) -> Self {
        id.0
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for QuestionId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<IdRepr> for QuestionId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Int(n) => Self(n.to_string()),
            IdRepr::Float(f) => Self(f.to_string()),
            IdRepr::Str(s) => Self(s),
        }
    }
}

/// An extracted answer, or the explicit "no answer" marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Answer {
    Token(String),
    NoAnswer,
}

impl Answer {
    /// Build from an upstream token. Blank tokens and the marker, in any
    /// case, both mean nothing was extracted.
    pub fn from_token(token: &str) -> Self {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_ANSWER_MARKER) {
            Answer::NoAnswer
        } else {
            Answer::Token(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Answer::Token(t) => t,
            Answer::NoAnswer => NO_ANSWER_MARKER,
        }
    }

    /// Case-insensitive comparison against a ground-truth token.
    /// "No answer" never matches.
    pub fn matches(&self, truth: &str) -> bool {
        match self {
            Answer::Token(t) => t.trim().to_uppercase() == truth.trim().to_uppercase(),
            Answer::NoAnswer => false,
        }
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Answer::from_token(&s)
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Token(t) => t,
            Answer::NoAnswer => NO_ANSWER_MARKER.to_string(),
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an answer set holds for one style
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StyleSlot {
    /// The style was never recorded for this question
    #[default]
    Absent,
    /// A response was recorded but no answer could be extracted
    NoAnswer,
    /// A response was recorded and an answer token extracted
    Answered(String),
}

impl StyleSlot {
    pub fn is_present(&self) -> bool {
        !matches!(self, StyleSlot::Absent)
    }

    /// The recorded answer, or `None` when the style is absent
    pub fn answer(&self) -> Option<Answer> {
        match self {
            StyleSlot::Absent => None,
            StyleSlot::NoAnswer => Some(Answer::NoAnswer),
            StyleSlot::Answered(t) => Some(Answer::Token(t.clone())),
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            StyleSlot::Answered(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Answer> for StyleSlot {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Token(t) => StyleSlot::Answered(t),
            Answer::NoAnswer => StyleSlot::NoAnswer,
        }
    }
}

/// Per-style answers for one question.
///
/// A fixed slot per [`PromptStyle`]; absent styles are kept distinct from
/// styles whose response yielded no answer, since only present entries count
/// toward agreement and missing-rate denominators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSet {
    slots: [StyleSlot; PromptStyle::COUNT],
}

impl AnswerSet {
    /// An answer set with every style absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one style's slot
    pub fn with(mut self, style: PromptStyle, slot: StyleSlot) -> Self {
        self.set(style, slot);
        self
    }

    /// Record an extracted answer for a style
    pub fn with_answer(self, style: PromptStyle, answer: Answer) -> Self {
        self.with(style, answer.into())
    }

    pub fn set(&mut self, style: PromptStyle, slot: StyleSlot) {
        self.slots[style.index()] = slot;
    }

    pub fn get(&self, style: PromptStyle) -> &StyleSlot {
        &self.slots[style.index()]
    }

    /// Present entries in style order
    pub fn present(&self) -> impl Iterator<Item = (PromptStyle, &StyleSlot)> + '_ {
        PromptStyle::ALL
            .iter()
            .map(move |&style| (style, self.get(style)))
            .filter(|(_, slot)| slot.is_present())
    }

    /// Extracted tokens of present, answered entries in style order
    pub fn valid_tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().filter_map(StyleSlot::token)
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_present()).count()
    }

    pub fn no_answer_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, StyleSlot::NoAnswer))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

impl FromIterator<(PromptStyle, Answer)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (PromptStyle, Answer)>>(iter: I) -> Self {
        let mut set = AnswerSet::new();
        for (style, answer) in iter {
            set.set(style, answer.into());
        }
        set
    }
}
