//! The operator-facing prompt contract.
//!
//! Stage modules only talk to the operator through [`Prompt`]. Every text
//! argument is a label key; keys the label table does not know are shown
//! verbatim, so callers may also pass already-formatted text.

use crate::error::InstallerError;

/// Result of a single prompt: either the operator answered, or backed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Given(T),
    Cancelled,
}

impl<T> Answer<T> {
    pub fn given(self) -> Option<T> {
        match self {
            Answer::Given(v) => Some(v),
            Answer::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Answer::Cancelled)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Answer<U> {
        match self {
            Answer::Given(v) => Answer::Given(f(v)),
            Answer::Cancelled => Answer::Cancelled,
        }
    }
}

/// Shorthand for stage routines: prompt I/O can fail, the operator can cancel.
pub type Selection<T> = Result<Answer<T>, InstallerError>;

/// One entry of a single- or multi-choice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    /// Machine value returned when picked.
    pub tag: String,
    /// Label key (or literal text) shown to the operator.
    pub label: String,
    /// Pre-selected (single choice) or pre-checked (multi choice).
    pub on: bool,
}

impl ChoiceItem {
    pub fn new(tag: impl Into<String>, label: impl Into<String>, on: bool) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
            on,
        }
    }
}

pub trait Prompt {
    /// Shows an informational message.
    fn message(&mut self, key: &str) -> Result<(), InstallerError>;

    /// Yes/no question. Backing out counts as "no".
    fn confirm(&mut self, key: &str) -> Result<bool, InstallerError>;

    fn text(&mut self, key: &str, initial: &str) -> Selection<String>;

    fn secret(&mut self, key: &str) -> Selection<String>;

    /// Returns the tag of the picked item.
    fn single_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<String>;

    /// Returns the tags of all checked items, in list order. An empty
    /// vector means "nothing checked", which is distinct from cancelling.
    fn multi_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<Vec<String>>;

    /// Menu of `(tag, label)` entries.
    fn menu(&mut self, key: &str, items: &[(String, String)]) -> Selection<String>;

    fn gauge_start(&mut self, key: &str);

    fn gauge_update(&mut self, percent: u8, key: &str);

    fn gauge_stop(&mut self);

    /// Switches the label table used for every later prompt.
    fn set_language(&mut self, language: crate::labels::Language);
}
