//! Pattern configuration for action classification and text cleanup.
//!
//! Every list has a built-in default matching Tennessee General Assembly
//! records. A YAML file may override any subset of fields; fields it leaves
//! out keep their defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Literal substrings that mark an action as reaching a procedural milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPatterns {
    /// Bill cleared committee and was placed on a floor calendar
    pub committee: Vec<String>,
    /// Bill was placed on a consent calendar
    pub uncontroversial: Vec<String>,
    /// Bill failed a floor vote at least once
    pub voted_down: Vec<String>,
    /// Bill became law
    pub passed: Vec<String>,
    /// Governor vetoed or did not sign
    pub did_not_sign: Vec<String>,
    /// Recorded floor votes considered for unanimity
    pub floor_vote: Vec<String>,
    /// Literal text preceding the nay count, e.g. `"Nays "` in `"Ayes 90, Nays 0"`
    pub nays_prefix: String,
}

impl Default for ActionPatterns {
    fn default() -> Self {
        Self {
            committee: strings(&[
                "H. Placed on Regular Calendar",
                "H. Placed on Consent Calendar",
                "Placed on Senate Consent Calendar",
                "Placed on Senate Regular Calendar",
            ]),
            uncontroversial: strings(&[
                "H. Placed on Consent Calendar",
                "Placed on Senate Consent Calendar",
            ]),
            voted_down: strings(&["Failed to pass H.", "Failed to pass Senate"]),
            passed: strings(&[
                "Signed by Governor",
                "Returned by Governor without signature",
            ]),
            did_not_sign: strings(&[
                "Vetoed by Governor.",
                "Returned by Governor without signature",
            ]),
            floor_vote: strings(&[
                "Failed to pass H.",
                "Failed to pass Senate",
                "Passed H.",
                "Passed Senate",
                "Passed S.",
            ]),
            nays_prefix: "Nays ".to_string(),
        }
    }
}

/// Regular expressions used to clean bill text and titles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPatterns {
    /// Removed from raw text in a single alternation pass
    pub boilerplate: Vec<String>,
    /// Leading phrase whose case is normalized
    pub leading_phrase: String,
    pub leading_replacement: String,
    /// Trailing effective-date sentence
    pub effective_clause: String,
    /// Suffixes stripped from bill titles
    pub title_suffixes: Vec<String>,
}

impl Default for TextPatterns {
    fn default() -> Self {
        Self {
            boilerplate: strings(&[
                r"- ?[0-9]+ ?-",
                r"[HS]B[0-9]{4}",
                r"[0-9]{6,8}",
                r"\([0-9]+\)",
                r"\([A-Za-z]\)",
                r"SECTION [0-9]+\.",
                r"BE IT ENACTED BY THE GENERAL ASSEMBLY OF THE STATE OF TENNESSEE:",
                r"SENATE BILL [0-9]{1,4} By ([A-Za-z]+) ?[A-Z]?",
                r"HOUSE BILL [0-9]{1,4} By ([A-Za-z]+) ?[A-Z]?",
                r"<BillNo>",
                r"<Sponsor>",
            ]),
            leading_phrase: "AN ACT".to_string(),
            leading_replacement: "An act".to_string(),
            effective_clause: r" This act shall take effect .+, the public welfare requiring it\."
                .to_string(),
            title_suffixes: strings(&[r" - $", r" - Amends.+$"]),
        }
    }
}

/// Complete pattern configuration handed to the classifier and normalizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet {
    pub actions: ActionPatterns,
    pub text: TextPatterns,
}

impl PatternSet {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Load a pattern configuration file
pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<PatternSet> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    PatternSet::from_yaml(&contents)
}
