use crate::error::{Error, Result, Stage};
use crate::patterns::TextPatterns;
use crate::types::{BillId, Chamber};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::debug;

fn bill_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(HB|SB) ?([0-9]{1,6})$").expect("static regex"))
}

fn session_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]{1,4})(?:st|nd|rd|th)?$").expect("static regex"))
}

/// Parse a bill identifier in either raw file form (`"HB0001"`) or canonical
/// form (`"HB 1"`).
pub fn canonical_bill_id(raw: &str) -> Result<BillId> {
    let trimmed = raw.trim();
    let caps = bill_id_regex().captures(trimmed).ok_or_else(|| {
        Error::data_quality(
            Stage::Normalize,
            trimmed,
            "bill identifier does not match <HB|SB><digits>",
        )
    })?;

    let chamber = Chamber::from_code(&caps[1]).ok_or_else(|| {
        Error::data_quality(Stage::Normalize, trimmed, "unknown chamber code")
    })?;
    let number: u32 = caps[2].parse().map_err(|_| {
        Error::data_quality(Stage::Normalize, trimmed, "bill number is not an integer")
    })?;
    if number == 0 {
        return Err(Error::data_quality(
            Stage::Normalize,
            trimmed,
            "bill number must be positive",
        ));
    }

    Ok(BillId::new(chamber, number))
}

/// Parse a session label such as `"111th"` (or a bare `"111"`) into its number
pub fn parse_session_label(label: &str) -> Result<u32> {
    let trimmed = label.trim();
    let caps = session_regex().captures(trimmed).ok_or_else(|| {
        Error::data_quality(Stage::Normalize, trimmed, "unparseable session label")
    })?;
    match caps[1].parse::<u32>() {
        Ok(session) if session > 0 => Ok(session),
        _ => Err(Error::data_quality(
            Stage::Normalize,
            trimmed,
            "session number must be positive",
        )),
    }
}

/// Decode bytes as Latin-1, which is what the text converter writes
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Strips statutory boilerplate and whitespace noise from extracted bill text
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    boilerplate: Option<Regex>,
    whitespace: Regex,
    leading_phrase: String,
    leading_replacement: String,
    effective_clause: Option<Regex>,
    title_suffixes: Vec<Regex>,
}

impl TextNormalizer {
    pub fn new(patterns: &TextPatterns) -> Result<Self> {
        let boilerplate = if patterns.boilerplate.is_empty() {
            None
        } else {
            let alternation = patterns
                .boilerplate
                .iter()
                .map(|p| format!("(?:{})", p))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        let effective_clause = if patterns.effective_clause.is_empty() {
            None
        } else {
            Some(Regex::new(&patterns.effective_clause)?)
        };

        let title_suffixes = patterns
            .title_suffixes
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            boilerplate,
            whitespace: Regex::new(r"\s+")?,
            leading_phrase: patterns.leading_phrase.clone(),
            leading_replacement: patterns.leading_replacement.clone(),
            effective_clause,
            title_suffixes,
        })
    }

    /// Normalize raw bill text.
    ///
    /// Removal can splice fragments into new boilerplate (`"123HB0001456"`
    /// leaves `"123456"`), so the cleanup is repeated until it settles.
    /// Passes that change the text without shortening it settle on the next
    /// pass, so the input length bounds the work.
    pub fn normalize(&self, raw: &str) -> String {
        let max_passes = raw.len() + 2;
        let mut current = self.normalize_once(raw);
        for _ in 1..max_passes {
            let next = self.normalize_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
        debug!(passes = max_passes, "text normalization did not settle");
        current
    }

    fn normalize_once(&self, raw: &str) -> String {
        let stripped = match &self.boilerplate {
            Some(re) => re.replace_all(raw, ""),
            None => Cow::Borrowed(raw),
        };
        let collapsed = self.whitespace.replace_all(&stripped, " ");
        let trimmed = collapsed.trim();

        let recased = if !self.leading_phrase.is_empty() && trimmed.starts_with(&self.leading_phrase)
        {
            format!(
                "{}{}",
                self.leading_replacement,
                &trimmed[self.leading_phrase.len()..]
            )
        } else {
            trimmed.to_string()
        };

        match &self.effective_clause {
            Some(re) => re.replace_all(&recased, "").into_owned(),
            None => recased,
        }
    }

    /// Drop trailing `" - "` and `" - Amends TCA ..."` from a bill title
    pub fn clean_title(&self, title: &str) -> String {
        self.title_suffixes
            .iter()
            .fold(title.to_string(), |acc, re| re.replace(&acc, "").into_owned())
    }
}
