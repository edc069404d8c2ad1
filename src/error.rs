use std::fmt;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error or log record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingest,
    Normalize,
    Join(JoinStage),
}

/// The individual merges performed by the record joiner, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinStage {
    Anchor,
    Text,
    Sponsors,
    Committee,
    Uncontroversial,
    VotedDown,
    Passed,
    Unanimous,
    DidNotSign,
}

impl JoinStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinStage::Anchor => "anchor",
            JoinStage::Text => "text",
            JoinStage::Sponsors => "sponsors",
            JoinStage::Committee => "committee",
            JoinStage::Uncontroversial => "uncontroversial",
            JoinStage::VotedDown => "voted_down",
            JoinStage::Passed => "passed",
            JoinStage::Unanimous => "unanimous",
            JoinStage::DidNotSign => "did_not_sign",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "ingest"),
            Stage::Normalize => write!(f, "normalize"),
            Stage::Join(join) => write!(f, "join:{}", join.as_str()),
        }
    }
}

/// Which side of a merge held the duplicated key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinSide::Left => write!(f, "left"),
            JoinSide::Right => write!(f, "right"),
        }
    }
}

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("File path error: {0}")]
    Path(String),

    /// A record carried an identifier or session label that cannot be parsed.
    /// The record is rejected rather than kept with empty key fields.
    #[error("Data quality error at {stage} ({context}): {reason}")]
    DataQuality {
        stage: Stage,
        context: String,
        reason: String,
    },

    /// A join key matched more than one row on one side of a merge.
    #[error(
        "Cardinality violation at {stage}: session {session}, bill {bill_id} appears more than once on the {side} side"
    )]
    Cardinality {
        stage: Stage,
        session: u32,
        bill_id: String,
        side: JoinSide,
    },
}

impl Error {
    pub(crate) fn data_quality(
        stage: Stage,
        context: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::DataQuality {
            stage,
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that reject a single record instead of failing the run
    pub fn is_record_level(&self) -> bool {
        matches!(self, Error::DataQuality { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_message_names_stage_and_key() {
        let err = Error::Cardinality {
            stage: Stage::Join(JoinStage::Text),
            session: 111,
            bill_id: "HB 1".to_string(),
            side: JoinSide::Right,
        };
        let msg = err.to_string();
        assert!(msg.contains("join:text"));
        assert!(msg.contains("session 111"));
        assert!(msg.contains("HB 1"));
        assert!(msg.contains("right"));
        assert!(!err.is_record_level());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Ingest.to_string(), "ingest");
        assert_eq!(Stage::Normalize.to_string(), "normalize");
        assert_eq!(Stage::Join(JoinStage::DidNotSign).to_string(), "join:did_not_sign");
    }

    #[test]
    fn test_data_quality_is_record_level() {
        let err = Error::data_quality(Stage::Normalize, "text/111th/XB12.txt", "bad id");
        assert!(err.is_record_level());
        assert!(err.to_string().starts_with("Data quality error at normalize"));
    }
}
