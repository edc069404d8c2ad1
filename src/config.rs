use crate::error::{Error, Result};
use crate::patterns::{load_patterns, PatternSet};
use crate::types::Era;
use std::path::{Path, PathBuf};

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct Config {
    pub era: Era,
    /// Bill export: a JSON file for the current era, a CSV directory for legacy
    pub input: PathBuf,
    /// Root of `<NNN>th/<HB|SB>NNNN.txt` text files
    pub text_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
    /// Sessions to keep; empty keeps all
    pub sessions: Vec<u32>,
    pub patterns: PatternSet,
}

impl Config {
    /// Create a new default configuration
    pub fn new(era: Era, input: impl Into<PathBuf>) -> Self {
        Self {
            era,
            input: input.into(),
            text_dir: None,
            out_dir: PathBuf::from("data"),
            sessions: Vec::new(),
            patterns: PatternSet::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.era {
            Era::Current => {
                if !self.input.is_file() {
                    return Err(Error::Config(format!(
                        "Bill export file does not exist: {}",
                        self.input.display()
                    )));
                }
            }
            Era::Legacy => {
                if !self.input.is_dir() {
                    return Err(Error::Config(format!(
                        "Legacy export directory does not exist: {}",
                        self.input.display()
                    )));
                }
            }
        }

        if let Some(text_dir) = &self.text_dir {
            if !text_dir.is_dir() {
                return Err(Error::Config(format!(
                    "Text directory is not a directory: {}",
                    text_dir.display()
                )));
            }
        }

        if self.sessions.contains(&0) {
            return Err(Error::Config("Session numbers must be positive".to_string()));
        }

        Ok(())
    }

    pub fn keeps_session(&self, session: u32) -> bool {
        self.sessions.is_empty() || self.sessions.contains(&session)
    }
}

/// Builder for creating configurations
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new(era: Era, input: impl Into<PathBuf>) -> Self {
        Self {
            config: Config::new(era, input),
        }
    }

    /// Set the text directory
    pub fn text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.text_dir = Some(dir.into());
        self
    }

    /// Set the output directory
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    /// Add a session to keep
    pub fn add_session(mut self, session: u32) -> Self {
        if !self.config.sessions.contains(&session) {
            self.config.sessions.push(session);
        }
        self
    }

    /// Set the sessions to keep
    pub fn sessions(mut self, sessions: Vec<u32>) -> Self {
        self.config.sessions = sessions;
        self
    }

    /// Set sessions from a comma-separated string such as `"109,110"`
    pub fn sessions_str(mut self, sessions: &str) -> Result<Self> {
        if sessions.trim().is_empty() {
            self.config.sessions = vec![];
            return Ok(self);
        }

        let parsed: Result<Vec<u32>> = sessions
            .split(',')
            .map(|s| {
                let trimmed = s.trim();
                trimmed.parse::<u32>().map_err(|_| {
                    Error::Config(format!("Invalid session '{}'. Expected a number", trimmed))
                })
            })
            .collect();

        self.config.sessions = parsed?;
        Ok(self)
    }

    /// Use an explicit pattern configuration
    pub fn patterns(mut self, patterns: PatternSet) -> Self {
        self.config.patterns = patterns;
        self
    }

    /// Load the pattern configuration from a YAML file
    pub fn patterns_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        self.config.patterns = load_patterns(path).map_err(|e| {
            Error::Config(format!("Failed to load patterns {}: {}", path.display(), e))
        })?;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_rejected() {
        let result = ConfigBuilder::new(Era::Current, "/definitely/not/here.json").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_legacy_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tn_bills.csv");
        std::fs::write(&file, "").unwrap();

        assert!(ConfigBuilder::new(Era::Legacy, &file).build().is_err());
        let config = ConfigBuilder::new(Era::Legacy, dir.path())
            .out_dir(dir.path().join("out"))
            .build()
            .unwrap();
        assert_eq!(config.out_dir, dir.path().join("out"));
    }

    #[test]
    fn test_sessions_str() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new(Era::Legacy, dir.path())
            .sessions_str("109, 110")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.sessions, vec![109, 110]);
        assert!(config.keeps_session(110));
        assert!(!config.keeps_session(108));

        assert!(ConfigBuilder::new(Era::Legacy, dir.path())
            .sessions_str("109,abc")
            .is_err());
    }

    #[test]
    fn test_zero_session_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigBuilder::new(Era::Legacy, dir.path())
            .add_session(0)
            .build();
        assert!(result.is_err());
    }
}
