use crate::error::{Error, Result};
use crate::types::{BillRecord, Era};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes one JSON artifact per era
#[derive(Debug, Clone)]
pub struct Emitter {
    out_dir: PathBuf,
}

impl Emitter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn artifact_path(&self, era: Era) -> PathBuf {
        self.out_dir.join(era.artifact_name())
    }

    /// Serialize records as a JSON array of objects
    pub fn to_writer<W: Write>(writer: W, records: &[BillRecord]) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;
        Ok(())
    }

    /// Write `<out_dir>/<era>.json`.
    ///
    /// The artifact is written beside its final name and renamed into place,
    /// so an interrupted run leaves any previous artifact untouched.
    pub fn emit(&self, era: Era, records: &[BillRecord]) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        let path = self.artifact_path(era);
        let partial = partial_path(&path);
        let result = fs::File::create(&partial)
            .map_err(Error::from)
            .and_then(|file| Self::to_writer(file, records));
        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &path)?;

        info!(era = %era, rows = records.len(), path = %path.display(), "wrote artifact");
        Ok(path)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BillId, Chamber, OutcomeFlags};

    fn record(number: u32) -> BillRecord {
        BillRecord {
            session: 111,
            bill_id: BillId::new(Chamber::Senate, number),
            title: "Title".to_string(),
            subjects: vec!["Taxes".to_string()],
            sponsors: vec![],
            raw_text: Some("RAW".to_string()),
            text: None,
            flags: OutcomeFlags {
                passed: Some(true),
                unanimous: None,
                voted_down: Some(false),
                ..OutcomeFlags::default()
            },
        }
    }

    #[test]
    fn test_fixed_key_order_and_null_encoding() {
        let mut buf = Vec::new();
        Emitter::to_writer(&mut buf, &[record(3)]).unwrap();
        let json = String::from_utf8(buf).unwrap();
        assert_eq!(
            json,
            r#"[{"session":111,"bill_id":"SB 3","title":"Title","subjects":["Taxes"],"sponsors":[],"text":null,"committee":null,"uncontroversial":null,"voted_down":false,"passed":true,"unanimous":null,"did_not_sign":null}]"#
        );
    }

    #[test]
    fn test_emit_writes_era_artifacts_separately() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = Emitter::new(dir.path().join("out"));

        let current = emitter.emit(Era::Current, &[record(1)]).unwrap();
        let legacy = emitter.emit(Era::Legacy, &[record(1), record(2)]).unwrap();

        assert_eq!(current.file_name().unwrap(), "current.json");
        assert_eq!(legacy.file_name().unwrap(), "legacy.json");

        let parsed: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&legacy).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!dir.path().join("out").join("legacy.json.partial").exists());
    }
}
