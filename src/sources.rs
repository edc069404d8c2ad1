//! Readers for the exports left behind by the external fetch and text
//! conversion tools.
//!
//! Readers only parse and canonicalize keys. Records whose identifiers cannot
//! be parsed are returned as rejections next to the good records so a batch
//! never fails because of one bad row.

use crate::error::{Error, Result, Stage};
use crate::normalizer::{canonical_bill_id, decode_latin1, parse_session_label};
use crate::types::{Action, Bill, BillId, BillKey, SponsorRow};
use async_stream::stream;
use futures::Stream;
use jwalk::WalkDir;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LEGACY_BILLS_FILE: &str = "tn_bills.csv";
pub const LEGACY_ACTIONS_FILE: &str = "tn_bill_actions.csv";
pub const LEGACY_SPONSORS_FILE: &str = "tn_bill_sponsors.csv";

/// Bills and actions read from one era's export
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub bills: Vec<Bill>,
    pub actions: Vec<Action>,
    /// Sponsor table, for exports that ship sponsors separately
    pub sponsors: Option<Vec<SponsorRow>>,
    /// Record-level data quality errors
    pub rejected: Vec<Error>,
    /// Records that are not bills (resolutions, memorials) and were skipped
    pub skipped: usize,
}

impl SourceBatch {
    fn reject(&mut self, context: &str, err: Error) {
        let err = restage(err, context);
        warn!(error = %err, "rejected record");
        self.rejected.push(err);
    }
}

/// Move a data quality error into the ingest stage, keeping the record context
fn restage(err: Error, context: &str) -> Error {
    match err {
        Error::DataQuality { context: raw, reason, .. } => Error::DataQuality {
            stage: Stage::Ingest,
            context: format!("{} ({})", context, raw),
            reason,
        },
        other => other,
    }
}

fn parse_key(session: &str, bill_id: &str) -> Result<(u32, BillId)> {
    Ok((parse_session_label(session)?, canonical_bill_id(bill_id)?))
}

/// Only HB/SB identifiers are bills; joint resolutions and the like are skipped
fn is_bill_identifier(bill_id: &str) -> bool {
    bill_id.contains("HB") || bill_id.contains("SB")
}

fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn session_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Current era: JSON array of API bill objects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiBill {
    session: Value,
    bill_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subjects: Vec<String>,
    #[serde(default)]
    sponsors: Vec<ApiSponsor>,
    #[serde(default)]
    actions: Vec<ApiAction>,
}

#[derive(Debug, Deserialize)]
struct ApiSponsor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAction {
    #[serde(default)]
    actor: Option<String>,
    action: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Parse the current-era API export
pub fn parse_current(json: &str) -> Result<SourceBatch> {
    let api_bills: Vec<ApiBill> = serde_json::from_str(json)?;
    let mut batch = SourceBatch::default();

    for api_bill in api_bills {
        if !is_bill_identifier(&api_bill.bill_id) {
            batch.skipped += 1;
            debug!(bill_id = %api_bill.bill_id, "skipping non-bill record");
            continue;
        }

        let session = session_label(&api_bill.session);
        let (session, bill_id) = match parse_key(&session, &api_bill.bill_id) {
            Ok(key) => key,
            Err(e) => {
                batch.reject(&format!("bill {}", api_bill.bill_id), e);
                continue;
            }
        };

        for api_action in api_bill.actions {
            let text = match api_action.action {
                Some(text) if !text.trim().is_empty() => text,
                _ => continue,
            };
            batch.actions.push(Action {
                session,
                bill_id,
                actor: api_action.actor.unwrap_or_default(),
                action: text,
                date: api_action.date,
                nays: None,
            });
        }

        batch.bills.push(Bill {
            session,
            bill_id,
            title: api_bill.title,
            subjects: dedup_preserving_order(api_bill.subjects),
            sponsors: api_bill
                .sponsors
                .into_iter()
                .filter_map(|sponsor| sponsor.name)
                .collect(),
        });
    }

    Ok(batch)
}

/// Read the current-era API export from disk
pub async fn read_current(path: &Path) -> Result<SourceBatch> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_current(&contents)
}

// ---------------------------------------------------------------------------
// Legacy era: bulk CSV export
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LegacyBillRow {
    session: String,
    bill_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subjects: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyActionRow {
    session: String,
    bill_id: String,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacySponsorRow {
    session: String,
    bill_id: String,
    #[serde(default)]
    name: Option<String>,
}

fn parse_legacy_bills<R: std::io::Read>(reader: R, batch: &mut SourceBatch) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    for row in rdr.deserialize::<LegacyBillRow>() {
        let row = row?;
        if row.kind.as_deref().map(str::trim) != Some("bill") {
            batch.skipped += 1;
            continue;
        }
        let (session, bill_id) = match parse_key(&row.session, &row.bill_id) {
            Ok(key) => key,
            Err(e) => {
                batch.reject(&format!("{} bill {}", LEGACY_BILLS_FILE, row.bill_id), e);
                continue;
            }
        };
        let subjects = row
            .subjects
            .map(|s| dedup_preserving_order(s.split('|').map(str::to_string)))
            .unwrap_or_default();

        batch.bills.push(Bill {
            session,
            bill_id,
            title: row.title,
            subjects,
            sponsors: Vec::new(),
        });
    }
    Ok(())
}

fn parse_legacy_actions<R: std::io::Read>(reader: R, batch: &mut SourceBatch) -> Result<()> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut dropped = 0usize;
    for row in rdr.deserialize::<LegacyActionRow>() {
        let row = row?;
        let text = match row.action {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                dropped += 1;
                continue;
            }
        };
        if !is_bill_identifier(&row.bill_id) {
            continue;
        }
        let (session, bill_id) = match parse_key(&row.session, &row.bill_id) {
            Ok(key) => key,
            Err(e) => {
                batch.reject(&format!("{} bill {}", LEGACY_ACTIONS_FILE, row.bill_id), e);
                continue;
            }
        };
        batch.actions.push(Action {
            session,
            bill_id,
            actor: row.actor.unwrap_or_default(),
            action: text,
            date: row.date,
            nays: None,
        });
    }
    if dropped > 0 {
        debug!(count = dropped, "dropped legacy actions without text");
    }
    Ok(())
}

/// Group sponsor rows per bill, keeping file order within each bill
fn parse_legacy_sponsors<R: std::io::Read>(
    reader: R,
    batch: &mut SourceBatch,
) -> Result<Vec<SponsorRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows: Vec<SponsorRow> = Vec::new();
    let mut positions: HashMap<BillKey, usize> = HashMap::new();

    for row in rdr.deserialize::<LegacySponsorRow>() {
        let row = row?;
        if !is_bill_identifier(&row.bill_id) {
            continue;
        }
        let (session, bill_id) = match parse_key(&row.session, &row.bill_id) {
            Ok(key) => key,
            Err(e) => {
                batch.reject(&format!("{} bill {}", LEGACY_SPONSORS_FILE, row.bill_id), e);
                continue;
            }
        };
        let name = match row.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => continue,
        };

        let key = BillKey::new(session, bill_id);
        match positions.get(&key) {
            Some(&idx) => rows[idx].sponsors.push(name),
            None => {
                positions.insert(key, rows.len());
                rows.push(SponsorRow {
                    key,
                    sponsors: vec![name],
                });
            }
        }
    }

    Ok(rows)
}

/// Parse the three legacy CSV files from in-memory contents.
/// Missing action or sponsor files are tolerated.
pub fn parse_legacy(
    bills_csv: &str,
    actions_csv: Option<&str>,
    sponsors_csv: Option<&str>,
) -> Result<SourceBatch> {
    let mut batch = SourceBatch::default();
    parse_legacy_bills(bills_csv.as_bytes(), &mut batch)?;

    match actions_csv {
        Some(contents) => parse_legacy_actions(contents.as_bytes(), &mut batch)?,
        None => warn!("no legacy action export; outcome flags will be null"),
    }

    batch.sponsors = match sponsors_csv {
        Some(contents) => Some(parse_legacy_sponsors(contents.as_bytes(), &mut batch)?),
        None => {
            warn!("no legacy sponsor export; sponsors will be empty");
            None
        }
    };

    Ok(batch)
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "export file not found");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read the legacy bulk export from a directory
pub async fn read_legacy(dir: &Path) -> Result<SourceBatch> {
    let bills_path = dir.join(LEGACY_BILLS_FILE);
    let bills = tokio::fs::read_to_string(&bills_path).await.map_err(|e| {
        Error::Path(format!("Failed to read {}: {}", bills_path.display(), e))
    })?;
    let actions = read_optional(&dir.join(LEGACY_ACTIONS_FILE)).await?;
    let sponsors = read_optional(&dir.join(LEGACY_SPONSORS_FILE)).await?;

    parse_legacy(&bills, actions.as_deref(), sponsors.as_deref())
}

// ---------------------------------------------------------------------------
// Extracted bill text
// ---------------------------------------------------------------------------

/// A discovered text file
#[derive(Debug, Clone)]
pub struct TextFile {
    pub path: PathBuf,
    pub relative_path: String,
}

/// Raw text of one bill, keyed from its file location
#[derive(Debug, Clone)]
pub struct RawText {
    pub session: u32,
    pub bill_id: BillId,
    pub raw: String,
}

/// Find every `.txt` file under the text directory, sorted by relative path
pub fn discover_text_files(text_dir: &Path) -> Result<Vec<TextFile>> {
    let mut files = Vec::new();

    for entry_result in WalkDir::new(text_dir).sort(true) {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().map(|ext| ext == "txt").unwrap_or(false) {
            let relative_path = pathdiff::diff_paths(&path, text_dir)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            files.push(TextFile {
                path: path.to_path_buf(),
                relative_path,
            });
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

/// Derive (session, bill_id) from `<NNN>th/<HB|SB>NNNN.txt`
pub fn text_file_key(file: &TextFile) -> Result<(u32, BillId)> {
    let session_dir = file
        .path
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file
        .path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    parse_key(&session_dir, &stem).map_err(|e| restage(e, &file.relative_path))
}

/// Stream the raw text of every bill under `text_dir`.
///
/// Files whose location does not yield a valid key are yielded as
/// record-level errors; other errors end the stream.
pub fn read_texts(text_dir: PathBuf) -> impl Stream<Item = Result<RawText>> {
    Box::pin(stream! {
        let dir = text_dir.clone();
        let files = match tokio::task::spawn_blocking(move || discover_text_files(&dir)).await {
            Ok(Ok(files)) => files,
            Ok(Err(e)) => {
                yield Err(e);
                return;
            }
            Err(e) => {
                yield Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Task join error: {}", e)
                )));
                return;
            }
        };

        debug!(count = files.len(), dir = %text_dir.display(), "discovered text files");

        for file in files {
            let (session, bill_id) = match text_file_key(&file) {
                Ok(key) => key,
                Err(e) => {
                    yield Err(e);
                    continue;
                }
            };

            match tokio::fs::read(&file.path).await {
                Ok(bytes) => yield Ok(RawText {
                    session,
                    bill_id,
                    raw: decode_latin1(&bytes),
                }),
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chamber;
    use futures::StreamExt;

    #[test]
    fn test_parse_current() {
        let json = r#"[
            {
                "session": "111",
                "bill_id": "HB 1",
                "title": "Taxes - As introduced.",
                "subjects": ["Taxes", "Taxes", "Budget"],
                "sponsors": [{"name": "Smith"}, {"name": "Jones"}],
                "actions": [
                    {"actor": "lower", "action": "Passed H., Ayes 90, Nays 0", "date": "2019-03-01"},
                    {"actor": "lower", "action": null}
                ]
            },
            {"session": "111", "bill_id": "HJR 5", "title": "Resolution"},
            {"session": 111, "bill_id": "HB 0", "title": "Broken"}
        ]"#;

        let batch = parse_current(json).unwrap();
        assert_eq!(batch.bills.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.rejected.len(), 1);
        assert!(batch.sponsors.is_none());

        let bill = &batch.bills[0];
        assert_eq!(bill.bill_id, BillId::new(Chamber::House, 1));
        assert_eq!(bill.subjects, vec!["Taxes", "Budget"]);
        assert_eq!(bill.sponsors, vec!["Smith", "Jones"]);

        assert_eq!(batch.actions.len(), 1);
        assert_eq!(batch.actions[0].date.as_deref(), Some("2019-03-01"));
    }

    #[test]
    fn test_parse_legacy() {
        let bills = "session,bill_id,title,subjects,type\n\
                     108,HB 10,Ten,Taxes|Budget,bill\n\
                     108,HB 2,Two,,bill\n\
                     108,HR 3,Resolution,,resolution\n";
        let actions = "session,bill_id,actor,action,date\n\
                       108,HB 10,lower,Signed by Governor.,2013-04-01\n\
                       108,HB 10,lower,,2013-04-02\n";
        let sponsors = "session,bill_id,name\n\
                        108,HB 10,Smith\n\
                        108,HB 2,Lee\n\
                        108,HB 10,Jones\n";

        let batch = parse_legacy(bills, Some(actions), Some(sponsors)).unwrap();
        assert_eq!(batch.bills.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.bills[0].subjects, vec!["Taxes", "Budget"]);
        assert!(batch.bills[1].subjects.is_empty());
        assert_eq!(batch.actions.len(), 1);

        let sponsors = batch.sponsors.unwrap();
        assert_eq!(sponsors.len(), 2);
        assert_eq!(sponsors[0].sponsors, vec!["Smith", "Jones"]);
        assert_eq!(sponsors[1].sponsors, vec!["Lee"]);
    }

    #[test]
    fn test_parse_legacy_without_actions() {
        let bills = "session,bill_id,title,subjects,type\n107,SB 4,Four,,bill\n";
        let batch = parse_legacy(bills, None, None).unwrap();
        assert_eq!(batch.bills.len(), 1);
        assert!(batch.actions.is_empty());
        assert!(batch.sponsors.is_none());
    }

    #[tokio::test]
    async fn test_read_texts() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join("111th");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("HB0002.txt"), b"AN ACT \xa7 1").unwrap();
        std::fs::write(session_dir.join("SB0010.txt"), b"Senate text").unwrap();
        std::fs::write(session_dir.join("notes.txt"), b"not a bill").unwrap();
        std::fs::write(session_dir.join("HB0002.pdf"), b"%PDF").unwrap();

        let results: Vec<Result<RawText>> = read_texts(dir.path().to_path_buf()).collect().await;
        assert_eq!(results.len(), 3);

        let ok: Vec<&RawText> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].bill_id.to_string(), "HB 2");
        assert_eq!(ok[0].session, 111);
        assert_eq!(ok[0].raw, "AN ACT § 1");
        assert_eq!(ok[1].bill_id.to_string(), "SB 10");

        let rejected: Vec<&Error> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].is_record_level());
        assert!(rejected[0].to_string().contains("notes.txt"));
    }
}
