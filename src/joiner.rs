use crate::error::{Error, JoinSide, JoinStage, Result, Stage};
use crate::types::{
    Bill, BillKey, BillRecord, BillText, FlagTable, FlagTables, OutcomeFlags, SponsorRow,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Everything the joiner needs for one era
#[derive(Debug, Clone, Default)]
pub struct JoinInputs {
    pub bills: Vec<Bill>,
    pub texts: Vec<BillText>,
    /// Separate sponsor table; when absent, sponsors come from the bill metadata
    pub sponsors: Option<Vec<SponsorRow>>,
    pub flags: FlagTables,
}

/// Merges metadata, text, sponsors and outcome tables into one row per bill.
///
/// Every merge is a left join on (session, bill_id) that must be 1:1. A key
/// seen twice on either side aborts with [`Error::Cardinality`] instead of
/// multiplying rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordJoiner;

impl RecordJoiner {
    pub fn new() -> Self {
        Self
    }

    pub fn join(&self, inputs: JoinInputs) -> Result<Vec<BillRecord>> {
        let JoinInputs {
            bills,
            texts,
            sponsors,
            flags,
        } = inputs;

        let anchor = Self::anchor(bills)?;
        let anchor_keys: HashSet<BillKey> = anchor.iter().map(Bill::key).collect();

        let mut texts =
            index_one_to_one(JoinStage::Text, texts.into_iter().map(|t| (t.key(), t)))?;
        let mut sponsors = match sponsors {
            Some(rows) => Some(index_one_to_one(
                JoinStage::Sponsors,
                rows.into_iter().map(|row| (row.key, row.sponsors)),
            )?),
            None => None,
        };
        let committee = index_flag(JoinStage::Committee, &flags.committee)?;
        let uncontroversial = index_flag(JoinStage::Uncontroversial, &flags.uncontroversial)?;
        let voted_down = index_flag(JoinStage::VotedDown, &flags.voted_down)?;
        let passed = index_flag(JoinStage::Passed, &flags.passed)?;
        let unanimous = index_one_to_one(
            JoinStage::Unanimous,
            flags.unanimous.rows.iter().copied(),
        )?;
        let did_not_sign = index_flag(JoinStage::DidNotSign, &flags.did_not_sign)?;

        let orphaned_texts = texts
            .keys()
            .filter(|key| !anchor_keys.contains(key))
            .count();
        if orphaned_texts > 0 {
            debug!(count = orphaned_texts, "texts without matching bill metadata dropped");
        }

        let mut missing_text = 0usize;
        let mut records = Vec::with_capacity(anchor.len());

        for bill in anchor {
            let key = bill.key();
            let observed = flags.observed.contains(&key);
            let fired = |set: &HashSet<BillKey>| {
                if set.contains(&key) {
                    Some(true)
                } else if observed {
                    Some(false)
                } else {
                    None
                }
            };

            let outcome = OutcomeFlags {
                committee: fired(&committee),
                uncontroversial: fired(&uncontroversial),
                voted_down: fired(&voted_down),
                passed: fired(&passed),
                unanimous: unanimous.get(&key).copied(),
                did_not_sign: fired(&did_not_sign),
            };

            let text = texts.remove(&key);
            if text.is_none() {
                missing_text += 1;
                debug!(session = key.session, bill_id = %key.bill_id, "no text for bill");
            }

            let bill_sponsors = match sponsors.as_mut() {
                Some(table) => table.remove(&key).unwrap_or_default(),
                None => bill.sponsors,
            };

            records.push(BillRecord {
                session: bill.session,
                bill_id: bill.bill_id,
                title: bill.title,
                subjects: bill.subjects,
                sponsors: bill_sponsors,
                raw_text: text.as_ref().map(|t| t.raw.clone()),
                text: text.map(|t| t.normalized),
                flags: outcome,
            });
        }

        if missing_text > 0 {
            info!(count = missing_text, "bills without text, emitted as null");
        }

        records.sort_by_key(BillRecord::key);
        Ok(records)
    }

    /// Deduplicate on (session, bill_id, title), then require unique keys
    fn anchor(bills: Vec<Bill>) -> Result<Vec<Bill>> {
        let mut seen_rows: HashSet<(BillKey, String)> = HashSet::new();
        let mut seen_keys: HashSet<BillKey> = HashSet::new();
        let mut anchor = Vec::with_capacity(bills.len());

        for bill in bills {
            let key = bill.key();
            if !seen_rows.insert((key, bill.title.clone())) {
                continue;
            }
            if !seen_keys.insert(key) {
                return Err(cardinality(JoinStage::Anchor, key, JoinSide::Left));
            }
            anchor.push(bill);
        }

        Ok(anchor)
    }
}

fn cardinality(stage: JoinStage, key: BillKey, side: JoinSide) -> Error {
    Error::Cardinality {
        stage: Stage::Join(stage),
        session: key.session,
        bill_id: key.bill_id.to_string(),
        side,
    }
}

fn index_one_to_one<T>(
    stage: JoinStage,
    rows: impl IntoIterator<Item = (BillKey, T)>,
) -> Result<HashMap<BillKey, T>> {
    let mut index = HashMap::new();
    for (key, value) in rows {
        if index.insert(key, value).is_some() {
            return Err(cardinality(stage, key, JoinSide::Right));
        }
    }
    Ok(index)
}

fn index_flag(stage: JoinStage, table: &FlagTable) -> Result<HashSet<BillKey>> {
    let mut index = HashSet::with_capacity(table.len());
    for key in &table.rows {
        if !index.insert(*key) {
            return Err(cardinality(stage, *key, JoinSide::Right));
        }
    }
    Ok(index)
}
