use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Originating chamber of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    /// Two-letter code used in bill identifiers
    pub fn code(&self) -> &'static str {
        match self {
            Chamber::House => "HB",
            Chamber::Senate => "SB",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "HB" => Some(Chamber::House),
            "SB" => Some(Chamber::Senate),
            _ => None,
        }
    }
}

/// Canonical bill identifier, displayed as `"HB 1"`.
///
/// Ordering is chamber first, then the bill number compared as an integer,
/// so `HB 2` sorts before `HB 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillId {
    pub chamber: Chamber,
    pub number: u32,
}

impl BillId {
    pub fn new(chamber: Chamber, number: u32) -> Self {
        Self { chamber, number }
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.chamber.code(), self.number)
    }
}

impl Serialize for BillId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The (session, bill_id) join key shared by every table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillKey {
    pub session: u32,
    pub bill_id: BillId,
}

impl BillKey {
    pub fn new(session: u32, bill_id: BillId) -> Self {
        Self { session, bill_id }
    }
}

impl fmt::Display for BillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.bill_id)
    }
}

/// Legislative era; each era is emitted as its own artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era {
    /// 111th General Assembly onward, read from the API export
    Current,
    /// 107th through 110th, read from the bulk CSV export
    Legacy,
}

impl Era {
    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Current => "current",
            Era::Legacy => "legacy",
        }
    }

    /// File name of the era's output artifact
    pub fn artifact_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bill metadata as delivered by the metadata source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bill {
    pub session: u32,
    pub bill_id: BillId,
    pub title: String,
    pub subjects: Vec<String>,
    pub sponsors: Vec<String>,
}

impl Bill {
    pub fn key(&self) -> BillKey {
        BillKey::new(self.session, self.bill_id)
    }
}

/// A single procedural event in a bill's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub session: u32,
    pub bill_id: BillId,
    pub actor: String,
    pub action: String,
    pub date: Option<String>,
    /// Nay tally parsed from the action text, if the action records one
    pub nays: Option<u32>,
}

impl Action {
    pub fn key(&self) -> BillKey {
        BillKey::new(self.session, self.bill_id)
    }
}

/// Extracted text of one bill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillText {
    pub session: u32,
    pub bill_id: BillId,
    pub raw: String,
    pub normalized: String,
}

impl BillText {
    pub fn key(&self) -> BillKey {
        BillKey::new(self.session, self.bill_id)
    }
}

/// Sponsor list for one bill, used when sponsors arrive as a separate table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorRow {
    pub key: BillKey,
    pub sponsors: Vec<String>,
}

/// Keys for which a boolean outcome flag fired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
    pub rows: Vec<BillKey>,
}

impl FlagTable {
    /// Build a table from matching keys, keeping the first occurrence of each
    pub fn from_keys(keys: impl IntoIterator<Item = BillKey>) -> Self {
        let mut seen = BTreeSet::new();
        let rows = keys.into_iter().filter(|key| seen.insert(*key)).collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &BillKey) -> bool {
        self.rows.contains(key)
    }
}

/// Per-bill unanimity over recorded floor votes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnanimousTable {
    pub rows: Vec<(BillKey, bool)>,
}

#[cfg(test)]
impl UnanimousTable {
    pub(crate) fn get(&self, key: &BillKey) -> Option<bool> {
        self.rows
            .iter()
            .find(|(row_key, _)| row_key == key)
            .map(|(_, value)| *value)
    }
}

/// All derived outcome tables for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTables {
    pub committee: FlagTable,
    pub uncontroversial: FlagTable,
    pub voted_down: FlagTable,
    pub passed: FlagTable,
    pub unanimous: UnanimousTable,
    pub did_not_sign: FlagTable,
    /// Every key that had at least one action in the input
    pub observed: BTreeSet<BillKey>,
}

/// Outcome flags of one bill. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeFlags {
    pub committee: Option<bool>,
    pub uncontroversial: Option<bool>,
    pub voted_down: Option<bool>,
    pub passed: Option<bool>,
    pub unanimous: Option<bool>,
    pub did_not_sign: Option<bool>,
}

/// One finalized row of the output dataset.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillRecord {
    pub session: u32,
    pub bill_id: BillId,
    pub title: String,
    pub subjects: Vec<String>,
    pub sponsors: Vec<String>,
    #[serde(skip)]
    pub raw_text: Option<String>,
    pub text: Option<String>,
    #[serde(flatten)]
    pub flags: OutcomeFlags,
}

impl BillRecord {
    pub fn key(&self) -> BillKey {
        BillKey::new(self.session, self.bill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_id_display() {
        assert_eq!(BillId::new(Chamber::House, 1).to_string(), "HB 1");
        assert_eq!(BillId::new(Chamber::Senate, 42).to_string(), "SB 42");
    }

    #[test]
    fn test_bill_key_orders_numerically() {
        let hb2 = BillKey::new(111, BillId::new(Chamber::House, 2));
        let hb10 = BillKey::new(111, BillId::new(Chamber::House, 10));
        let sb1 = BillKey::new(111, BillId::new(Chamber::Senate, 1));
        let earlier = BillKey::new(110, BillId::new(Chamber::Senate, 900));

        let mut keys = vec![sb1, hb10, hb2, earlier];
        keys.sort();
        assert_eq!(keys, vec![earlier, hb2, hb10, sb1]);
    }

    #[test]
    fn test_flag_table_deduplicates() {
        let key = BillKey::new(111, BillId::new(Chamber::House, 1));
        let other = BillKey::new(111, BillId::new(Chamber::House, 3));
        let table = FlagTable::from_keys(vec![key, other, key]);
        assert_eq!(table.rows, vec![key, other]);
    }

    #[test]
    fn test_bill_id_serializes_as_string() {
        let json = serde_json::to_string(&BillId::new(Chamber::Senate, 7)).unwrap();
        assert_eq!(json, "\"SB 7\"");
    }
}
