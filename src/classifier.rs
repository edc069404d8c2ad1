use crate::error::Result;
use crate::patterns::ActionPatterns;
use crate::types::{Action, BillKey, FlagTable, FlagTables, UnanimousTable};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Alternation of literal substrings; an empty list never matches
#[derive(Debug, Clone)]
struct LiteralSet(Option<Regex>);

impl LiteralSet {
    fn new(literals: &[String]) -> Result<Self> {
        let literals: Vec<String> = literals
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();
        if literals.is_empty() {
            return Ok(Self(None));
        }
        Ok(Self(Some(Regex::new(&literals.join("|"))?)))
    }

    fn is_match(&self, text: &str) -> bool {
        self.0.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
    }
}

/// Derives outcome flag tables from procedural actions.
///
/// Classification is a pure function of the actions passed in; the classifier
/// holds nothing but its compiled patterns.
#[derive(Debug, Clone)]
pub struct ActionClassifier {
    committee: LiteralSet,
    uncontroversial: LiteralSet,
    voted_down: LiteralSet,
    passed: LiteralSet,
    did_not_sign: LiteralSet,
    floor_vote: LiteralSet,
    nays: Regex,
}

impl ActionClassifier {
    pub fn new(patterns: &ActionPatterns) -> Result<Self> {
        Ok(Self {
            committee: LiteralSet::new(&patterns.committee)?,
            uncontroversial: LiteralSet::new(&patterns.uncontroversial)?,
            voted_down: LiteralSet::new(&patterns.voted_down)?,
            passed: LiteralSet::new(&patterns.passed)?,
            did_not_sign: LiteralSet::new(&patterns.did_not_sign)?,
            floor_vote: LiteralSet::new(&patterns.floor_vote)?,
            nays: Regex::new(&format!(
                "{}([0-9]+)",
                regex::escape(&patterns.nays_prefix)
            ))?,
        })
    }

    /// Extract the nay count from action text such as `"Passed H., Ayes 90, Nays 0"`
    pub fn parse_nays(&self, text: &str) -> Option<u32> {
        self.nays
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Compute all six outcome tables for a batch of actions.
    ///
    /// Bills may be missing from the batch entirely; they simply do not
    /// appear in any table or in `observed`.
    pub fn classify(&self, actions: &[Action]) -> FlagTables {
        let tables = FlagTables {
            committee: Self::search(actions, &self.committee),
            uncontroversial: Self::search(actions, &self.uncontroversial),
            voted_down: Self::search(actions, &self.voted_down),
            passed: Self::search(actions, &self.passed),
            unanimous: self.unanimity(actions),
            did_not_sign: Self::search(actions, &self.did_not_sign),
            observed: actions.iter().map(Action::key).collect(),
        };

        debug!(
            actions = actions.len(),
            bills = tables.observed.len(),
            committee = tables.committee.len(),
            uncontroversial = tables.uncontroversial.len(),
            voted_down = tables.voted_down.len(),
            passed = tables.passed.len(),
            unanimous = tables.unanimous.rows.len(),
            did_not_sign = tables.did_not_sign.len(),
            "classified actions"
        );

        tables
    }

    fn search(actions: &[Action], set: &LiteralSet) -> FlagTable {
        FlagTable::from_keys(
            actions
                .iter()
                .filter(|action| set.is_match(&action.action))
                .map(Action::key),
        )
    }

    /// AND of `nays == 0` over every floor vote with a recorded tally.
    /// Floor votes without a tally contribute nothing.
    fn unanimity(&self, actions: &[Action]) -> UnanimousTable {
        let mut by_key: BTreeMap<BillKey, bool> = BTreeMap::new();

        for action in actions
            .iter()
            .filter(|action| self.floor_vote.is_match(&action.action))
        {
            let nays = match action.nays.or_else(|| self.parse_nays(&action.action)) {
                Some(nays) => nays,
                None => continue,
            };
            by_key
                .entry(action.key())
                .and_modify(|unanimous| *unanimous = *unanimous && nays == 0)
                .or_insert(nays == 0);
        }

        UnanimousTable {
            rows: by_key.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BillId, Chamber};

    fn hb(number: u32) -> BillId {
        BillId::new(Chamber::House, number)
    }

    fn action(session: u32, bill_id: BillId, text: &str) -> Action {
        Action {
            session,
            bill_id,
            actor: "lower".to_string(),
            action: text.to_string(),
            date: None,
            nays: None,
        }
    }

    fn classifier() -> ActionClassifier {
        ActionClassifier::new(&ActionPatterns::default()).unwrap()
    }

    #[test]
    fn test_parse_nays() {
        let c = classifier();
        assert_eq!(c.parse_nays("Passed H., Ayes 80, Nays 10"), Some(10));
        assert_eq!(c.parse_nays("Passed Senate, Ayes 30, Nays 0"), Some(0));
        assert_eq!(c.parse_nays("Passed H."), None);
    }

    #[test]
    fn test_unanimous_when_every_floor_vote_has_zero_nays() {
        let actions = vec![
            action(111, hb(1), "Passed H., Ayes 90, Nays 0"),
            action(111, hb(1), "Passed Senate, Ayes 30, Nays 0"),
        ];
        let tables = classifier().classify(&actions);
        let key = BillKey::new(111, hb(1));
        assert_eq!(tables.unanimous.get(&key), Some(true));
    }

    #[test]
    fn test_not_unanimous_with_any_nays() {
        let actions = vec![action(111, hb(1), "Passed H., Ayes 80, Nays 10")];
        let tables = classifier().classify(&actions);
        assert_eq!(tables.unanimous.get(&BillKey::new(111, hb(1))), Some(false));

        let actions = vec![
            action(111, hb(1), "Passed H., Ayes 99, Nays 0"),
            action(111, hb(1), "Failed to pass Senate, Ayes 10, Nays 20"),
        ];
        let tables = classifier().classify(&actions);
        assert_eq!(tables.unanimous.get(&BillKey::new(111, hb(1))), Some(false));
    }

    #[test]
    fn test_unanimous_absent_without_floor_votes() {
        let actions = vec![
            action(111, hb(2), "Filed for introduction"),
            action(111, hb(2), "Ref. to Health Committee, Ayes 9, Nays 0"),
        ];
        let tables = classifier().classify(&actions);
        let key = BillKey::new(111, hb(2));
        assert_eq!(tables.unanimous.get(&key), None);
        assert!(tables.observed.contains(&key));
    }

    #[test]
    fn test_floor_vote_without_tally_is_ignored() {
        let actions = vec![
            action(111, hb(3), "Passed H."),
            action(111, hb(3), "Passed Senate, Ayes 33, Nays 0"),
        ];
        let tables = classifier().classify(&actions);
        assert_eq!(tables.unanimous.get(&BillKey::new(111, hb(3))), Some(true));

        let only_untallied = vec![action(111, hb(4), "Passed H.")];
        let tables = classifier().classify(&only_untallied);
        assert!(tables.unanimous.rows.is_empty());
    }

    #[test]
    fn test_duplicate_actions_produce_one_row() {
        let actions = vec![
            action(111, hb(1), "Placed on Senate Consent Calendar"),
            action(111, hb(1), "Placed on Senate Consent Calendar"),
            action(111, hb(1), "H. Placed on Regular Calendar"),
        ];
        let tables = classifier().classify(&actions);
        assert_eq!(tables.committee.rows, vec![BillKey::new(111, hb(1))]);
        assert_eq!(tables.uncontroversial.rows, vec![BillKey::new(111, hb(1))]);
    }

    #[test]
    fn test_returned_without_signature_sets_passed_and_did_not_sign() {
        let actions = vec![action(111, hb(5), "Returned by Governor without signature")];
        let tables = classifier().classify(&actions);
        let key = BillKey::new(111, hb(5));
        assert!(tables.passed.contains(&key));
        assert!(tables.did_not_sign.contains(&key));
        assert!(!tables.voted_down.contains(&key));
    }

    #[test]
    fn test_patterns_are_literal() {
        // "Passed H." must not match "Passed Hx" as a regex dot would
        let actions = vec![action(111, hb(6), "Passed Hx, Ayes 1, Nays 0")];
        let tables = classifier().classify(&actions);
        assert!(tables.unanimous.rows.is_empty());
    }

    #[test]
    fn test_empty_pattern_list_never_matches() {
        let patterns = ActionPatterns {
            voted_down: vec![],
            ..ActionPatterns::default()
        };
        let c = ActionClassifier::new(&patterns).unwrap();
        let tables = c.classify(&[action(111, hb(7), "Failed to pass H.")]);
        assert!(tables.voted_down.is_empty());
    }

    #[test]
    fn test_voted_down_and_sessions_are_separate_keys() {
        let actions = vec![
            action(110, hb(1), "Failed to pass H., Ayes 20, Nays 70"),
            action(111, hb(1), "Signed by Governor."),
        ];
        let tables = classifier().classify(&actions);
        assert_eq!(tables.voted_down.rows, vec![BillKey::new(110, hb(1))]);
        assert_eq!(tables.passed.rows, vec![BillKey::new(111, hb(1))]);
    }
}
