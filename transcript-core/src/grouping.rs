// Turn grouping
// Partitions a time-ordered record batch into runs of adjacent records that
// share a role and a one-second creation bucket

use chrono::{DateTime, Utc};

use crate::types::{RawRecord, Role};

const BUCKET_MILLIS: i64 = 1000;

/// Grouping key of a record: its role plus the second it was created in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnKey {
    pub role: Role,
    /// `floor(created_at_ms / 1000)`
    pub bucket: i64,
}

impl TurnKey {
    pub fn of(record: &RawRecord) -> Self {
        TurnKey {
            role: record.role,
            bucket: bucket_of(record.created_at),
        }
    }
}

pub fn bucket_of(created_at: DateTime<Utc>) -> i64 {
    created_at.timestamp_millis().div_euclid(BUCKET_MILLIS)
}

/// A maximal adjacent run of records with the same [`TurnKey`]
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    key: TurnKey,
    records: Vec<RawRecord>,
}

impl Turn {
    fn open(record: RawRecord) -> Self {
        Turn {
            key: TurnKey::of(&record),
            records: vec![record],
        }
    }

    pub fn key(&self) -> TurnKey {
        self.key
    }

    pub fn role(&self) -> Role {
        self.key.role
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Earliest record of the turn; a turn is never empty
    pub fn first(&self) -> &RawRecord {
        &self.records[0]
    }
}

/// Group records into turns by adjacency.
///
/// Two records only share a turn when nothing with a different key sits
/// between them, even if their keys are equal.
pub fn group_turns(records: Vec<RawRecord>) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();

    for record in records {
        match turns.last_mut() {
            Some(turn) if turn.key == TurnKey::of(&record) => turn.records.push(record),
            _ => turns.push(Turn::open(record)),
        }
    }

    for turn in &mut turns {
        turn.records.sort_by_key(|r| r.created_at);
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, role: Role, millis: i64) -> RawRecord {
        RawRecord {
            id: id.to_string(),
            task_id: "task-1".to_string(),
            role,
            content: json!(id),
            created_at: DateTime::<Utc>::from_timestamp_millis(millis).unwrap(),
        }
    }

    fn ids(turn: &Turn) -> Vec<&str> {
        turn.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_merges_adjacent_records_in_same_bucket() {
        let turns = group_turns(vec![
            record("a", Role::User, 1_000),
            record("b", Role::Assistant, 2_100),
            record("c", Role::Assistant, 2_900),
            record("d", Role::Assistant, 3_000),
        ]);

        assert_eq!(turns.len(), 3);
        assert_eq!(ids(&turns[0]), vec!["a"]);
        assert_eq!(ids(&turns[1]), vec!["b", "c"]);
        assert_eq!(ids(&turns[2]), vec!["d"]);
        assert_eq!(turns[1].role(), Role::Assistant);
        assert_eq!(turns[1].first().id, "b");
        assert_eq!(turns[1].key(), TurnKey { role: Role::Assistant, bucket: 2 });
        assert_eq!(turns[2].key().bucket, 3);
    }

    #[test]
    fn test_role_change_splits_same_bucket() {
        let turns = group_turns(vec![
            record("a", Role::User, 5_000),
            record("b", Role::Assistant, 5_001),
        ]);
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn test_intervening_record_prevents_merge() {
        // a and c share role and bucket but b (different role) sits between them
        let turns = group_turns(vec![
            record("a", Role::Assistant, 7_100),
            record("b", Role::User, 7_200),
            record("c", Role::Assistant, 7_300),
        ]);

        assert_eq!(turns.len(), 3);
        assert_eq!(ids(&turns[0]), vec!["a"]);
        assert_eq!(ids(&turns[2]), vec!["c"]);
    }

    #[test]
    fn test_records_within_turn_are_sorted() {
        let turns = group_turns(vec![
            record("late", Role::User, 9_800),
            record("early", Role::User, 9_200),
        ]);
        assert_eq!(turns.len(), 1);
        assert_eq!(ids(&turns[0]), vec!["early", "late"]);
        assert_eq!(turns[0].first().id, "early");
    }

    #[test]
    fn test_bucket_floors_negative_timestamps() {
        let before_epoch = DateTime::<Utc>::from_timestamp_millis(-1).unwrap();
        assert_eq!(bucket_of(before_epoch), -1);
        assert_eq!(bucket_of(DateTime::<Utc>::from_timestamp_millis(999).unwrap()), 0);
    }

    #[test]
    fn test_empty_input_yields_no_turns() {
        assert!(group_turns(Vec::new()).is_empty());
    }
}
