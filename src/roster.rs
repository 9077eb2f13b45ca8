//! Roster indexing: flattening nested team documents into a searchable,
//! uniquely-keyed check-in index plus its display projection

use crate::store::{CheckInPatch, PendingWrite, UpdateTarget};
use crate::ticket;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use surrealdb::sql::Datetime;

/// Check-in status as stored on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AttendeeStatus {
    #[default]
    Pending,
    CheckedIn,
}

impl AttendeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeStatus::Pending => "pending",
            AttendeeStatus::CheckedIn => "checked-in",
        }
    }

    /// Anything that is not literally "checked-in" counts as pending
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("checked-in") => AttendeeStatus::CheckedIn,
            _ => AttendeeStatus::Pending,
        }
    }
}

/// One member sub-record inside a team document. Sequence position is
/// meaningful: it addresses updates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<Datetime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_number: Option<u32>,
    /// Fields the console does not model survive read-modify-write untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One team document as fetched from the roster table: optional leader
/// fields plus an ordered member sequence
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeamDoc {
    #[serde(default, deserialize_with = "crate::store::deserialize_thing_to_string")]
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub team: Option<String>,
    pub ticket_id: Option<String>,
    pub status: Option<String>,
    pub checked_in: Option<bool>,
    pub check_in_time: Option<Datetime>,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// Flattened projection of a team leader or one member sub-record
#[derive(Debug, Clone, PartialEq)]
pub struct Attendee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: String,
    pub team: Option<String>,
    pub status: AttendeeStatus,
    pub checked_in: bool,
    pub check_in_time: Option<Datetime>,
    pub ticket_id: String,
    /// Absent means team leader
    pub member_number: Option<u32>,
}

impl Attendee {
    pub fn is_leader(&self) -> bool {
        self.member_number.is_none()
    }

    pub fn role_label(&self) -> &'static str {
        if self.is_leader() { "LEADER" } else { "MEMBER" }
    }
}

/// One lookup-index slot: where the attendee lives in the remote store
/// and its current local projection
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub doc_id: String,
    /// None addresses the leader fields, Some(i) addresses members[i]
    pub member_slot: Option<usize>,
    pub attendee: Attendee,
}

/// Aggregate counts shown in the console header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterStats {
    pub total: usize,
    pub checked_in: usize,
}

/// Session-owned check-in state: the lookup index, its read-optimized
/// display list, and the aggregate counters
#[derive(Debug, Default)]
pub struct RosterIndex {
    entries: HashMap<String, IndexEntry>,
    list: Vec<Attendee>,
    stats: RosterStats,
}

impl RosterIndex {
    /// Build the flat index from a full fetch.
    ///
    /// Leaders and members without a ticket id are skipped entirely. A
    /// duplicate canonical key silently overwrites the prior entry
    /// (last-seen-wins) while keeping its first-seen list position; the
    /// counters still count every occurrence.
    pub fn build(docs: Vec<TeamDoc>) -> Self {
        let mut entries: HashMap<String, IndexEntry> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut stats = RosterStats::default();

        for doc in &docs {
            if let Some(tid) = doc.ticket_id.as_deref().filter(|t| !t.is_empty()) {
                stats.total += 1;
                if doc.checked_in == Some(true) {
                    stats.checked_in += 1;
                }
                let entry = IndexEntry {
                    doc_id: doc.id.clone(),
                    member_slot: None,
                    attendee: Attendee {
                        name: doc.name.clone().unwrap_or_default(),
                        email: doc.email.clone().unwrap_or_default(),
                        phone: doc.phone.clone().unwrap_or_default(),
                        college: doc.college.clone().unwrap_or_default(),
                        team: doc.team.clone(),
                        status: AttendeeStatus::from_wire(doc.status.as_deref()),
                        checked_in: doc.checked_in.unwrap_or(false),
                        check_in_time: doc.check_in_time.clone(),
                        ticket_id: tid.to_string(),
                        member_number: None,
                    },
                };
                let key = ticket::clean_id(tid);
                if entries.insert(key.clone(), entry).is_none() {
                    order.push(key);
                }
            }

            for (slot, member) in doc.members.iter().enumerate() {
                let Some(tid) = member.ticket_id.as_deref().filter(|t| !t.is_empty()) else {
                    continue;
                };
                stats.total += 1;
                if member.checked_in == Some(true) {
                    stats.checked_in += 1;
                }
                let entry = IndexEntry {
                    doc_id: doc.id.clone(),
                    member_slot: Some(slot),
                    attendee: Attendee {
                        name: member.name.clone().unwrap_or_default(),
                        email: member.email.clone().unwrap_or_default(),
                        phone: member.phone.clone().unwrap_or_default(),
                        // Member college falls back to the team's
                        college: member
                            .college
                            .clone()
                            .or_else(|| doc.college.clone())
                            .unwrap_or_default(),
                        team: doc.team.clone(),
                        status: AttendeeStatus::from_wire(member.status.as_deref()),
                        checked_in: member.checked_in.unwrap_or(false),
                        check_in_time: member.check_in_time.clone(),
                        ticket_id: tid.to_string(),
                        member_number: member.member_number,
                    },
                };
                let key = ticket::clean_id(tid);
                if entries.insert(key.clone(), entry).is_none() {
                    order.push(key);
                }
            }
        }

        let mut list: Vec<Attendee> = order
            .iter()
            .filter_map(|key| entries.get(key))
            .map(|entry| entry.attendee.clone())
            .collect();
        list.sort_by(compare_for_display);

        Self {
            entries,
            list,
            stats,
        }
    }

    pub fn stats(&self) -> RosterStats {
        self.stats
    }

    pub fn list(&self) -> &[Attendee] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Resolve a raw scan to a canonical key.
    ///
    /// Direct trim-and-uppercase is tried first as the fast path; on a
    /// miss the full heuristic pipeline runs and the lookup is retried.
    /// The error value carries the attempted key for operator feedback.
    pub fn resolve(&self, raw: &str, event_prefix: &str) -> std::result::Result<String, String> {
        let direct = ticket::clean_id(raw);
        if self.entries.contains_key(&direct) {
            return Ok(direct);
        }
        let parsed = ticket::parse_scanned_text(raw, event_prefix);
        if self.entries.contains_key(&parsed) {
            Ok(parsed)
        } else {
            Err(parsed)
        }
    }

    /// Apply a check-in/undo transition locally and return the addressed
    /// remote write it requires.
    ///
    /// Mutates the index entry, the display list, and the counters in one
    /// step; returns None for an unknown key.
    pub fn apply_transition(
        &mut self,
        key: &str,
        checked_in: bool,
        when: Option<Datetime>,
    ) -> Option<PendingWrite> {
        let status = if checked_in {
            AttendeeStatus::CheckedIn
        } else {
            AttendeeStatus::Pending
        };

        let entry = self.entries.get_mut(key)?;
        let was_checked_in = entry.attendee.checked_in;
        entry.attendee.checked_in = checked_in;
        entry.attendee.check_in_time = when.clone();
        entry.attendee.status = status;
        let target = UpdateTarget {
            doc_id: entry.doc_id.clone(),
            member_slot: entry.member_slot,
        };

        if checked_in && !was_checked_in {
            self.stats.checked_in += 1;
        } else if !checked_in && was_checked_in {
            self.stats.checked_in = self.stats.checked_in.saturating_sub(1);
        }

        // The display list mirrors the entry; order is left as-is until
        // the next full rebuild
        for item in self
            .list
            .iter_mut()
            .filter(|a| ticket::clean_id(&a.ticket_id) == key)
        {
            item.checked_in = checked_in;
            item.check_in_time = when.clone();
            item.status = status;
        }

        Some(PendingWrite {
            target,
            patch: CheckInPatch {
                checked_in,
                check_in_time: when,
                status,
            },
        })
    }

    /// Case-insensitive substring filter over ticket id, name, and team.
    ///
    /// A missing team is treated as non-matching. The empty query returns
    /// the full display list in order.
    pub fn filter(&self, query: &str) -> Vec<&Attendee> {
        let q = query.to_lowercase();
        self.list
            .iter()
            .filter(|a| {
                a.ticket_id.to_lowercase().contains(&q)
                    || a.name.to_lowercase().contains(&q)
                    || a.team
                        .as_ref()
                        .is_some_and(|t| t.to_lowercase().contains(&q))
            })
            .collect()
    }
}

/// Recent check-ins float to the top (timestamp seconds, descending);
/// everything else keeps stable relative order
fn compare_for_display(a: &Attendee, b: &Attendee) -> Ordering {
    match (a.checked_in, b.checked_in) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => {
            let ta = a.check_in_time.as_ref().map_or(0, |t| t.timestamp());
            let tb = b.check_in_time.as_ref().map_or(0, |t| t.timestamp());
            tb.cmp(&ta)
        }
        (false, false) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(secs: i64) -> Datetime {
        Datetime::from(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn member(ticket: Option<&str>, checked_in: bool) -> Member {
        Member {
            name: Some("member".into()),
            ticket_id: ticket.map(str::to_string),
            checked_in: Some(checked_in),
            member_number: Some(1),
            ..Member::default()
        }
    }

    fn team(id: &str, leader_ticket: Option<&str>, members: Vec<Member>) -> TeamDoc {
        TeamDoc {
            id: id.to_string(),
            name: Some("leader".into()),
            college: Some("Team College".into()),
            team: Some("Rustaceans".into()),
            ticket_id: leader_ticket.map(str::to_string),
            checked_in: Some(false),
            members,
            ..TeamDoc::default()
        }
    }

    #[test]
    fn build_counts_and_keys() {
        let doc = team(
            "t1",
            Some("L1"),
            vec![member(Some("M1"), true), member(None, false)],
        );
        let index = RosterIndex::build(vec![doc]);

        assert_eq!(index.stats(), RosterStats { total: 2, checked_in: 1 });
        assert_eq!(index.len(), 2);
        assert!(index.entry("L1").is_some());
        assert!(index.entry("M1").is_some());
    }

    #[test]
    fn member_inherits_team_and_college() {
        let mut with_college = member(Some("M1"), false);
        with_college.college = Some("Own College".into());
        let doc = team("t1", None, vec![with_college, member(Some("M2"), false)]);
        let index = RosterIndex::build(vec![doc]);

        let own = &index.entry("M1").unwrap().attendee;
        assert_eq!(own.college, "Own College");
        let inherited = &index.entry("M2").unwrap().attendee;
        assert_eq!(inherited.college, "Team College");
        assert_eq!(inherited.team.as_deref(), Some("Rustaceans"));
        assert_eq!(inherited.member_number, Some(1));
        assert!(!inherited.is_leader());
    }

    #[test]
    fn member_slot_addresses_position_not_number() {
        let doc = team(
            "t1",
            None,
            vec![member(None, false), member(Some("M9"), false)],
        );
        let index = RosterIndex::build(vec![doc]);
        assert_eq!(index.entry("M9").unwrap().member_slot, Some(1));
    }

    #[test]
    fn duplicate_key_last_seen_wins_but_counts_both() {
        let a = team("t1", Some("DUP"), vec![]);
        let mut b = team("t2", Some("dup "), vec![]);
        b.name = Some("second".into());
        let index = RosterIndex::build(vec![a, b]);

        assert_eq!(index.stats().total, 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entry("DUP").unwrap().doc_id, "t2");
        // Collapsed in the list too
        assert_eq!(index.list().len(), 1);
    }

    #[test]
    fn display_sort_recent_checkins_first() {
        let mut early = team("t1", Some("A1"), vec![]);
        early.checked_in = Some(true);
        early.check_in_time = Some(ts(100));
        let mut late = team("t2", Some("B2"), vec![]);
        late.checked_in = Some(true);
        late.check_in_time = Some(ts(200));
        let pending = team("t3", Some("C3"), vec![]);
        let mut untimed = team("t4", Some("D4"), vec![]);
        untimed.checked_in = Some(true);

        let index = RosterIndex::build(vec![pending, early, late, untimed]);
        let order: Vec<&str> = index.list().iter().map(|a| a.ticket_id.as_str()).collect();
        // Timestamped check-ins lead newest-first, the untimed check-in
        // sorts like seconds 0, pending entries trail
        assert_eq!(order, vec!["B2", "A1", "D4", "C3"]);
    }

    #[test]
    fn resolve_fast_path_then_heuristic() {
        let index = RosterIndex::build(vec![team("t1", Some("ABC123"), vec![])]);
        assert_eq!(index.resolve(" abc123 ", "IFI2026").unwrap(), "ABC123");
        assert_eq!(
            index.resolve("IFI2026-ABC123", "IFI2026").unwrap(),
            "ABC123"
        );
        assert_eq!(
            index.resolve("IFI2026-NOPE", "IFI2026").unwrap_err(),
            "NOPE"
        );
    }

    #[test]
    fn transition_updates_entry_list_and_stats() {
        let doc = team("t1", Some("L1"), vec![member(Some("M1"), false)]);
        let mut index = RosterIndex::build(vec![doc]);

        let write = index.apply_transition("M1", true, Some(ts(500))).unwrap();
        assert_eq!(
            write.target,
            UpdateTarget {
                doc_id: "t1".into(),
                member_slot: Some(0),
            }
        );
        assert!(write.patch.checked_in);
        assert_eq!(write.patch.status, AttendeeStatus::CheckedIn);

        assert_eq!(index.stats().checked_in, 1);
        let entry = index.entry("M1").unwrap();
        assert!(entry.attendee.checked_in);
        assert_eq!(entry.attendee.status, AttendeeStatus::CheckedIn);
        let listed = index.list().iter().find(|a| a.ticket_id == "M1").unwrap();
        assert!(listed.checked_in);
        assert_eq!(listed.check_in_time, Some(ts(500)));
    }

    #[test]
    fn undo_clears_time_and_decrements() {
        let mut checked = team("t1", Some("L1"), vec![]);
        checked.checked_in = Some(true);
        checked.check_in_time = Some(ts(100));
        let mut index = RosterIndex::build(vec![checked]);
        assert_eq!(index.stats().checked_in, 1);

        let write = index.apply_transition("L1", false, None).unwrap();
        assert_eq!(write.target.member_slot, None);
        assert!(!write.patch.checked_in);
        assert_eq!(write.patch.check_in_time, None);
        assert_eq!(write.patch.status, AttendeeStatus::Pending);
        assert_eq!(index.stats().checked_in, 0);
        assert_eq!(index.entry("L1").unwrap().attendee.check_in_time, None);
    }

    #[test]
    fn transition_on_unknown_key_is_none() {
        let mut index = RosterIndex::build(vec![team("t1", Some("L1"), vec![])]);
        assert!(index.apply_transition("NOPE", true, None).is_none());
        assert_eq!(index.stats().checked_in, 0);
    }

    #[test]
    fn filter_matches_ticket_name_and_team() {
        let mut doc = team("t1", Some("ABC123"), vec![member(Some("M1"), false)]);
        doc.name = Some("Ada Lovelace".into());
        let mut no_team = team("t2", Some("Z9"), vec![]);
        no_team.team = None;
        no_team.name = Some("Solo".into());
        let index = RosterIndex::build(vec![doc, no_team]);

        assert_eq!(index.filter("abc1").len(), 1);
        assert_eq!(index.filter("ADA").len(), 1);
        assert_eq!(index.filter("rustace").len(), 2);
        // Absent team never matches rather than erroring
        assert_eq!(index.filter("Solo").len(), 1);
        assert!(index.filter("zzz").is_empty());
    }

    #[test]
    fn empty_filter_returns_full_list_in_order() {
        let index = RosterIndex::build(vec![
            team("t1", Some("A1"), vec![]),
            team("t2", Some("B2"), vec![]),
        ]);
        let full = index.filter("");
        assert_eq!(full.len(), index.list().len());
        for (filtered, listed) in full.iter().zip(index.list()) {
            assert_eq!(filtered.ticket_id, listed.ticket_id);
        }
    }
}
