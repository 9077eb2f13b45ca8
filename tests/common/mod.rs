//! Shared fixtures: an in-memory backend and sample roster documents

#![allow(dead_code)]

use async_trait::async_trait;
use rsvp_desk::error::{DeskError, Result};
use rsvp_desk::store::{CheckInPatch, Identity, RosterStore, UpdateTarget};
use rsvp_desk::roster::{Member, TeamDoc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory stand-in for the document store and identity provider;
/// addressed updates are applied to its documents like the real store
pub struct MemoryBackend {
    docs: Mutex<Vec<TeamDoc>>,
    pub updates: Mutex<Vec<(UpdateTarget, CheckInPatch)>>,
    pub fail_updates: AtomicBool,
    password: String,
}

impl MemoryBackend {
    pub fn new(docs: Vec<TeamDoc>) -> Self {
        Self {
            docs: Mutex::new(docs),
            updates: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
            password: "hunter2".to_string(),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Snapshot of one stored document
    pub fn doc(&self, doc_id: &str) -> Option<TeamDoc> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == doc_id)
            .cloned()
    }
}

#[async_trait]
impl Identity for MemoryBackend {
    async fn sign_in(&self, _email: &str, password: &str) -> Result<()> {
        if password == self.password {
            Ok(())
        } else {
            Err(DeskError::Auth {
                message: "permission denied for record access".into(),
            })
        }
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RosterStore for MemoryBackend {
    async fn fetch_roster(&self) -> Result<Vec<TeamDoc>> {
        Ok(self.docs.lock().unwrap().clone())
    }

    async fn update_attendee(&self, target: &UpdateTarget, patch: &CheckInPatch) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DeskError::Database {
                message: "websocket closed".into(),
            });
        }

        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .iter_mut()
            .find(|d| d.id == target.doc_id)
            .ok_or_else(|| DeskError::Database {
                message: format!("document {} not found", target.doc_id),
            })?;
        match target.member_slot {
            None => {
                doc.checked_in = Some(patch.checked_in);
                doc.check_in_time = patch.check_in_time.clone();
                doc.status = Some(patch.status.as_str().to_string());
            }
            Some(slot) => {
                let member = doc.members.get_mut(slot).ok_or_else(|| DeskError::Database {
                    message: format!("member slot {slot} out of range"),
                })?;
                member.checked_in = Some(patch.checked_in);
                member.check_in_time = patch.check_in_time.clone();
                member.status = Some(patch.status.as_str().to_string());
            }
        }

        self.updates
            .lock()
            .unwrap()
            .push((target.clone(), patch.clone()));
        Ok(())
    }
}

pub fn member(name: &str, ticket: &str, number: u32) -> Member {
    Member {
        name: Some(name.to_string()),
        email: Some(format!("{}@example.org", name.to_lowercase())),
        ticket_id: Some(ticket.to_string()),
        checked_in: Some(false),
        member_number: Some(number),
        ..Member::default()
    }
}

/// Two teams: a solo leader and a leader with two members, one of the
/// members without a ticket id
pub fn sample_docs() -> Vec<TeamDoc> {
    vec![
        TeamDoc {
            id: "team_one".into(),
            name: Some("Ada".into()),
            college: Some("Analytical Engine".into()),
            team: Some("Difference".into()),
            ticket_id: Some("A1".into()),
            checked_in: Some(false),
            ..TeamDoc::default()
        },
        TeamDoc {
            id: "team_two".into(),
            name: Some("Grace".into()),
            college: Some("Harvard".into()),
            team: Some("Compilers".into()),
            ticket_id: Some("B1".into()),
            checked_in: Some(false),
            members: vec![member("Edsger", "B2", 1), {
                let mut no_ticket = member("Tony", "", 2);
                no_ticket.ticket_id = None;
                no_ticket
            }],
            ..TeamDoc::default()
        },
    ]
}
