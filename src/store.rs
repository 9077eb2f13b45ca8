//! Storage and identity seams plus their SurrealDB implementation.
//!
//! The reconciler only ever issues an addressed update: document id plus
//! an optional member position. How that lands on the wire is this
//! module's business — the document store cannot address sub-records, so
//! a member update is a read-modify-write of the whole member sequence.
//! A backend with row-level update capability could be swapped in
//! without touching the reconciler.

use crate::config::Config;
use crate::error::{DeskError, Result};
use crate::roster::{AttendeeStatus, Member, TeamDoc};
use async_trait::async_trait;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::sql::Datetime;
use tracing::{info, warn};

/// Custom deserializer for SurrealDB Thing to String
pub fn deserialize_thing_to_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;

    // Handle both String and Thing types
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Object(obj) => {
            let Some(id) = obj.get("id") else {
                return Err(D::Error::custom("Missing id field"));
            };
            if let Some(s) = id.as_str() {
                Ok(s.to_string())
            } else if let Some(inner) = id
                .as_object()
                .and_then(|o| o.get("String"))
                .and_then(|v| v.as_str())
            {
                Ok(inner.to_string())
            } else {
                Ok(id.to_string())
            }
        }
        _ => Err(D::Error::custom("Invalid id type")),
    }
}

/// The fields one check-in/undo transition touches
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInPatch {
    pub checked_in: bool,
    pub check_in_time: Option<Datetime>,
    pub status: AttendeeStatus,
}

/// Where a check-in update lands in the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub doc_id: String,
    /// None addresses the leader fields, Some(i) addresses members[i]
    pub member_slot: Option<usize>,
}

/// A remote write owed after a local transition
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub target: UpdateTarget,
    pub patch: CheckInPatch,
}

/// Document store seam: fetch-all plus addressed check-in updates
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<TeamDoc>>;
    async fn update_attendee(&self, target: &UpdateTarget, patch: &CheckInPatch) -> Result<()>;
}

/// Identity provider seam
#[async_trait]
pub trait Identity: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<()>;
    async fn sign_out(&self) -> Result<()>;
}

/// SurrealDB-backed roster store and identity provider
pub struct SurrealStore {
    db: Surreal<Client>,
    table: String,
}

impl SurrealStore {
    /// Connect to the SurrealDB service and select namespace/database.
    /// Credentials are not presented here; that happens at operator
    /// sign-in through the `Identity` trait.
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Connecting to SurrealDB service via WebSocket");

        // Normalize URL for SurrealDB Ws engine (expects host:port, no scheme)
        fn normalize_ws_url(s: &str) -> String {
            s.strip_prefix("ws://")
                .or_else(|| s.strip_prefix("wss://"))
                .or_else(|| s.strip_prefix("http://"))
                .or_else(|| s.strip_prefix("https://"))
                .unwrap_or(s)
                .to_string()
        }

        let url = normalize_ws_url(&config.system.database_url);
        let max_retries = if config.runtime.db_reconnect { 5 } else { 0 };

        let mut db = None;
        for attempt in 0..=max_retries {
            match Surreal::new::<Ws>(url.clone()).await {
                Ok(conn) => {
                    if attempt > 0 {
                        info!(
                            "Successfully reconnected to SurrealDB after {} attempts",
                            attempt + 1
                        );
                    }
                    db = Some(conn);
                    break;
                }
                Err(e) => {
                    if attempt == max_retries {
                        return Err(DeskError::Database {
                            message: format!(
                                "Failed to connect to SurrealDB at {} after {} attempts: {}",
                                config.system.database_url,
                                max_retries + 1,
                                e
                            ),
                        });
                    }
                    let delay_ms = (1000 * (1u64 << attempt.min(5))).min(60000);
                    warn!(
                        "SurrealDB connection attempt {} failed: {}. Retrying in {}ms...",
                        attempt + 1,
                        e,
                        delay_ms
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
        }

        let db = db.ok_or_else(|| DeskError::Internal {
            message: "database handle missing after connect loop".into(),
        })?;

        db.use_ns(&config.system.database_ns)
            .use_db(&config.system.database_db)
            .await
            .map_err(|e| DeskError::Database {
                message: format!(
                    "Failed to select namespace '{}' / database '{}': {}",
                    config.system.database_ns, config.system.database_db, e
                ),
            })?;

        Ok(Self {
            db,
            table: config.event.roster_table.clone(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Current member sequence of one document, for read-modify-write
    async fn read_members(&self, doc_id: &str) -> Result<Vec<Member>> {
        let mut response = self
            .db
            .query("SELECT VALUE members FROM type::thing($tb, $id)")
            .bind(("tb", self.table.clone()))
            .bind(("id", doc_id.to_string()))
            .await
            .map_err(|e| DeskError::Database {
                message: e.to_string(),
            })?;
        let mut rows: Vec<Option<Vec<Member>>> =
            response.take(0).map_err(|e| DeskError::Database {
                message: e.to_string(),
            })?;
        match rows.pop() {
            Some(members) => Ok(members.unwrap_or_default()),
            None => Err(DeskError::Database {
                message: format!("document {doc_id} not found"),
            }),
        }
    }
}

#[async_trait]
impl Identity for SurrealStore {
    async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        self.db
            .signin(Root {
                username: email,
                password,
            })
            .await
            .map_err(|e| DeskError::Auth {
                message: e.to_string(),
            })?;
        info!("Signed in as {}", email);
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.db.invalidate().await.map_err(|e| DeskError::Auth {
            message: format!("sign-out failed: {}", e),
        })?;
        info!("Session invalidated");
        Ok(())
    }
}

#[async_trait]
impl RosterStore for SurrealStore {
    async fn fetch_roster(&self) -> Result<Vec<TeamDoc>> {
        let mut response = self
            .db
            .query("SELECT * FROM type::table($tb)")
            .bind(("tb", self.table.clone()))
            .await
            .map_err(|e| DeskError::Database {
                message: e.to_string(),
            })?;
        let docs: Vec<TeamDoc> = response.take(0).map_err(|e| DeskError::Database {
            message: e.to_string(),
        })?;
        info!("Fetched {} team documents from {}", docs.len(), self.table);
        Ok(docs)
    }

    async fn update_attendee(&self, target: &UpdateTarget, patch: &CheckInPatch) -> Result<()> {
        let query = match target.member_slot {
            None => self
                .db
                .query(
                    "UPDATE type::thing($tb, $id) MERGE { checkedIn: $checked_in, \
                     checkInTime: $check_in_time, status: $status } RETURN meta::id(id) AS id",
                )
                .bind(("tb", self.table.clone()))
                .bind(("id", target.doc_id.clone()))
                .bind(("checked_in", patch.checked_in))
                .bind(("check_in_time", patch.check_in_time.clone()))
                .bind(("status", patch.status.as_str())),
            Some(slot) => {
                let mut members = self.read_members(&target.doc_id).await?;
                let member = members.get_mut(slot).ok_or_else(|| DeskError::Database {
                    message: format!(
                        "member slot {} out of range for document {}",
                        slot, target.doc_id
                    ),
                })?;
                member.checked_in = Some(patch.checked_in);
                member.check_in_time = patch.check_in_time.clone();
                member.status = Some(patch.status.as_str().to_string());

                self.db
                    .query(
                        "UPDATE type::thing($tb, $id) MERGE { members: $members } \
                         RETURN meta::id(id) AS id",
                    )
                    .bind(("tb", self.table.clone()))
                    .bind(("id", target.doc_id.clone()))
                    .bind(("members", members))
            }
        };

        let mut response = query.await.map_err(|e| DeskError::Database {
            message: e.to_string(),
        })?;
        let _: Vec<serde_json::Value> = response.take(0).map_err(|e| DeskError::Database {
            message: e.to_string(),
        })?;
        Ok(())
    }
}
