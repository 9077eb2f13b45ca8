//! Operator utility: connect to the roster table and report counts,
//! missing ticket ids, and duplicate canonical keys.

use anyhow::Result;
use rsvp_desk::config::Config;
use rsvp_desk::roster::RosterIndex;
use rsvp_desk::store::{Identity, RosterStore, SurrealStore};
use rsvp_desk::ticket::clean_id;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<()> {
    rsvp_desk::load_env();
    let config = Config::load()?;

    println!(
        "Connecting to SurrealDB at {}...",
        config.system.database_url
    );
    let store = SurrealStore::connect(&config).await?;
    store
        .sign_in(
            &config.runtime.database_user,
            &config.runtime.database_pass,
        )
        .await?;
    println!(
        "Connected to namespace '{}' and database '{}'",
        config.system.database_ns, config.system.database_db
    );

    let docs = store.fetch_roster().await?;
    println!("Fetched {} team documents from {}", docs.len(), store.table());

    let mut key_counts: HashMap<String, usize> = HashMap::new();
    let mut missing_leader_tickets = 0usize;
    let mut missing_member_tickets = 0usize;
    for doc in &docs {
        match doc.ticket_id.as_deref().filter(|t| !t.is_empty()) {
            Some(tid) => *key_counts.entry(clean_id(tid)).or_default() += 1,
            None => missing_leader_tickets += 1,
        }
        for member in &doc.members {
            match member.ticket_id.as_deref().filter(|t| !t.is_empty()) {
                Some(tid) => *key_counts.entry(clean_id(tid)).or_default() += 1,
                None => missing_member_tickets += 1,
            }
        }
    }

    let index = RosterIndex::build(docs);
    let stats = index.stats();
    println!(
        "Indexed {} attendees ({} checked in), {} unique keys",
        stats.total,
        stats.checked_in,
        index.len()
    );
    println!(
        "Skipped: {} leaders and {} members without ticket ids",
        missing_leader_tickets, missing_member_tickets
    );

    let mut duplicates: Vec<(&String, &usize)> =
        key_counts.iter().filter(|&(_, &count)| count > 1).collect();
    duplicates.sort();
    if duplicates.is_empty() {
        println!("No duplicate ticket keys");
    } else {
        println!("Duplicate ticket keys (last-seen-wins in the index):");
        for (key, count) in duplicates {
            println!("  {} x{}", key, count);
        }
    }

    Ok(())
}
