//! User command - inspect or edit passport and favourite lists.

use super::{format_timestamp, summary_line};
use crate::app::App;
use crate::{ListOp, OutputFormat, UserAction};
use artpass_core::{Collection, Config, Entry, EventRecord, UserStore};

/// Run the user command.
pub fn run(config: Config, uid: &str, action: UserAction, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);
    let users = app.users()?;

    match action {
        UserAction::Show => {
            let profile = users.profile(uid);
            match output {
                OutputFormat::Text => {
                    println!("User {}", profile.uid);
                    print_entries(Collection::Passport, &profile.passport);
                    print_entries(Collection::Favourite, &profile.favourite);
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&profile)?);
                }
            }
            Ok(())
        }
        UserAction::Passport { op } => run_list(&app, &users, uid, Collection::Passport, op, output),
        UserAction::Favourite { op } => {
            run_list(&app, &users, uid, Collection::Favourite, op, output)
        }
    }
}

fn run_list(
    app: &App,
    users: &UserStore,
    uid: &str,
    collection: Collection,
    op: ListOp,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match op {
        ListOp::List => {
            let entries = users.entries(uid, collection);
            let mut resolved = Vec::with_capacity(entries.len());
            for entry in &entries {
                resolved.push(app.events.by_id(&entry.event_id)?);
            }

            match output {
                OutputFormat::Text => {
                    for (entry, event) in entries.iter().zip(&resolved) {
                        println!("{}", entry_line(entry, event.as_ref()));
                    }
                    eprintln!();
                    eprintln!("{} entries in {}", entries.len(), collection);
                }
                OutputFormat::Json => {
                    let listed: Vec<serde_json::Value> = entries
                        .iter()
                        .zip(&resolved)
                        .map(|(entry, event)| entry_json(entry, event.as_ref(), app.base_url()))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&listed)?);
                }
            }
            Ok(())
        }
        ListOp::Add { event_id } => {
            if !app.events.contains(&event_id)? {
                anyhow::bail!("Event not found: {}", event_id);
            }

            let outcome = users.add(uid, collection, &event_id)?;

            match output {
                OutputFormat::Text => {
                    let verb = if outcome.added { "Added" } else { "Already in" };
                    println!(
                        "{} {}: {} ({})",
                        verb,
                        collection,
                        outcome.entry.event_id,
                        format_timestamp(outcome.entry.added_at)
                    );
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
            }
            Ok(())
        }
        ListOp::Remove { event_id } => {
            if !users.remove(uid, collection, &event_id)? {
                anyhow::bail!("Event {} is not in {} of user {}", event_id, collection, uid);
            }

            match output {
                OutputFormat::Text => println!("Removed from {}: {}", collection, event_id),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "removed": true, "event_id": event_id })
                ),
            }
            Ok(())
        }
    }
}

fn print_entries(collection: Collection, entries: &[Entry]) {
    println!();
    println!("{} ({}):", collection, entries.len());
    for entry in entries {
        println!("  {}  {}", format_timestamp(entry.added_at), entry.event_id);
    }
}

/// Stored entry with the event it points at, if the index still has it.
fn entry_line(entry: &Entry, event: Option<&EventRecord>) -> String {
    let detail = match event {
        Some(event) => summary_line(event),
        None => format!("{}  (not in index)", entry.event_id),
    };
    format!("added {}  {}", format_timestamp(entry.added_at), detail)
}

fn entry_json(entry: &Entry, event: Option<&EventRecord>, base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "event_id": entry.event_id,
        "added_at": entry.added_at,
        "event": event.map(|e| e.render(base_url)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(event_id: &str) -> Entry {
        Entry {
            event_id: event_id.to_string(),
            added_at: 0,
        }
    }

    #[test]
    fn test_entry_line_keeps_missing_events() {
        assert_eq!(
            entry_line(&entry("gone"), None),
            "added 1970-01-01 00:00  gone  (not in index)"
        );
    }

    #[test]
    fn test_entry_line_with_event() {
        let event = EventRecord::from_value(json!({"event_id": "e1", "title": "Expo"}));
        let line = entry_line(&entry("e1"), Some(&event));
        assert!(line.starts_with("added 1970-01-01 00:00  "));
        assert!(line.contains("e1  Expo"));
    }

    #[test]
    fn test_entry_json() {
        let event = EventRecord::from_value(json!({
            "event_id": "e1",
            "local_image_path": "output/images/e1.jpg"
        }));

        let listed = entry_json(&entry("e1"), Some(&event), "http://localhost:8000");
        assert_eq!(listed["added_at"], 0);
        assert_eq!(listed["event"]["event_id"], "e1");
        assert_eq!(listed["event"]["image_url"], "http://localhost:8000/images/e1.jpg");

        let missing = entry_json(&entry("gone"), None, "http://localhost:8000");
        assert_eq!(missing["event_id"], "gone");
        assert!(missing["event"].is_null());
    }
}
