//! The client's menu hierarchy.
//!
//! A failed action never leaves the loop: it logs and the menu
//! redisplays. Only the reserved exit entry ends a menu.

use crate::client::Client;
use crate::menu::{Menu, MenuItem, MenuOutcome};

/// Documents created per batch by the create action.
const CREATE_BATCH: usize = 6;

/// Builds the main menu.
pub fn main_menu() -> Menu<Client> {
    Menu::new("Main Menu", "Exit", |client: &Client| {
        vec![
            MenuItem::new(
                format!(
                    "Choose the working collection (`{}`)",
                    client.selected_name()
                ),
                |client: &mut Client, console| {
                    collection_menu().show(client, console);
                    MenuOutcome::Continue
                },
            ),
            MenuItem::new("CRUD operations on documents", |client: &mut Client, console| {
                crud_menu().show(client, console);
                MenuOutcome::Continue
            }),
            MenuItem::new("List all documents", |client: &mut Client, _| {
                if let Err(error) = client.print_all() {
                    tracing::error!(%error, "error listing documents");
                }
                MenuOutcome::Continue
            }),
            MenuItem::new("Count documents in the local store", |client: &mut Client, _| {
                match client.count_per_collection() {
                    Ok(counts) => {
                        let mut total = 0;
                        for (name, count) in counts {
                            println!(" - {name}: {count}");
                            total += count;
                        }
                        println!("Total documents in the local store: {total}");
                    }
                    Err(error) => tracing::error!(%error, "error counting documents"),
                }
                MenuOutcome::Continue
            }),
            MenuItem::new(
                format!(
                    "{} replication",
                    if client.is_replicating() { "Stop" } else { "Start" }
                ),
                |client: &mut Client, _| {
                    let result = if client.is_replicating() {
                        println!("Stopping replication...");
                        client.stop_replication()
                    } else {
                        println!("Starting replication...");
                        client.start_replication()
                    };
                    if let Err(error) = result {
                        tracing::error!(%error, "replication action failed");
                    }
                    MenuOutcome::Continue
                },
            ),
        ]
    })
}

/// Builds the working-collection picker.
fn collection_menu() -> Menu<Client> {
    Menu::new(
        "Choose the working collection",
        "Back to Main Menu",
        |client: &Client| {
            let collections = match client.collections() {
                Ok(collections) => collections,
                Err(error) => {
                    tracing::error!(%error, "error listing collections");
                    return Vec::new();
                }
            };
            let selected = client.selected_name();
            collections
                .iter()
                .filter(|c| c.name() != selected)
                .map(|c| {
                    let name = c.name().to_string();
                    MenuItem::new(
                        format!("Switch to collection: {}", c.full_name()),
                        move |client: &mut Client, _| {
                            if let Err(error) = client.select_collection(&name) {
                                tracing::error!(%error, "error switching collection");
                            }
                            MenuOutcome::Continue
                        },
                    )
                })
                .collect()
        },
    )
}

/// Builds the CRUD submenu.
fn crud_menu() -> Menu<Client> {
    Menu::new("CRUD Operations", "Back to Main Menu", |client: &Client| {
        let working = client.selected_name();
        vec![
            MenuItem::new(
                format!("Create {CREATE_BATCH} documents in `{working}`"),
                |client: &mut Client, _| {
                    match client.create_documents(CREATE_BATCH) {
                        Ok(created) => println!("Created {} documents", created.len()),
                        Err(error) => tracing::error!(%error, "error creating documents"),
                    }
                    MenuOutcome::Continue
                },
            ),
            MenuItem::new("Update a document", |client: &mut Client, console| {
                let Some(id) = console.prompt("Type the document id to update:") else {
                    return MenuOutcome::Exit;
                };
                if id.is_empty() {
                    println!("No document id given.");
                    return MenuOutcome::Continue;
                }
                match client.update_document(&id) {
                    Ok(true) => println!("Updated document: {id}"),
                    Ok(false) => println!("Document not found: {id}"),
                    Err(error) => tracing::error!(%error, "error updating document"),
                }
                MenuOutcome::Continue
            }),
            MenuItem::new(
                format!("List `{working}` documents"),
                |client: &mut Client, _| {
                    match client.selected_collection() {
                        Ok(collection) => {
                            if let Err(error) = client.print_collection(&collection) {
                                tracing::error!(%error, "error listing documents");
                            }
                        }
                        Err(error) => tracing::error!(%error, "error listing documents"),
                    }
                    MenuOutcome::Continue
                },
            ),
        ]
    })
}
