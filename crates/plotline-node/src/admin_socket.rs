//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for managing the waitlist. One JSON
//! command per line in, one JSON response per line out.

use crate::error::Result;
use crate::waitlist::Waitlist;
use plotline_core::{parse_target, Entrant, EntrantForm, EntrantId, EntrantPatch, PositionUpdate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// List the waitlist in order
    List,
    /// Show one entrant
    Get { id: EntrantId },
    /// Add an entrant at the end of the line
    Add { entrant: EntrantForm },
    /// Edit profile fields
    Update { id: EntrantId, patch: EntrantPatch },
    /// Remove an entrant (leaves a gap)
    Delete { id: EntrantId },
    /// Move to a typed position
    Move { id: EntrantId, target: String },
    /// Swap with the entrant ahead
    MoveUp { id: EntrantId },
    /// Swap with the entrant behind
    MoveDown { id: EntrantId },
    /// Renumber positions to 1..N
    Normalize,
    /// Verify positions are contiguous
    Check,
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Entrants { items: Vec<Entrant> },
    Record { item: Entrant },
    Updates { items: Vec<PositionUpdate> },
    Pong,
}

impl AdminResponse {
    fn error(e: impl std::fmt::Display) -> Self {
        Self::Error {
            error: e.to_string(),
        }
    }
}

/// Admin socket server.
pub struct AdminSocket {
    waitlist: Arc<Waitlist>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(waitlist: Arc<Waitlist>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            waitlist,
            socket_path: socket_path.into(),
        }
    }

    /// Bind the socket, replacing any stale socket file.
    pub fn bind(&self) -> Result<UnixListener> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);
        Ok(listener)
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let waitlist = Arc::clone(&self.waitlist);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, waitlist).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, waitlist: Arc<Waitlist>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, &waitlist).await,
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Execute one admin command against the waitlist.
pub async fn execute_command(cmd: AdminCommand, waitlist: &Waitlist) -> AdminResponse {
    match cmd {
        AdminCommand::List => match waitlist.entrants() {
            Ok(items) => AdminResponse::Entrants { items },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Get { id } => match waitlist.get(&id) {
            Ok(item) => AdminResponse::Record { item },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Add { entrant } => {
            let profile = match entrant.validate() {
                Ok(profile) => profile,
                Err(e) => return AdminResponse::error(e),
            };
            match waitlist.admit(profile).await {
                Ok(item) => AdminResponse::Record { item },
                Err(e) => AdminResponse::error(e),
            }
        }

        AdminCommand::Update { id, patch } => match waitlist.update_profile(&id, &patch).await {
            Ok(item) => AdminResponse::Record { item },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Delete { id } => match waitlist.remove(&id).await {
            Ok(removed) => AdminResponse::Ok {
                message: format!(
                    "Deleted {} from position {} (run normalize to close the gap)",
                    removed.profile.name, removed.line_position
                ),
            },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Move { id, target } => {
            let target = match parse_target(&target) {
                Ok(target) => target,
                Err(e) => return AdminResponse::error(e),
            };
            match waitlist.move_to(&id, target).await {
                Ok(items) => AdminResponse::Updates { items },
                Err(e) => AdminResponse::error(e),
            }
        }

        AdminCommand::MoveUp { id } => match waitlist.move_up(&id).await {
            Ok(items) => AdminResponse::Updates { items },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::MoveDown { id } => match waitlist.move_down(&id).await {
            Ok(items) => AdminResponse::Updates { items },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Normalize => match waitlist.normalize().await {
            Ok(items) => AdminResponse::Updates { items },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Check => match waitlist.check() {
            Ok(()) => AdminResponse::Ok {
                message: "waitlist positions are contiguous".to_string(),
            },
            Err(e) => AdminResponse::error(e),
        },

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path, read from the environment.
pub fn default_socket_path() -> PathBuf {
    socket_path_from(&|key| std::env::var(key).ok())
}

/// `PLOTLINE_ADMIN_SOCKET`, else `admin.sock` inside `PLOTLINE_DATA_DIR`.
pub fn socket_path_from<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("PLOTLINE_ADMIN_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(
                lookup("PLOTLINE_DATA_DIR").unwrap_or_else(|| "./plotline-data".to_string()),
            )
            .join("admin.sock")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use plotline_core::TargetPolicy;
    use tempfile::{tempdir, TempDir};

    fn waitlist() -> (TempDir, Arc<Waitlist>) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path().join("db")).unwrap());
        (dir, Arc::new(Waitlist::new(storage, TargetPolicy::Reject)))
    }

    async fn add(list: &Waitlist, name: &str) -> Entrant {
        let entrant = EntrantForm {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            ..EntrantForm::default()
        };
        match execute_command(AdminCommand::Add { entrant }, list).await {
            AdminResponse::Record { item } => item,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn command_wire_format() {
        let cmd: AdminCommand =
            serde_json::from_str(r#"{"cmd":"move","id":"abc","target":"3"}"#).unwrap();
        assert!(matches!(cmd, AdminCommand::Move { ref target, .. } if target == "3"));

        let json = serde_json::to_string(&AdminCommand::MoveUp { id: "abc".into() }).unwrap();
        assert_eq!(json, r#"{"cmd":"move_up","id":"abc"}"#);

        let json = serde_json::to_string(&AdminResponse::Pong).unwrap();
        assert_eq!(json, r#"{"status":"pong"}"#);
    }

    #[test]
    fn socket_path_fallbacks() {
        let none = |_: &str| -> Option<String> { None };
        assert_eq!(socket_path_from(&none), PathBuf::from("./plotline-data/admin.sock"));

        let data_dir = |key: &str| (key == "PLOTLINE_DATA_DIR").then(|| "/srv/plot".to_string());
        assert_eq!(socket_path_from(&data_dir), PathBuf::from("/srv/plot/admin.sock"));

        let both = |key: &str| match key {
            "PLOTLINE_ADMIN_SOCKET" => Some("/run/plotline.sock".to_string()),
            "PLOTLINE_DATA_DIR" => Some("/srv/plot".to_string()),
            _ => None,
        };
        assert_eq!(socket_path_from(&both), PathBuf::from("/run/plotline.sock"));
    }

    #[tokio::test]
    async fn listed_short_ids_address_entrants() {
        let (_dir, list) = waitlist();
        add(&list, "A").await;
        add(&list, "B").await;

        let shown: Vec<String> = match execute_command(AdminCommand::List, &list).await {
            AdminResponse::Entrants { items } => {
                items.iter().map(|e| e.id.short().to_string()).collect()
            }
            other => panic!("unexpected response: {:?}", other),
        };

        let moved = execute_command(
            AdminCommand::MoveUp {
                id: shown[1].as_str().into(),
            },
            &list,
        )
        .await;
        assert!(matches!(moved, AdminResponse::Updates { ref items } if items.len() == 2));

        let names: Vec<String> = list
            .entrants()
            .unwrap()
            .into_iter()
            .map(|e| e.profile.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);

        let shown_record = execute_command(
            AdminCommand::Get {
                id: shown[0].as_str().into(),
            },
            &list,
        )
        .await;
        assert!(matches!(shown_record, AdminResponse::Record { ref item } if item.profile.name == "A"));
    }

    #[tokio::test]
    async fn typed_move_parses_target() {
        let (_dir, list) = waitlist();
        add(&list, "A").await;
        let b = add(&list, "B").await;

        let moved = execute_command(
            AdminCommand::Move {
                id: b.id.clone(),
                target: " 1 ".into(),
            },
            &list,
        )
        .await;
        assert!(matches!(moved, AdminResponse::Updates { ref items } if items.len() == 2));

        let bad = execute_command(
            AdminCommand::Move {
                id: b.id,
                target: "first".into(),
            },
            &list,
        )
        .await;
        assert!(matches!(bad, AdminResponse::Error { ref error } if error.contains("whole number")));
    }

    #[tokio::test]
    async fn invalid_add_is_reported() {
        let (_dir, list) = waitlist();
        let entrant = EntrantForm {
            name: " ".into(),
            email: "x@example.com".into(),
            ..EntrantForm::default()
        };
        let response = execute_command(AdminCommand::Add { entrant }, &list).await;
        assert!(matches!(response, AdminResponse::Error { ref error } if error.contains("Name is required")));
    }

    #[tokio::test]
    async fn delete_then_check_then_normalize() {
        let (_dir, list) = waitlist();
        let a = add(&list, "A").await;
        add(&list, "B").await;

        let deleted = execute_command(AdminCommand::Delete { id: a.id }, &list).await;
        assert!(matches!(deleted, AdminResponse::Ok { .. }));

        let check = execute_command(AdminCommand::Check, &list).await;
        assert!(matches!(check, AdminResponse::Error { .. }));

        let normalized = execute_command(AdminCommand::Normalize, &list).await;
        assert!(matches!(normalized, AdminResponse::Updates { ref items } if items.len() == 1));

        let check = execute_command(AdminCommand::Check, &list).await;
        assert!(matches!(check, AdminResponse::Ok { .. }));
    }

    #[tokio::test]
    async fn serves_commands_over_socket() {
        let (dir, list) = waitlist();
        add(&list, "A").await;

        let socket = AdminSocket::new(list, dir.path().join("admin.sock"));
        let listener = socket.bind().unwrap();
        let path = socket.socket_path().clone();
        tokio::spawn(async move {
            let _ = socket.serve(listener).await;
        });

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"{\"cmd\":\"ping\"}\n{\"cmd\":\"list\"}\nnonsense\n").await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let pong: AdminResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(pong, AdminResponse::Pong));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let listed: AdminResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(listed, AdminResponse::Entrants { ref items } if items.len() == 1));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let invalid: AdminResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(invalid, AdminResponse::Error { ref error } if error.starts_with("Invalid command")));
    }
}
