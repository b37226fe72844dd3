//! plotline-admin CLI tool
//!
//! Manages the garden waitlist through the node's admin socket.
//!
//! Usage:
//!   plotline-admin list
//!   plotline-admin add "Ada Lovelace" ada@example.com --phone 3235550100
//!   plotline-admin move <id> 3
//!   plotline-admin up <id>
//!   plotline-admin normalize
//!   plotline-admin ping

use clap::{Parser, Subcommand};
use plotline_core::{Entrant, EntrantForm, EntrantPatch, PositionUpdate};
use plotline_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "plotline-admin", version)]
#[command(about = "Manage the Plotline garden waitlist")]
#[command(after_help = "Environment:
  PLOTLINE_SOCKET        Path to admin socket
  PLOTLINE_ADMIN_SOCKET  Socket path the node was given (used when PLOTLINE_SOCKET is unset)
  PLOTLINE_DATA_DIR      Node data directory (default socket: <dir>/admin.sock, ./plotline-data)
IDs may be given in full or as the short prefix shown by `list`.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the waitlist in order
    List,
    /// Show one entrant in full
    Show { id: String },
    /// Add an entrant at the end of the line
    Add {
        name: String,
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// No experience, Beginner, Intermediate, Experienced or Expert
        #[arg(long)]
        experience: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit profile fields (an empty value clears an optional field)
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        experience: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove an entrant
    Delete { id: String },
    /// Move an entrant to a position, shifting the others
    Move {
        id: String,
        #[arg(allow_hyphen_values = true)]
        target: String,
    },
    /// Swap with the entrant ahead
    Up { id: String },
    /// Swap with the entrant behind
    Down { id: String },
    /// Renumber positions to 1..N
    Normalize,
    /// Verify positions are contiguous
    Check,
    /// Check if the node is running
    Ping,
}

impl Command {
    fn into_admin(self) -> AdminCommand {
        match self {
            Command::List => AdminCommand::List,
            Command::Show { id } => AdminCommand::Get { id: id.into() },
            Command::Add {
                name,
                email,
                phone,
                address,
                experience,
                notes,
            } => AdminCommand::Add {
                entrant: EntrantForm {
                    name,
                    email,
                    phone,
                    address,
                    experience,
                    notes,
                },
            },
            Command::Edit {
                id,
                name,
                email,
                phone,
                address,
                experience,
                notes,
            } => AdminCommand::Update {
                id: id.into(),
                patch: EntrantPatch {
                    name,
                    email,
                    phone,
                    address,
                    experience,
                    notes,
                },
            },
            Command::Delete { id } => AdminCommand::Delete { id: id.into() },
            Command::Move { id, target } => AdminCommand::Move {
                id: id.into(),
                target,
            },
            Command::Up { id } => AdminCommand::MoveUp { id: id.into() },
            Command::Down { id } => AdminCommand::MoveDown { id: id.into() },
            Command::Normalize => AdminCommand::Normalize,
            Command::Check => AdminCommand::Check,
            Command::Ping => AdminCommand::Ping,
        }
    }
}

fn get_socket_path() -> PathBuf {
    std::env::var("PLOTLINE_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: &AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to plotline-node at {:?}: {}\n\
             Is plotline-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn print_table(items: &[Entrant]) {
    if items.is_empty() {
        println!("(waitlist is empty)");
        return;
    }

    println!("{:>4}  {:<12}  {:<24}  {:<28}  {}", "POS", "ID", "NAME", "EMAIL", "EXPERIENCE");
    for e in items {
        println!(
            "{:>4}  {:<12}  {:<24}  {:<28}  {}",
            e.line_position,
            e.id.short(),
            e.profile.name,
            e.profile.email,
            e.profile.experience.map(|x| x.label()).unwrap_or("-"),
        );
    }
}

fn print_entrant(e: &Entrant) {
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("id:          {}", e.id);
    println!("position:    {}", e.line_position);
    println!("name:        {}", e.profile.name);
    println!("email:       {}", e.profile.email);
    println!("phone:       {}", optional(&e.profile.phone));
    println!("address:     {}", optional(&e.profile.address));
    println!(
        "experience:  {}",
        e.profile.experience.map(|x| x.label()).unwrap_or("-")
    );
    println!("notes:       {}", optional(&e.profile.notes));
}

fn print_updates(items: &[PositionUpdate]) {
    if items.is_empty() {
        println!("No change");
        return;
    }
    for u in items {
        println!("{} -> {}", u.id.short(), u.line_position);
    }
}

fn main() {
    let cli = Cli::parse();

    let response = match send_command(&cli.command.into_admin()) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match response {
        AdminResponse::Ok { message } => {
            println!("{}", message);
        }
        AdminResponse::Error { error } => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
        AdminResponse::Entrants { items } => print_table(&items),
        AdminResponse::Record { item } => print_entrant(&item),
        AdminResponse::Updates { items } => print_updates(&items),
        AdminResponse::Pong => {
            println!("pong - plotline-node is running");
        }
    }
}
