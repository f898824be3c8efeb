//! cyberkey - Local credential vault
//!
//! PIN-gated storage for (platform, username, password) records.
//! Passwords are base64-encoded at rest, not encrypted.
//!
//! Commands:
//! - add <PLATFORM> <USERNAME> [PASSWORD]: Store an entry (prompts if no password)
//! - edit <ID> <PLATFORM> <USERNAME> [PASSWORD]: Replace an entry in place
//! - delete <ID>: Delete an entry
//! - show <ID>: Print an entry with the decoded password
//! - list [QUERY]: List entries, optionally filtered by platform
//! - generate: Print a fresh random password
//! - strength <PASSWORD>: Score a password
//! - export [FILE]: Write a JSON backup
//! - pin set [NEW_PIN]: Change the PIN
//! - reset: Factory reset (wipes everything, PIN back to 0000)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cyberkey::password::{self, Strength};
use cyberkey::{LocalStore, Paths, Vault, VaultEntry};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cyberkey")]
#[command(about = "Local credential vault - PIN-gated storage for platform logins")]
#[command(version)]
#[command(after_help = r#"SECURITY:
    - Access is gated by a 4-digit PIN (default 0000, change it!)
    - Stored passwords are base64-encoded, NOT encrypted
    - Vault stored in ~/.local/share/cyberkey/store/
    - Never logged or sent anywhere"#)]
struct Cli {
    /// PIN for non-interactive use (otherwise prompted)
    #[arg(long, global = true)]
    pin: Option<String>,

    /// Override the store directory
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new entry (prompts securely if password not provided)
    Add {
        /// Service name (e.g., github)
        platform: String,
        /// Login name on that service
        username: String,
        /// Password (omit for secure hidden prompt)
        password: Option<String>,
    },

    /// Replace an entry in place, keeping its id
    Edit {
        /// Entry id (see list)
        id: i64,
        /// Service name
        platform: String,
        /// Login name
        username: String,
        /// Password (omit for secure hidden prompt)
        password: Option<String>,
    },

    /// Delete an entry permanently
    Delete {
        /// Entry id to delete
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Print a single entry with the decoded password
    Show {
        /// Entry id
        id: i64,
    },

    /// List entries (passwords hidden unless asked)
    List {
        /// Filter by platform substring (case-insensitive)
        query: Option<String>,
        /// Output as JSON for scripting (passwords decoded)
        #[arg(long)]
        json: bool,
        /// Print decoded passwords instead of masking them
        #[arg(long)]
        show_passwords: bool,
    },

    /// Generate a random password
    Generate {
        /// Password length
        #[arg(long, default_value_t = password::DEFAULT_LENGTH)]
        length: usize,
    },

    /// Score a password's strength
    Strength {
        /// Password to score
        password: String,
    },

    /// Export the vault to a JSON backup file
    Export {
        /// Output file path
        #[arg(default_value = "cyberkey_backup.json")]
        file: PathBuf,
    },

    /// PIN management
    Pin {
        #[command(subcommand)]
        command: PinCommands,
    },

    /// Factory reset: wipe all entries and restore the default PIN
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Change the PIN (must be exactly 4 digits)
    Set {
        /// New PIN (omit for secure hidden prompt)
        new_pin: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Stateless helpers run without touching the vault or the PIN
    match &cli.command {
        Some(Commands::Generate { length }) => return cmd_generate(*length),
        Some(Commands::Strength { password }) => return cmd_strength(password),
        _ => {}
    }

    let store_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| Paths::new().store());
    let store = LocalStore::open(&store_dir)?;
    let mut vault = Vault::open(store)?;

    require_pin(&vault, cli.pin.as_deref())?;

    match cli.command {
        Some(Commands::Add {
            platform,
            username,
            password,
        }) => cmd_add(&mut vault, &platform, &username, password),
        Some(Commands::Edit {
            id,
            platform,
            username,
            password,
        }) => cmd_edit(&mut vault, id, &platform, &username, password),
        Some(Commands::Delete { id, yes }) => cmd_delete(&mut vault, id, yes),
        Some(Commands::Show { id }) => cmd_show(&vault, id),
        Some(Commands::List {
            query,
            json,
            show_passwords,
        }) => cmd_list(&vault, query.as_deref(), json, show_passwords),
        Some(Commands::Export { file }) => cmd_export(&vault, &file),
        Some(Commands::Pin { command }) => match command {
            PinCommands::Set { new_pin } => cmd_pin_set(&mut vault, new_pin),
        },
        Some(Commands::Reset { yes }) => cmd_reset(&mut vault, yes),
        Some(Commands::Generate { .. }) | Some(Commands::Strength { .. }) => unreachable!(),
        None => {
            // Default to listing entries
            cmd_list(&vault, None, false, false)
        }
    }
}

/// Check the PIN before any vault access
fn require_pin(vault: &Vault, pin_flag: Option<&str>) -> Result<()> {
    let entered = match pin_flag {
        Some(p) => p.to_string(),
        None => rpassword::prompt_password("PIN: ").context("Failed to read PIN")?,
    };

    if !vault.verify_pin(&entered) {
        bail!("Invalid PIN");
    }

    Ok(())
}

/// Resolve a password argument, prompting if absent
fn resolve_password(value: Option<String>) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            let password = rpassword::prompt_password("Enter password: ")
                .context("Failed to read password")?;

            if password.is_empty() {
                bail!("Empty password not allowed");
            }

            Ok(password)
        }
    }
}

/// Ask a y/N question on stdout/stdin
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Store a new entry
fn cmd_add(vault: &mut Vault, platform: &str, username: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;

    let id = vault.add(platform, username, &password)?;

    println!("success: Entry saved: {} ({})", platform, id);
    println!("Password strength: {}", password::strength(&password));

    Ok(())
}

/// Replace an entry
fn cmd_edit(
    vault: &mut Vault,
    id: i64,
    platform: &str,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;

    vault.update(id, platform, username, &password)?;

    println!("success: Entry updated: {} ({})", platform, id);

    Ok(())
}

/// Delete an entry
fn cmd_delete(vault: &mut Vault, id: i64, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete this entry?")? {
        println!("Cancelled");
        return Ok(());
    }

    vault.delete(id)?;
    println!("success: Entry deleted: {}", id);

    Ok(())
}

/// Print a single entry, password decoded
fn cmd_show(vault: &Vault, id: i64) -> Result<()> {
    let entry = vault.get(id)?;

    println!("id:       {}", entry.id);
    println!("platform: {}", entry.platform);
    println!("username: {}", entry.username);
    println!("password: {}", entry.password);

    Ok(())
}

/// List entries, optionally filtered
fn cmd_list(vault: &Vault, query: Option<&str>, json: bool, show_passwords: bool) -> Result<()> {
    let matches = vault.search(query.unwrap_or(""));

    if json {
        let decoded: Vec<VaultEntry> = matches
            .iter()
            .map(|e| {
                let mut e = (*e).clone();
                e.password = cyberkey::vault::safe_decode(&e.password);
                e
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    if matches.is_empty() {
        match query {
            Some(q) => println!("No entries match: {}", q),
            None => println!("Vault is empty. Add one with: cyberkey add <platform> <username>"),
        }
        return Ok(());
    }

    println!("Stored Entries");
    println!();

    for entry in &matches {
        let password = if show_passwords {
            cyberkey::vault::safe_decode(&entry.password)
        } else {
            "********".to_string()
        };
        println!(
            "  {}  {}  {}  {}",
            entry.id, entry.platform, entry.username, password
        );
    }

    println!();
    println!("{} entries", matches.len());

    Ok(())
}

/// Print a fresh random password and its strength
fn cmd_generate(length: usize) -> Result<()> {
    if length == 0 {
        bail!("Length must be at least 1");
    }

    let password = password::generate(length);
    println!("{}", password);
    println!("Password strength: {}", password::strength(&password));

    Ok(())
}

/// Score a password
fn cmd_strength(password: &str) -> Result<()> {
    let score = password::score(password);
    let rating = password::strength(password);

    println!("score:  {}/5", score);
    println!("rating: {}", rating);

    if rating == Strength::Weak {
        println!("Try a longer password with uppercase, digits and symbols.");
    }

    Ok(())
}

/// Write a JSON backup
fn cmd_export(vault: &Vault, file: &PathBuf) -> Result<()> {
    vault.export(file)?;

    println!("success: Vault exported to: {}", file.display());
    println!("Passwords in the backup are encoded, not encrypted. Store it safely.");

    Ok(())
}

/// Change the PIN
fn cmd_pin_set(vault: &mut Vault, new_pin: Option<String>) -> Result<()> {
    let new_pin = match new_pin {
        Some(p) => p,
        None => rpassword::prompt_password("New PIN: ").context("Failed to read PIN")?,
    };

    vault.set_pin(&new_pin)?;
    println!("success: PIN updated");

    Ok(())
}

/// Factory reset
fn cmd_reset(vault: &mut Vault, yes: bool) -> Result<()> {
    if !yes && !confirm("FACTORY RESET: wipe all data and reset the PIN to 0000?")? {
        println!("Cancelled");
        return Ok(());
    }

    vault.reset()?;
    println!("success: Vault wiped, PIN reset to {}", cyberkey::vault::DEFAULT_PIN);

    Ok(())
}
