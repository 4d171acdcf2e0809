use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use journal_vault::{
    AlertSystem, BackupEngine, BackupOutcome, JournalSession, LoginManager, RestoreOutcome,
    VaultError,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "journal-vault")]
#[command(about = "Per-user journal storage with obfuscated records, backup and restore.")]
#[command(version)]
struct Cli {
    /// Data root; records live under <root>/Data and <root>/Back Ups
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user account
    Signup {
        username: String,
        password: String,
    },
    /// Verify credentials and show the user's journal
    Login {
        username: String,
        password: String,
        /// Stay signed in for the next launch
        #[arg(short, long)]
        stay: bool,
    },
    /// List known users
    Users,
    /// Write a manual backup snapshot
    Backup {
        username: String,
        password: String,
    },
    /// List backup snapshots, most recent first
    Backups { username: String },
    /// Replace the journal with a backup snapshot
    Restore {
        username: String,
        password: String,
        /// Snapshot file name as shown by `backups`
        snapshot: String,
    },
    /// Export categories as plain JSON
    Export {
        username: String,
        password: String,
        /// Categories to export; all of them when omitted
        categories: Vec<String>,
    },
}

fn main() -> Result<(), VaultError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Signup { username, password } => sign_up(&cli.root, username, password),
        Commands::Login {
            username,
            password,
            stay,
        } => show_journal(&cli.root, username, password, *stay),
        Commands::Users => list_users(&cli.root),
        Commands::Backup { username, password } => backup(&cli.root, username, password),
        Commands::Backups { username } => list_backups(&cli.root, username),
        Commands::Restore {
            username,
            password,
            snapshot,
        } => restore(&cli.root, username, password, snapshot),
        Commands::Export {
            username,
            password,
            categories,
        } => export(&cli.root, username, password, categories),
    }
}

/// Verify credentials and open a session, surfacing any corruption notice.
fn log_in(root: &Path, username: &str, password: &str, stay: bool) -> Result<JournalSession, VaultError> {
    let mut manager = LoginManager::new(root)?;
    let mut session = JournalSession::new(root);
    let (ok, message) = manager.validate_login(username, password, stay, &mut session)?;
    if !ok {
        return Err(VaultError::Account(
            "invalid username or password".to_string(),
        ));
    }
    if !message.is_empty() {
        println!("{}", message);
    }
    Ok(session)
}

fn sign_up(root: &Path, username: &str, password: &str) -> Result<(), VaultError> {
    let manager = LoginManager::new(root)?;
    if manager.create_user(username, password)? {
        println!("Account '{}' created.", username);
    } else {
        println!("That username is not available.");
    }
    Ok(())
}

fn show_journal(root: &Path, username: &str, password: &str, stay: bool) -> Result<(), VaultError> {
    let session = log_in(root, username, password, stay)?;
    info!(user = username, "signed in");

    println!("Journal for {}:", username);
    println!("{}", "─".repeat(50));
    for category in session.category_names() {
        println!("{}", category);
        for definition in session.definitions_for_display(&category) {
            println!("  {}", definition);
        }
    }
    Ok(())
}

fn list_users(root: &Path) -> Result<(), VaultError> {
    let manager = LoginManager::new(root)?;
    for user in manager.users() {
        println!("{}", user);
    }
    Ok(())
}

fn backup(root: &Path, username: &str, password: &str) -> Result<(), VaultError> {
    let session = log_in(root, username, password, false)?;
    let engine = BackupEngine::new(root, AlertSystem::new());

    let document = session.document();
    let doc = document
        .lock()
        .map_err(|e| VaultError::Backup(e.to_string()))?
        .clone();
    match engine.backup_now(username, &doc, session.doc_passes())? {
        BackupOutcome::Written(path) => println!("Backup written to {}", path.display()),
        BackupOutcome::NoData => println!("No data to backup."),
    }
    Ok(())
}

fn list_backups(root: &Path, username: &str) -> Result<(), VaultError> {
    let engine = BackupEngine::new(root, AlertSystem::new());
    let snapshots = engine.snapshots(username);
    if snapshots.is_empty() {
        println!("No backups for {}.", username);
        return Ok(());
    }
    println!("Backups for {}:", username);
    println!("{}", "─".repeat(50));
    for name in snapshots {
        println!("{}", name);
    }
    Ok(())
}

fn restore(root: &Path, username: &str, password: &str, snapshot: &str) -> Result<(), VaultError> {
    let session = log_in(root, username, password, false)?;
    let mut engine = BackupEngine::new(root, AlertSystem::new());

    match engine.restore(username, snapshot, session.doc_passes(), &session.document())? {
        RestoreOutcome::Restored => {
            session.save()?;
            println!("Restored user's data.");
        }
        RestoreOutcome::Corrupt => println!("Backup data has been corrupted."),
    }
    Ok(())
}

fn export(
    root: &Path,
    username: &str,
    password: &str,
    categories: &[String],
) -> Result<(), VaultError> {
    let session = log_in(root, username, password, false)?;

    let wanted: Vec<String> = if categories.is_empty() {
        session.category_names()
    } else {
        categories.to_vec()
    };
    let mut selection = IndexMap::new();
    for category in wanted {
        let definitions = session.definition_names(&category);
        selection.insert(category, definitions);
    }
    let path = session.export_selection(&selection)?;
    println!("Exported to {}", path.display());
    Ok(())
}
