use journal_vault::{
    AlertSystem, BackupEngine, BackupOutcome, JournalSession, LoginManager, RestoreOutcome,
};

/// Walks the whole storage pipeline: sign up, log in, edit, back up,
/// wipe, restore.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempfile::TempDir::new()?;
    println!("Journal Vault - Storage Demo");
    println!("============================");

    let mut manager = LoginManager::new(root.path())?;
    let mut session = JournalSession::new(root.path());
    let engine_alerts = AlertSystem::new();
    engine_alerts.subscribe(std::sync::Arc::new(|alert| {
        println!("[alert] {}", alert.message);
    }));
    let mut engine = BackupEngine::new(root.path(), engine_alerts);

    manager.create_user("alice", "pw1")?;
    let (ok, _) = manager.validate_login("alice", "pw1", false, &mut session)?;
    assert!(ok);
    println!("Signed in as {}", session.current_user());

    session.add_category("Notes");
    session.add_definition("Notes", "Today");
    session.set_text("Notes", "Today", "hello");
    session.save()?;

    let document = session.document();
    let doc = document.lock().unwrap().clone();
    let BackupOutcome::Written(path) = engine.backup_now("alice", &doc, session.doc_passes())?
    else {
        unreachable!("document is not empty");
    };
    let snapshot = path.file_name().unwrap().to_string_lossy().into_owned();
    println!("Snapshot: {}", snapshot);

    session.clear_data();
    println!("Document wiped; categories: {:?}", session.category_names());

    let outcome = engine.restore("alice", &snapshot, session.doc_passes(), &session.document())?;
    assert_eq!(outcome, RestoreOutcome::Restored);
    println!(
        "Restored; Notes/Today = {:?}",
        session.entry("Notes", "Today").map(|e| e.text().to_string())
    );

    session.log_out()?;
    Ok(())
}
