//! Integration tests for session orchestration.

use std::sync::Arc;

use credvault::backend::{MemoryBackend, PersistenceBackend, SECRETS_NAME};
use credvault::crypto::{CryptoService, PbeCipher};
use credvault::errors::CredVaultError;
use credvault::secgen::SecretGenerator;
use credvault::session::{Collaborators, Session};
use credvault::table::SecretTable;

/// Helper: start a session over the given backends.
fn start_session(backends: Vec<Arc<dyn PersistenceBackend>>, primary: &str) -> Session {
    Session::start(Collaborators {
        crypto: Arc::new(PbeCipher::default()),
        table: Arc::new(SecretTable::new()),
        generator: SecretGenerator,
        backends,
        primary_backend: primary.to_string(),
    })
    .expect("start session")
}

/// Helper: write a record from string literals.
fn write(session: &mut Session, secret: &str, identifier: &str, note: &str) {
    let mut secret = secret.as_bytes().to_vec();
    let mut identifier = identifier.as_bytes().to_vec();
    let mut note = note.as_bytes().to_vec();
    session
        .write(&mut secret, &mut identifier, &mut note)
        .expect("write record");
}

// ---------------------------------------------------------------------------
// Full lifecycle scenario
// ---------------------------------------------------------------------------

#[test]
fn store_change_password_and_reload() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));

    // Fresh session over an empty store.
    let mut session = start_session(vec![backend.clone()], "mem");
    assert!(!session.data_file_exists());

    write(&mut session, "pass1", "id1", "note1");
    assert!(session.unsaved_data_exists());

    session.store_data(b"123", &["mem"]).expect("store");
    assert!(!session.unsaved_data_exists());
    assert!(backend.exists(SECRETS_NAME).expect("exists"));

    session
        .change_master_password(b"123", b"abc", &["mem"])
        .expect("change master password");

    // A new session over the same backend sees the stored payload and
    // loads it under the new password.
    let mut reloaded = start_session(vec![backend.clone()], "mem");
    assert!(reloaded.data_file_exists());
    reloaded.load_data(b"abc", "mem").expect("load");

    assert_eq!(reloaded.table().row_count(), 1);
    assert_eq!(reloaded.table().read_secret(0), b"pass1");
    assert_eq!(reloaded.table().read_identifier(0), b"id1");
    assert_eq!(reloaded.table().read_note(0), b"note1");

    // A wrong current password must fail the pre-check and leave the
    // stored payload untouched.
    let before = backend.read(SECRETS_NAME).expect("read");
    let result = reloaded.change_master_password(b"WRONG", b"xyz", &["mem"]);
    assert!(matches!(result, Err(CredVaultError::InvalidPassword)));
    assert_eq!(backend.read(SECRETS_NAME).expect("read"), before);
}

#[test]
fn old_password_stops_working_after_change() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));

    let mut session = start_session(vec![backend.clone()], "mem");
    write(&mut session, "pw", "id", "");
    session.store_data(b"first", &["mem"]).expect("store");
    session
        .change_master_password(b"first", b"second", &["mem"])
        .expect("change");

    let mut reloaded = start_session(vec![backend.clone()], "mem");
    let result = reloaded.load_data(b"first", "mem");
    assert!(matches!(result, Err(CredVaultError::DecryptionFailed)));
}

// ---------------------------------------------------------------------------
// Multi-backend consistency
// ---------------------------------------------------------------------------

#[test]
fn store_aborts_before_any_write_when_a_backend_disagrees() {
    let stale = Arc::new(MemoryBackend::new("stale", "Stale copy"));
    let fresh = Arc::new(MemoryBackend::new("fresh", "Fresh copy"));

    // `stale` already holds data encrypted under a different password.
    let cipher = PbeCipher::default();
    let foreign = cipher
        .encrypt(b"other-password", b"foreign payload")
        .expect("encrypt foreign");
    stale.write(SECRETS_NAME, &foreign).expect("seed stale");

    let mut session = start_session(vec![stale.clone(), fresh.clone()], "fresh");
    write(&mut session, "pw", "id", "");

    let result = session.store_data(b"123", &["stale", "fresh"]);
    assert!(matches!(result, Err(CredVaultError::InvalidPassword)));

    // No write happened anywhere: stale keeps its old payload, fresh
    // stays empty.
    assert_eq!(stale.read(SECRETS_NAME).expect("read"), foreign);
    assert!(!fresh.exists(SECRETS_NAME).expect("exists"));
    // The data still counts as unsaved.
    assert!(session.unsaved_data_exists());
}

#[test]
fn store_writes_identical_ciphertext_to_every_backend() {
    let a = Arc::new(MemoryBackend::new("a", "Backend A"));
    let b = Arc::new(MemoryBackend::new("b", "Backend B"));

    let mut session = start_session(vec![a.clone(), b.clone()], "a");
    write(&mut session, "pw", "id", "");
    session.store_data(b"123", &["a", "b"]).expect("store");

    let blob_a = a.read(SECRETS_NAME).expect("read a");
    let blob_b = b.read(SECRETS_NAME).expect("read b");
    assert!(!blob_a.is_empty());
    assert_eq!(blob_a, blob_b, "both backends must hold the same bytes");
}

// ---------------------------------------------------------------------------
// Guard conditions
// ---------------------------------------------------------------------------

#[test]
fn write_refused_until_existing_data_is_loaded() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));

    // Seed the backend so the session starts with data_file_exists.
    {
        let mut seeder = start_session(vec![backend.clone()], "mem");
        write(&mut seeder, "pw", "id", "");
        seeder.store_data(b"123", &["mem"]).expect("store");
    }

    let mut session = start_session(vec![backend.clone()], "mem");
    assert!(session.data_file_exists());

    let result = session.write(&mut b"pw".to_vec(), &mut b"id".to_vec(), &mut []);
    assert!(matches!(
        result,
        Err(CredVaultError::ExistingDataNotLoaded)
    ));

    // After loading, writing works.
    session.load_data(b"123", "mem").expect("load");
    write(&mut session, "pw2", "id2", "");
}

#[test]
fn store_without_unsaved_changes_refused() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    let result = session.store_data(b"123", &["mem"]);
    assert!(matches!(result, Err(CredVaultError::NoUnsavedData)));
}

#[test]
fn load_with_empty_password_refused() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    let result = session.load_data(b"", "mem");
    assert!(matches!(result, Err(CredVaultError::InvalidPassword)));
}

#[test]
fn change_to_empty_password_refused() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    let result = session.change_master_password(b"123", b"", &["mem"]);
    assert!(matches!(result, Err(CredVaultError::InvalidPassword)));
}

#[test]
fn unknown_backend_id_is_service_unavailable() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    let result = session.load_data(b"123", "nope");
    assert!(matches!(
        result,
        Err(CredVaultError::ServiceUnavailable(_))
    ));
}

#[test]
fn start_without_backends_fails() {
    let result = Session::start(Collaborators {
        crypto: Arc::new(PbeCipher::default()),
        table: Arc::new(SecretTable::new()),
        generator: SecretGenerator,
        backends: Vec::new(),
        primary_backend: "mem".to_string(),
    });
    assert!(matches!(
        result,
        Err(CredVaultError::ServiceUnavailable(_))
    ));
}

#[test]
fn start_with_unknown_primary_fails() {
    let backend: Arc<dyn PersistenceBackend> = Arc::new(MemoryBackend::new("mem", "In memory"));
    let result = Session::start(Collaborators {
        crypto: Arc::new(PbeCipher::default()),
        table: Arc::new(SecretTable::new()),
        generator: SecretGenerator,
        backends: vec![backend],
        primary_backend: "other".to_string(),
    });
    assert!(matches!(
        result,
        Err(CredVaultError::ServiceUnavailable(_))
    ));
}

// ---------------------------------------------------------------------------
// Loading an empty store
// ---------------------------------------------------------------------------

#[test]
fn loading_an_empty_store_yields_an_empty_table() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    // Nothing stored yet: the empty read short-circuits decryption.
    session.load_data(b"123", "mem").expect("load empty");
    assert!(session.data_file_loaded());
    assert_eq!(session.table().row_count(), 0);
}

// ---------------------------------------------------------------------------
// Edit mode
// ---------------------------------------------------------------------------

#[test]
fn edit_mode_updates_instead_of_creating() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    write(&mut session, "pass1", "id1", "note1");
    session.set_edit_mode(0);
    assert_eq!(session.edited_row(), Some(0));

    write(&mut session, "pass2", "id1", "note1");

    assert_eq!(session.table().row_count(), 1);
    assert_eq!(session.table().read_secret(0), b"pass2");
    // A successful write leaves edit mode.
    assert_eq!(session.edited_row(), None);
}

#[test]
fn empty_secret_in_edit_mode_keeps_stored_secret() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    write(&mut session, "keep-me", "id1", "note1");
    session.set_edit_mode(0);

    session
        .write(&mut [], &mut b"id2".to_vec(), &mut b"note2".to_vec())
        .expect("update without secret");

    assert_eq!(session.table().read_secret(0), b"keep-me");
    assert_eq!(session.table().read_identifier(0), b"id2");
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

#[test]
fn remove_marks_data_unsaved() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend.clone()], "mem");

    write(&mut session, "pw", "id", "");
    session.store_data(b"123", &["mem"]).expect("store");
    assert!(!session.unsaved_data_exists());

    session.remove(0).expect("remove");
    assert!(session.unsaved_data_exists());
    assert_eq!(session.table().row_count(), 0);
}

// ---------------------------------------------------------------------------
// Presentation helpers
// ---------------------------------------------------------------------------

#[test]
fn supported_backends_lists_ids_and_display_names() {
    let a = Arc::new(MemoryBackend::new("a", "Backend A"));
    let b = Arc::new(MemoryBackend::new("b", "Backend B"));
    let session = start_session(vec![a, b], "a");

    let supported = session.supported_backends();
    assert_eq!(supported.len(), 2);
    assert_eq!(supported["a"], "Backend A");
    assert_eq!(supported["b"], "Backend B");
}

#[test]
fn unique_identifiers_ordered_by_frequency() {
    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    write(&mut session, "pw1", "common@example.com", "");
    write(&mut session, "pw2", "rare@example.com", "");
    write(&mut session, "pw3", "common@example.com", "");

    let identifiers = session.query().unique_identifiers();
    assert_eq!(
        identifiers,
        vec!["common@example.com".to_string(), "rare@example.com".to_string()]
    );
}

#[test]
fn generated_secret_fits_table_limits() {
    use credvault::secgen::CharClass;

    let backend = Arc::new(MemoryBackend::new("mem", "In memory"));
    let mut session = start_session(vec![backend], "mem");

    let mut secret = [0u8; 24];
    session
        .generate_secret(
            &mut secret,
            &[CharClass::Digit, CharClass::AlphaLower, CharClass::Special],
        )
        .expect("generate");

    let mut identifier = b"generated@example.com".to_vec();
    let mut note = Vec::new();
    session
        .write(&mut secret, &mut identifier, &mut note)
        .expect("write generated secret");
    assert_eq!(session.table().read_secret(0).len(), 24);
}
