//! Session orchestration over the table, the cipher and the backends.
//!
//! A [`Session`] composes the collaborating services into the
//! high-level API a user interface builds on.  Typical flow: build the
//! [`Collaborators`], call [`Session::start`], then [`load_data`],
//! react to user input via [`write`]/[`set_edit_mode`]/[`remove`], and
//! persist with [`store_data`].  Errors are logged here and re-thrown
//! to the caller unmodified.
//!
//! The table serializes its own operations internally; the session's
//! lifecycle flags are single-threaded orchestration state, which the
//! `&mut self` receivers enforce.  A verify-then-write sequence is not
//! atomic across two sessions pointed at the same backend.
//!
//! [`load_data`]: Session::load_data
//! [`write`]: Session::write
//! [`set_edit_mode`]: Session::set_edit_mode
//! [`remove`]: Session::remove
//! [`store_data`]: Session::store_data

mod query;

pub use query::SecretQuery;

use std::collections::BTreeMap;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::backend::{PersistenceBackend, SECRETS_NAME};
use crate::crypto::{BoundCrypto, CryptoService};
use crate::errors::{CredVaultError, Result};
use crate::secgen::{CharClass, SecretGenerator};
use crate::table::SecretTable;

/// Collaborating services injected into a [`Session`].
pub struct Collaborators {
    pub crypto: Arc<dyn CryptoService>,
    pub table: Arc<SecretTable>,
    pub generator: SecretGenerator,
    pub backends: Vec<Arc<dyn PersistenceBackend>>,
    /// Id of the backend probed for existing data at start.
    pub primary_backend: String,
}

/// A started vault session.
pub struct Session {
    crypto: Arc<dyn CryptoService>,
    table: Arc<SecretTable>,
    generator: SecretGenerator,
    backends: BTreeMap<String, Arc<dyn PersistenceBackend>>,
    data_file_exists: bool,
    data_file_loaded: bool,
    unsaved_data_exists: bool,
    edited_row: Option<usize>,
}

impl Session {
    /// Start a session over the given collaborators.
    ///
    /// Validates that at least one backend is configured and that the
    /// primary backend id resolves, then probes the primary backend
    /// for an existing payload.  Fails with `ServiceUnavailable` if a
    /// collaborator cannot be resolved, or with an I/O error if the
    /// probe fails.
    pub fn start(collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            crypto,
            table,
            generator,
            backends,
            primary_backend,
        } = collaborators;

        if backends.is_empty() {
            return Err(CredVaultError::ServiceUnavailable(
                "no persistence backends configured".into(),
            ));
        }
        let backends: BTreeMap<String, Arc<dyn PersistenceBackend>> = backends
            .into_iter()
            .map(|b| (b.id().to_string(), b))
            .collect();
        let primary = backends.get(&primary_backend).ok_or_else(|| {
            CredVaultError::ServiceUnavailable(format!(
                "unknown primary backend '{primary_backend}'"
            ))
        })?;

        let data_file_exists = primary.exists(SECRETS_NAME).map_err(|e| {
            tracing::error!(error = %e, backend = %primary_backend, "existence probe failed");
            e
        })?;

        Ok(Self {
            crypto,
            table,
            generator,
            backends,
            data_file_exists,
            data_file_loaded: false,
            unsaved_data_exists: false,
            edited_row: None,
        })
    }

    // ------------------------------------------------------------------
    // Load and store
    // ------------------------------------------------------------------

    /// Load the persisted vault from the named backend into the table.
    ///
    /// An empty read means there is nothing to decrypt: the in-memory
    /// table is left as it is (empty) and the data counts as loaded.
    pub fn load_data(&mut self, password: &[u8], backend_id: &str) -> Result<()> {
        if password.is_empty() {
            return Err(CredVaultError::InvalidPassword);
        }
        let ciphertext = self.backend(backend_id)?.read(SECRETS_NAME).map_err(|e| {
            tracing::error!(error = %e, backend = %backend_id, "load secrets failed");
            e
        })?;
        if !ciphertext.is_empty() {
            let cleartext =
                Zeroizing::new(self.crypto.decrypt(password, &ciphertext).map_err(|e| {
                    tracing::error!(error = %e, backend = %backend_id, "decrypt secrets failed");
                    e
                })?);
            self.table.load(&cleartext)?;
        }
        self.data_file_loaded = true;
        Ok(())
    }

    /// Encrypt the table once and write the identical ciphertext to
    /// every named backend.
    ///
    /// Two phases.  Phase one verifies `password` against every target
    /// backend with a read+decrypt round trip, so a typo'd or changed
    /// password aborts before any byte is written anywhere; without
    /// this, some backends could end up re-encrypted under the new
    /// password while others keep the old one, and there is no
    /// cross-backend transaction to roll that back.  A backend with no
    /// stored payload passes the check.  Phase two performs the
    /// writes, sequentially; an I/O failure mid-sequence leaves the
    /// already-written backends updated and is reported as-is.
    pub fn store_data(&mut self, password: &[u8], backend_ids: &[&str]) -> Result<()> {
        self.check_data_loaded()?;
        if !self.unsaved_data_exists {
            return Err(CredVaultError::NoUnsavedData);
        }

        for backend_id in backend_ids {
            self.check_password(password, backend_id)?;
        }

        let cleartext = Zeroizing::new(self.table.to_bytes());
        let ciphertext = self.crypto.encrypt(password, &cleartext).map_err(|e| {
            tracing::error!(error = %e, "encrypt secrets failed");
            e
        })?;
        for backend_id in backend_ids {
            self.backend(backend_id)?
                .write(SECRETS_NAME, &ciphertext)
                .map_err(|e| {
                    tracing::error!(error = %e, backend = %backend_id, "store secrets failed");
                    e
                })?;
        }
        self.unsaved_data_exists = false;
        Ok(())
    }

    /// Re-encrypt the loaded vault under a new master password and
    /// write it to every named backend.
    ///
    /// Verifies that `current` decrypts the existing content on each
    /// backend before any write occurs, with the same two-phase rule
    /// as [`Session::store_data`].
    pub fn change_master_password(
        &mut self,
        current: &[u8],
        new: &[u8],
        backend_ids: &[&str],
    ) -> Result<()> {
        self.check_data_loaded()?;
        if new.is_empty() {
            return Err(CredVaultError::InvalidPassword);
        }

        for backend_id in backend_ids {
            self.check_password(current, backend_id)?;
        }

        let cleartext = Zeroizing::new(self.table.to_bytes());
        let ciphertext = self.crypto.encrypt(new, &cleartext).map_err(|e| {
            tracing::error!(error = %e, "encrypt secrets failed");
            e
        })?;
        for backend_id in backend_ids {
            self.backend(backend_id)?
                .write(SECRETS_NAME, &ciphertext)
                .map_err(|e| {
                    tracing::error!(error = %e, backend = %backend_id, "store secrets failed");
                    e
                })?;
        }
        self.unsaved_data_exists = false;
        Ok(())
    }

    /// Verify `password` against one backend via a read+decrypt round
    /// trip.  An empty read passes; a decryption failure is reported
    /// as `InvalidPassword`.
    fn check_password(&self, password: &[u8], backend_id: &str) -> Result<()> {
        let ciphertext = self.backend(backend_id)?.read(SECRETS_NAME)?;
        if ciphertext.is_empty() {
            tracing::trace!(backend = %backend_id, "password check against empty backend");
            return Ok(());
        }
        match self.crypto.decrypt(password, &ciphertext) {
            Ok(cleartext) => {
                drop(Zeroizing::new(cleartext));
                Ok(())
            }
            Err(CredVaultError::DecryptionFailed) => {
                tracing::error!(backend = %backend_id, "password verification failed");
                Err(CredVaultError::InvalidPassword)
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Add a new record, or update the edited record if edit mode is
    /// set.
    ///
    /// In edit mode an empty secret means "keep the stored secret";
    /// identifier and note are written either way.  A successful write
    /// clears edit mode.  All input buffers are zeroed by the table.
    pub fn write(
        &mut self,
        secret: &mut [u8],
        identifier: &mut [u8],
        note: &mut [u8],
    ) -> Result<()> {
        self.check_data_loaded()?;
        match self.edited_row {
            Some(row) => {
                let secret = if secret.is_empty() {
                    None
                } else {
                    Some(&mut *secret)
                };
                self.table.update_row(row, secret, identifier, note)?;
                self.edited_row = None;
            }
            None => self.table.create_row(secret, identifier, note)?,
        }
        self.unsaved_data_exists = true;
        Ok(())
    }

    /// Remove the record at `row`.
    pub fn remove(&mut self, row: usize) -> Result<()> {
        self.table.remove_row(row)?;
        self.unsaved_data_exists = true;
        Ok(())
    }

    /// Mark `row` as the target of the next [`Session::write`].
    pub fn set_edit_mode(&mut self, row: usize) {
        self.edited_row = Some(row);
    }

    /// Generate a random secret into `out`, drawing from `classes`.
    pub fn generate_secret(&self, out: &mut [u8], classes: &[CharClass]) -> Result<()> {
        self.generator.generate(out, classes)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Refuses to operate on an in-memory table that would silently
    /// fork persisted state.
    fn check_data_loaded(&self) -> Result<()> {
        if self.data_file_exists && !self.data_file_loaded {
            return Err(CredVaultError::ExistingDataNotLoaded);
        }
        Ok(())
    }

    fn backend(&self, backend_id: &str) -> Result<&Arc<dyn PersistenceBackend>> {
        self.backends.get(backend_id).ok_or_else(|| {
            CredVaultError::ServiceUnavailable(format!("unknown backend '{backend_id}'"))
        })
    }

    /// `true` if the primary backend held a payload at start.
    pub fn data_file_exists(&self) -> bool {
        self.data_file_exists
    }

    /// `true` once persisted data has been loaded into the table.
    pub fn data_file_loaded(&self) -> bool {
        self.data_file_loaded
    }

    /// `true` if the table has changes not yet stored.
    pub fn unsaved_data_exists(&self) -> bool {
        self.unsaved_data_exists
    }

    /// The row marked for editing, if any.
    pub fn edited_row(&self) -> Option<usize> {
        self.edited_row
    }

    /// The underlying record table, for read-only presentation.
    pub fn table(&self) -> &SecretTable {
        &self.table
    }

    /// Supported backends as an id to display-name map, intended to
    /// give the user a choice of storage targets.
    pub fn supported_backends(&self) -> BTreeMap<String, String> {
        self.backends
            .iter()
            .map(|(id, backend)| (id.clone(), backend.display_name().to_string()))
            .collect()
    }

    /// Build a crypto handle for backend supporting data, keyed by the
    /// digest of `master_password`.
    pub fn bound_crypto(&self, master_password: &[u8]) -> BoundCrypto {
        BoundCrypto::new(Arc::clone(&self.crypto), master_password)
    }

    /// Create a read-only query over the stored records.
    pub fn query(&self) -> SecretQuery {
        SecretQuery::new(Arc::clone(&self.table))
    }
}
