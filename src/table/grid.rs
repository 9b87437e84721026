//! Record table backed by a square byte matrix.
//!
//! The table always serializes to the same number of bytes no matter
//! how many records it holds, so the encrypted blob leaks nothing
//! about occupancy.  The trade-off is a hard limit on the number and
//! length of records.  Row layout, identical for every data row:
//!
//! ```text
//! [len(secret): 1][secret: 63][len(identifier): 1][identifier: 63][len(note): 1][note: 127]
//! ```
//!
//! Unused positions, both whole filler rows and the unused suffix of
//! each field, hold cryptographically secure random bytes.  The last
//! row is the service row: format version and occupied-row count.
//!
//! All operations are serialized by a single internal lock, so the
//! table is safe to share across threads.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::OsRng;
use rand::{RngCore, TryRngCore};
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Number of data rows the table can hold.
pub const MAX_ROWS: usize = 255;

/// Bytes per row.
pub const ROW_LEN: usize = 256;

/// Total serialized size in bytes, constant for any occupancy.
pub const TABLE_LEN: usize = (MAX_ROWS + 1) * ROW_LEN;

/// Maximum encoded secret length in bytes.
pub const MAX_SECRET_LEN: usize = 63;

/// Maximum encoded identifier length in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Maximum encoded note length in bytes.
pub const MAX_NOTE_LEN: usize = 127;

/// Index of the reserved service row.
const SERVICE_ROW: usize = MAX_ROWS;

/// Service-row column holding the storage format version.
const SERVICE_COL_VERSION: usize = 0;

/// Service-row column holding the occupied-row count.
const SERVICE_COL_COUNT: usize = 1;

/// Current storage format version.
const FORMAT_VERSION: u8 = 0;

/// One length-prefixed field within a row.
struct Field {
    name: &'static str,
    len_index: usize,
    start: usize,
    capacity: usize,
}

const SECRET: Field = Field {
    name: "secret",
    len_index: 0,
    start: 1,
    capacity: MAX_SECRET_LEN,
};

const IDENTIFIER: Field = Field {
    name: "identifier",
    len_index: 64,
    start: 65,
    capacity: MAX_IDENTIFIER_LEN,
};

const NOTE: Field = Field {
    name: "note",
    len_index: 128,
    start: 129,
    capacity: MAX_NOTE_LEN,
};

// ---------------------------------------------------------------------------
// SecretTable
// ---------------------------------------------------------------------------

/// The fixed-size record table.  Thread-safe.
pub struct SecretTable {
    grid: Mutex<Grid>,
}

struct Grid {
    rows: Box<[[u8; ROW_LEN]; MAX_ROWS + 1]>,
}

impl SecretTable {
    /// Create an empty table with every data row filled with random
    /// bytes.
    pub fn new() -> Self {
        let mut grid = Grid {
            rows: Box::new([[0u8; ROW_LEN]; MAX_ROWS + 1]),
        };
        let mut rng = OsRng.unwrap_err();
        for row in grid.rows[..SERVICE_ROW].iter_mut() {
            rng.fill_bytes(row);
        }
        grid.rows[SERVICE_ROW][SERVICE_COL_VERSION] = FORMAT_VERSION;
        Self {
            grid: Mutex::new(grid),
        }
    }

    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a new record into the next free row.
    ///
    /// The secret and identifier must be non-empty; the note may be
    /// empty.  All three input buffers are zeroed before this call
    /// returns, whether it succeeds or fails.
    pub fn create_row(
        &self,
        secret: &mut [u8],
        identifier: &mut [u8],
        note: &mut [u8],
    ) -> Result<()> {
        let result = self.grid().create_row(secret, identifier, note);
        secret.zeroize();
        identifier.zeroize();
        note.zeroize();
        result
    }

    /// Overwrite the record at `row`.
    ///
    /// `None` for the secret means "leave the stored secret
    /// untouched"; identifier and note are mandatory either way.  All
    /// input buffers are zeroed before this call returns.
    pub fn update_row(
        &self,
        row: usize,
        secret: Option<&mut [u8]>,
        identifier: &mut [u8],
        note: &mut [u8],
    ) -> Result<()> {
        let result = self
            .grid()
            .update_row(row, secret.as_deref(), identifier, note);
        if let Some(secret) = secret {
            secret.zeroize();
        }
        identifier.zeroize();
        note.zeroize();
        result
    }

    /// Remove the record at `row`, shifting every subsequent record
    /// one position earlier so occupied rows stay gapless.
    pub fn remove_row(&self, row: usize) -> Result<()> {
        let mut grid = self.grid();
        let count = grid.count();
        if row >= count {
            return Err(CredVaultError::NonexistentRow(row));
        }

        // Pairwise swap chain: the removed row ends up past the new
        // count boundary where its bytes are indistinguishable filler.
        for i in row..count - 1 {
            grid.rows.swap(i, i + 1);
        }
        grid.rows[SERVICE_ROW][SERVICE_COL_COUNT] = (count - 1) as u8;
        Ok(())
    }

    /// The stored secret bytes at `row`.
    ///
    /// The slice end is determined by the stored length byte alone;
    /// the caller must ensure `row` is below [`Self::row_count`].
    pub fn read_secret(&self, row: usize) -> Vec<u8> {
        self.grid().read_field(row, &SECRET)
    }

    /// The stored identifier bytes at `row`.
    pub fn read_identifier(&self, row: usize) -> Vec<u8> {
        self.grid().read_field(row, &IDENTIFIER)
    }

    /// The stored note bytes at `row`.
    pub fn read_note(&self, row: usize) -> Vec<u8> {
        self.grid().read_field(row, &NOTE)
    }

    /// Number of occupied rows.
    pub fn row_count(&self) -> usize {
        self.grid().count()
    }

    /// Serialize the whole table to its flat row-major form.
    ///
    /// Always exactly [`TABLE_LEN`] bytes, for any occupancy.
    pub fn to_bytes(&self) -> Vec<u8> {
        let grid = self.grid();
        let mut sequence = Vec::with_capacity(TABLE_LEN);
        for row in grid.rows.iter() {
            sequence.extend_from_slice(row);
        }
        sequence
    }

    /// Replace the table contents with a previously serialized form.
    ///
    /// The input fully determines state: every byte of the table,
    /// service row included, is overwritten.  Rejects any input that
    /// is not exactly [`TABLE_LEN`] bytes.
    pub fn load(&self, sequence: &[u8]) -> Result<()> {
        if sequence.len() != TABLE_LEN {
            return Err(CredVaultError::InvalidDataLength {
                expected: TABLE_LEN,
                actual: sequence.len(),
            });
        }
        let mut grid = self.grid();
        for (row, chunk) in grid.rows.iter_mut().zip(sequence.chunks_exact(ROW_LEN)) {
            row.copy_from_slice(chunk);
        }
        Ok(())
    }
}

impl Default for SecretTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unlocked internals
// ---------------------------------------------------------------------------

impl Grid {
    fn count(&self) -> usize {
        usize::from(self.rows[SERVICE_ROW][SERVICE_COL_COUNT])
    }

    fn create_row(&mut self, secret: &[u8], identifier: &[u8], note: &[u8]) -> Result<()> {
        validate_field(&SECRET, secret, true)?;
        validate_field(&IDENTIFIER, identifier, true)?;
        validate_field(&NOTE, note, false)?;

        let row = self.next_row()?;
        self.write_field(row, &SECRET, secret);
        self.write_field(row, &IDENTIFIER, identifier);
        self.write_field(row, &NOTE, note);
        Ok(())
    }

    fn update_row(
        &mut self,
        row: usize,
        secret: Option<&[u8]>,
        identifier: &[u8],
        note: &[u8],
    ) -> Result<()> {
        if row >= self.count() {
            return Err(CredVaultError::NonexistentRow(row));
        }
        if let Some(secret) = secret {
            validate_field(&SECRET, secret, true)?;
        }
        validate_field(&IDENTIFIER, identifier, true)?;
        validate_field(&NOTE, note, false)?;

        if let Some(secret) = secret {
            self.write_field(row, &SECRET, secret);
        }
        self.write_field(row, &IDENTIFIER, identifier);
        self.write_field(row, &NOTE, note);
        Ok(())
    }

    /// Allocate the next free row, incrementing the occupied count.
    fn next_row(&mut self) -> Result<usize> {
        let count = self.count();
        if count == MAX_ROWS {
            return Err(CredVaultError::MaxSizeExceeded {
                field: "table",
                max: MAX_ROWS,
                actual: count,
            });
        }
        self.rows[SERVICE_ROW][SERVICE_COL_COUNT] = (count + 1) as u8;
        Ok(count)
    }

    /// Write length byte + data, padding the unused field suffix with
    /// fresh random bytes.
    fn write_field(&mut self, row: usize, field: &Field, data: &[u8]) {
        let r = &mut self.rows[row];
        r[field.len_index] = data.len() as u8;
        r[field.start..field.start + data.len()].copy_from_slice(data);
        OsRng
            .unwrap_err()
            .fill_bytes(&mut r[field.start + data.len()..field.start + field.capacity]);
    }

    fn read_field(&self, row: usize, field: &Field) -> Vec<u8> {
        let r = &self.rows[row];
        let len = usize::from(r[field.len_index]);
        r[field.start..field.start + len].to_vec()
    }
}

fn validate_field(field: &Field, data: &[u8], required: bool) -> Result<()> {
    if required && data.is_empty() {
        return Err(CredVaultError::EmptySequence(field.name));
    }
    if data.len() > field.capacity {
        return Err(CredVaultError::MaxSizeExceeded {
            field: field.name,
            max: field.capacity,
            actual: data.len(),
        });
    }
    Ok(())
}
