//! The fixed-geometry record table.

pub mod grid;

pub use grid::{
    SecretTable, MAX_IDENTIFIER_LEN, MAX_NOTE_LEN, MAX_ROWS, MAX_SECRET_LEN, ROW_LEN, TABLE_LEN,
};
