//! Compact URL-safe state codec.
//!
//! A snapshot travels in a link as a *token*:
//!
//! ```text
//! EventState ──compress──▶ minimal short-key record ──pack──▶ token
//!            ◀─decompress─                            ◀─unpack─
//! ```
//!
//! - [`keys`] maps field names to one-character codes and back.
//! - [`compress`] trims a snapshot to the fields needed to rebuild it.
//! - [`pack`] turns the record into URL-safe base64 text.
//!
//! Tokens carry no version marker. The key table is the schema; see
//! [`SCHEMA_VERSION`].

pub mod compress;
pub mod keys;
pub mod pack;

pub use compress::{compress, decompress, normalize};
pub use keys::{KEY_TABLE, lengthen, shorten};
pub use pack::{pack, unpack};

use crate::error::DecodeError;
use crate::model::EventState;

/// Version of the short-key table.
///
/// Version 1 tokens used a different table and cannot be decoded. Bump this
/// when [`KEY_TABLE`] changes.
pub const SCHEMA_VERSION: u32 = 2;

/// Encode a snapshot into a link token.
#[must_use]
pub fn encode_state(state: &EventState) -> String {
    pack(&compress(state))
}

/// Decode a link token into a snapshot.
///
/// # Errors
///
/// Returns a [`DecodeError`] for any corrupt or foreign token.
pub fn decode_state(token: &str) -> Result<EventState, DecodeError> {
    decompress(&unpack(token)?)
}
