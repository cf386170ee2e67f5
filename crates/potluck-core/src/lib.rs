//! potluck-core: event planning state that travels inside share links.
//!
//! An event's whole state is a snapshot ([`model::EventState`]). Snapshots
//! are edited copy-on-write ([`model::ops`]), encoded into compact URL-safe
//! tokens ([`codec`]), mirrored into a local store ([`store`]) and handed
//! out as share links ([`link`]). [`pipeline`] ties these together and
//! [`publish`] keeps an open event's link fresh in the background.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per concern ([`error`]), each
//!   mapped to a stable [`error::ErrorCode`]. Configuration loading uses
//!   `anyhow` with path context.
//! - **Logging**: `tracing` macros. Codec decisions log at `debug`, repaired
//!   data and fallbacks at `warn`, publishes at `info`.

pub mod codec;
pub mod config;
pub mod error;
pub mod id;
pub mod link;
pub mod lock;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod store;

pub use codec::{decode_state, encode_state};
pub use error::{CoreError, DecodeError, ErrorCode, LinkError, MutationError, StoreError};
pub use link::ShareLink;
pub use model::{EventState, NewEvent};
