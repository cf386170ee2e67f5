//! Identifier generation.
//!
//! Two kinds of identifiers exist:
//!
//! - **Record ids** (`new_id`) for events, items, assignments, activities,
//!   date options and votes. Seven base57 symbols: the last four symbols of
//!   the millisecond timestamp followed by three symbols of randomness.
//!   Unique enough within one planning session; there is no central
//!   authority to collide with across sessions.
//! - **Event codes** (`new_event_code`), the eight-symbol human-shareable
//!   lookup key, drawn uniformly from `A-Z0-9`. Collision detection, if
//!   wanted, belongs to the store.
//!
//! Mutations never call the clock or the RNG directly; they go through an
//! [`IdSource`] so tests can pin both.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Alphanumerics without the look-alike symbols `I`, `L`, `O` and `l`, `o`;
/// 57 symbols.
pub const COMPACT_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHJKMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

const BASE: u64 = COMPACT_ALPHABET.len() as u64;

/// Alphabet event codes are drawn from.
pub const EVENT_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of an event code.
pub const EVENT_CODE_LEN: usize = 8;

const TIMESTAMP_SYMBOLS: usize = 4;
const RANDOM_SYMBOLS: usize = 3;
/// Exclusive upper bound of the random part: `BASE^3`.
const RANDOM_BOUND: u64 = BASE * BASE * BASE;

/// Encode a number in [`COMPACT_ALPHABET`], most significant first.
#[must_use]
pub fn to_compact(mut num: u64) -> String {
    if num == 0 {
        return char::from(COMPACT_ALPHABET[0]).to_string();
    }
    let mut digits = Vec::new();
    while num > 0 {
        digits.push(COMPACT_ALPHABET[(num % BASE) as usize]);
        num /= BASE;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Decode a compact string. Returns `None` for foreign symbols or
/// values that overflow `u64`.
#[must_use]
pub fn from_compact(s: &str) -> Option<u64> {
    s.bytes().try_fold(0u64, |acc, byte| {
        let digit = COMPACT_ALPHABET.iter().position(|&c| c == byte)?;
        acc.checked_mul(BASE)?.checked_add(digit as u64)
    })
}

/// Build a record id from a millisecond timestamp and a random draw.
#[must_use]
pub fn id_from_parts(millis: u64, random: u64) -> String {
    let stamp = to_compact(millis);
    let stamp = &stamp[stamp.len().saturating_sub(TIMESTAMP_SYMBOLS)..];
    let noise = to_compact(random % RANDOM_BOUND);
    let pad = char::from(COMPACT_ALPHABET[0]);

    let mut out = String::with_capacity(TIMESTAMP_SYMBOLS + RANDOM_SYMBOLS);
    out.extend(std::iter::repeat_n(pad, TIMESTAMP_SYMBOLS - stamp.len()));
    out.push_str(stamp);
    out.extend(std::iter::repeat_n(pad, RANDOM_SYMBOLS - noise.len()));
    out.push_str(&noise);
    out
}

/// Generate a record id from the wall clock and the thread RNG.
#[must_use]
pub fn new_id() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    id_from_parts(millis, rand::thread_rng().gen_range(0..RANDOM_BOUND))
}

/// Generate an eight-symbol event code from the thread RNG.
#[must_use]
pub fn new_event_code() -> String {
    event_code_from_rng(&mut rand::thread_rng())
}

fn event_code_from_rng(rng: &mut impl Rng) -> String {
    (0..EVENT_CODE_LEN)
        .map(|_| char::from(EVENT_CODE_ALPHABET[rng.gen_range(0..EVENT_CODE_ALPHABET.len())]))
        .collect()
}

/// Returns `true` if `code` has the shape of an event code.
#[must_use]
pub fn is_event_code(code: &str) -> bool {
    code.len() == EVENT_CODE_LEN && code.bytes().all(|b| EVENT_CODE_ALPHABET.contains(&b))
}

// ---------------------------------------------------------------------------
// IdSource
// ---------------------------------------------------------------------------

/// Where mutations get fresh ids and "now" from.
pub trait IdSource {
    fn next_id(&mut self) -> String;
    fn next_event_code(&mut self) -> String;
    fn now(&self) -> DateTime<Utc>;
}

/// Production source: wall clock plus thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIds;

impl IdSource for SystemIds {
    fn next_id(&mut self) -> String {
        new_id()
    }

    fn next_event_code(&mut self) -> String {
        new_event_code()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic source for tests and simulations.
///
/// Each generated id advances the clock by one millisecond, so ids minted
/// back to back still differ in their timestamp part.
#[derive(Debug, Clone)]
pub struct SeededIds {
    rng: StdRng,
    now: DateTime<Utc>,
}

impl SeededIds {
    #[must_use]
    pub fn new(seed: u64, now: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now,
        }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl IdSource for SeededIds {
    fn next_id(&mut self) -> String {
        let millis = u64::try_from(self.now.timestamp_millis()).unwrap_or_default();
        let id = id_from_parts(millis, self.rng.gen_range(0..RANDOM_BOUND));
        self.now += Duration::milliseconds(1);
        id
    }

    fn next_event_code(&mut self) -> String {
        event_code_from_rng(&mut self.rng)
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
