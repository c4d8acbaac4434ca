//! Identity generation for new nodes.
//!
//! Node identities are 26-character Crockford base-32 strings that sort in
//! creation order: a 48-bit millisecond timestamp followed by 80 random bits.
//! Within one millisecond the generator increments the random part so that
//! identities from one generator stay strictly increasing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::document::{NODE_ID_LEN, NodeId};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1 << RANDOM_BITS) - 1;

/// Source of fresh node identities.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Time-ordered random identities.
#[derive(Debug, Default)]
pub struct UlidGenerator {
    last: Mutex<(u64, u128)>,
}

impl UlidGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> NodeId {
        let now = Self::now_millis() & ((1 << 48) - 1);
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (millis, random) = if now > last.0 {
            (now, rand::random::<u128>() & RANDOM_MASK)
        } else if last.1 < RANDOM_MASK {
            (last.0, last.1 + 1)
        } else {
            (last.0 + 1, rand::random::<u128>() & RANDOM_MASK)
        };
        *last = (millis, random);
        encode((u128::from(millis) << RANDOM_BITS) | random)
    }
}

/// Deterministic identities `00000000000000000000000001`, `...02`, ...
///
/// Intended for fixtures and tests where stable output matters.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceGenerator {
    fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        encode(u128::from(n))
    }
}

/// Encode `value` as 26 Crockford characters, most significant first.
fn encode(value: u128) -> NodeId {
    let mut out = String::with_capacity(NODE_ID_LEN);
    for i in (0..NODE_ID_LEN).rev() {
        let digit = (value >> (i * 5)) & 31;
        out.push(char::from(ALPHABET[digit as usize]));
    }
    NodeId::new(out)
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn ulids_are_well_formed_and_increasing() {
        let ids = UlidGenerator::new();
        let mut prev = ids.next_id();
        assert!(prev.is_well_formed(), "{prev}");
        for _ in 0..1000 {
            let next = ids.next_id();
            assert!(next.is_well_formed(), "{next}");
            assert!(next > prev, "{next} should sort after {prev}");
            prev = next;
        }
    }

    #[test]
    fn sequence_is_deterministic() {
        let ids = SequenceGenerator::new();
        assert_eq!(ids.next_id().as_str(), "00000000000000000000000001");
        assert_eq!(ids.next_id().as_str(), "00000000000000000000000002");
        let tenth = (0..8).map(|_| ids.next_id()).last().unwrap();
        assert_eq!(tenth.as_str(), "0000000000000000000000000A");
    }
}
