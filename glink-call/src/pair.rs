//! Connection pair keys and negotiation roles
//!
//! Every unordered pair of participants in a session shares exactly one
//! connection record. The key is derived the same way on both sides, so
//! neither peer has to negotiate who creates the record.

use std::fmt;

/// Key of the single connection record shared by two participants.
///
/// Built by sorting the two user ids lexicographically and joining them
/// with `_`, so `PairKey::new(a, b) == PairKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey(String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(format!("{a}_{b}"))
        } else {
            Self(format!("{b}_{a}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the pair drives the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRole {
    Offerer,
    Answerer,
}

/// Deterministic role assignment: the lexicographically smaller user id
/// creates the offer, the other answers. Symmetric across both peers.
pub fn pair_role(local: &str, remote: &str) -> PairRole {
    if local < remote {
        PairRole::Offerer
    } else {
        PairRole::Answerer
    }
}
