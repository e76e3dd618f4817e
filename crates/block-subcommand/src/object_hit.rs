//! Object-hit AoE attribution (`spec.md` §4.4 "Object hit (physical or
//! technique)"). When a client casts one of the seven AoE techniques, the
//! sender's pending cast is remembered until it expires; a box hit from
//! that sender within the window is treated as AoE-caused rather than a
//! separate melee hit.

use crate::aoe_timing::AoeTechnique;

/// One sender's most recent AoE cast, with the tick it expires at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAoeCast {
    pub technique: AoeTechnique,
    pub expires_at_ms: u64,
}

/// Record a new AoE cast by `level`-leveled caster at time `now_ms`.
pub fn start_cast(technique: AoeTechnique, level: u32, now_ms: u64) -> PendingAoeCast {
    PendingAoeCast {
        technique,
        expires_at_ms: now_ms + technique.expiry_ms(level) as u64,
    }
}

/// Whether a box hit at `now_ms` from a sender with `pending` falls within
/// that cast's attribution window.
pub fn attributes_to_aoe(pending: Option<PendingAoeCast>, now_ms: u64) -> bool {
    match pending {
        Some(cast) => now_ms <= cast.expires_at_ms,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_window_attributes_to_aoe() {
        let cast = start_cast(AoeTechnique::Rafoie, 3, 1_000);
        assert!(attributes_to_aoe(Some(cast), 1_000 + 1499));
    }

    #[test]
    fn hit_after_window_does_not_attribute() {
        let cast = start_cast(AoeTechnique::Rafoie, 3, 1_000);
        assert!(!attributes_to_aoe(Some(cast), 1_000 + 1501));
    }

    #[test]
    fn no_pending_cast_never_attributes() {
        assert!(!attributes_to_aoe(None, 5_000));
    }
}
