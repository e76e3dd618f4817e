//! Legit-mode and cheat-flag policy enforcement for the handlers named in
//! `spec.md` §4.4: item drop/pickup, damage taken, and technique used.

use block_data::limits::LimitsTable;
use block_types::ItemData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDropDecision {
    /// Broadcast the drop as requested.
    Allow,
    /// Broadcast the drop, then immediately follow with a destroy-item for
    /// the same id so every client's state matches the server's, and warn
    /// every lobby occupant (`spec.md` §4.4).
    RejectAndDestroy,
}

pub fn decide_item_drop(limits: &dyn LimitsTable, legit_mode: bool, item: &ItemData) -> ItemDropDecision {
    if !legit_mode || limits.is_allowed(item) {
        ItemDropDecision::Allow
    } else {
        ItemDropDecision::RejectAndDestroy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeItemDecision {
    Allow,
    Disconnect,
}

pub fn decide_take_item(limits: &dyn LimitsTable, legit_mode: bool, item: &ItemData) -> TakeItemDecision {
    if !legit_mode || limits.is_allowed(item) {
        TakeItemDecision::Allow
    } else {
        TakeItemDecision::Disconnect
    }
}

/// Merge `incoming` into `existing_qty` if they share a stack key
/// (`spec.md` §4.4: "stackables merge by first-data-word match"). Returns
/// `true` if the merge happened; the caller still needs to add `incoming`
/// as a new inventory entry when it returns `false`.
pub fn try_merge_stack(existing: &ItemData, existing_qty: &mut u32, incoming: &ItemData, incoming_qty: u32) -> bool {
    if existing.stack_key() == incoming.stack_key() {
        *existing_qty += incoming_qty;
        true
    } else {
        false
    }
}

/// Damage is dropped silently (and a compensating HP-refill broadcast
/// raised instead) when the sender has the invulnerable flag and the
/// lobby is not in legit mode (`spec.md` §4.4 "Damage taken").
pub fn should_suppress_damage(sender_invulnerable: bool, legit_mode: bool) -> bool {
    sender_invulnerable && !legit_mode
}

/// Same shape as damage suppression, gated on the infinite-TP flag
/// instead (`spec.md` §4.4 "Technique used").
pub fn should_suppress_technique_cost(sender_infinite_tp: bool, legit_mode: bool) -> bool {
    sender_infinite_tp && !legit_mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_data::limits::DenylistLimits;

    #[test]
    fn legit_mode_rejects_denied_item() {
        let limits = DenylistLimits::new("v1", [1]);
        let item = ItemData::new([1, 0, 0], 0);
        assert_eq!(
            decide_item_drop(&limits, true, &item),
            ItemDropDecision::RejectAndDestroy
        );
    }

    #[test]
    fn non_legit_mode_allows_anything() {
        let limits = DenylistLimits::new("v1", [1]);
        let item = ItemData::new([1, 0, 0], 0);
        assert_eq!(decide_item_drop(&limits, false, &item), ItemDropDecision::Allow);
    }

    #[test]
    fn take_item_disconnects_on_legit_failure() {
        let limits = DenylistLimits::new("v1", [2]);
        let item = ItemData::new([2, 0, 0], 0);
        assert_eq!(
            decide_take_item(&limits, true, &item),
            TakeItemDecision::Disconnect
        );
    }

    #[test]
    fn stack_merge_only_happens_on_matching_key() {
        let mut qty = 5u32;
        let existing = ItemData::new([10, 0, 0], 0);
        let same = ItemData::new([10, 0, 0], 0);
        let different = ItemData::new([11, 0, 0], 0);
        assert!(try_merge_stack(&existing, &mut qty, &same, 3));
        assert_eq!(qty, 8);
        assert!(!try_merge_stack(&existing, &mut qty, &different, 1));
        assert_eq!(qty, 8);
    }

    #[test]
    fn damage_suppressed_only_when_invulnerable_and_not_legit() {
        assert!(should_suppress_damage(true, false));
        assert!(!should_suppress_damage(true, true));
        assert!(!should_suppress_damage(false, false));
    }
}
