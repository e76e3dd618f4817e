//! Legit-mode item limits (`spec.md` §4.4, §6). The concrete per-item tables
//! are loaded from external files named in config (`limits entries {name ->
//! path} with a default selector`, §6) — out of scope here. What's in scope
//! is the boundary the dispatch layer calls through: "run the item through
//! the lobby's limit table".

use block_types::ItemData;
use std::collections::HashSet;

/// A named legit-mode item table. `is_allowed` is the one predicate the
/// subcommand layer needs; everything about how the table was built (item
/// generation rules, rare tables, drop charts) is out of scope.
pub trait LimitsTable: Send + Sync {
    fn name(&self) -> &str;
    fn is_allowed(&self, item: &ItemData) -> bool;
}

/// A limits table backed by an explicit deny-set keyed on the item's stack
/// key (`data1[0]`), the same key used for stackable-merge comparisons.
/// Sufficient to exercise the legit-mode enforcement paths without a real
/// item-generation table.
pub struct DenylistLimits {
    name: String,
    denied: HashSet<u32>,
}

impl DenylistLimits {
    pub fn new(name: impl Into<String>, denied: impl IntoIterator<Item = u32>) -> Self {
        Self {
            name: name.into(),
            denied: denied.into_iter().collect(),
        }
    }

    pub fn permissive(name: impl Into<String>) -> Self {
        Self::new(name, [])
    }
}

impl LimitsTable for DenylistLimits {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_allowed(&self, item: &ItemData) -> bool {
        !self.denied.contains(&item.stack_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denylist_rejects_listed_stack_key() {
        let limits = DenylistLimits::new("v1", [0x00000008]);
        let banned = ItemData::new([0x00000008, 0, 0], 2);
        let allowed = ItemData::new([0x00000009, 0, 0], 2);
        assert!(!limits.is_allowed(&banned));
        assert!(limits.is_allowed(&allowed));
    }

    #[test]
    fn permissive_allows_everything() {
        let limits = DenylistLimits::permissive("no-limits");
        assert!(limits.is_allowed(&ItemData::new([1, 2, 3], 4)));
    }
}
