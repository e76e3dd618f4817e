//! Blue-Burst's three-packet floor-item drop dance (`spec.md` §4.4
//! "Blue-Burst floor-item protocol", invariant 6): `drop_pos` stages a
//! pending drop, `drop_stack` validates against the staged record and
//! actually creates the floor item, `pick_up` credits the picker.
//!
//! Meseta is not an inventory slot; it is distinguished by the sentinel
//! stack key [`MESETA_STACK_KEY`] so the same floor-item representation
//! can carry either an item stack or a meseta pile.

use block_lobby::floor_items::FloorItemTable;
use block_types::{ItemData, ItemId, Inventory, MESETA_CAP};

/// Marks a floor item / inventory add as meseta rather than a real item.
/// No legitimate `ItemData.data1[0]` value uses this (items are indexed by
/// a 16-bit item-class code).
pub const MESETA_STACK_KEY: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSource {
    ItemSlot(usize),
    Meseta,
}

/// The sender's drop-staging record, created by `drop_pos` and consumed
/// by the next `drop_stack` (`spec.md` §4.8 invariant 6: no intervening
/// `drop_pos` may replace it before a matching `drop_stack` lands).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropStaging {
    pub source: DropSource,
    pub amount: u32,
}

pub fn handle_drop_pos(source: DropSource, amount: u32) -> DropStaging {
    DropStaging { source, amount }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropStackError {
    /// No `drop_pos` is staged, or it was already consumed by a prior `drop_stack`.
    NoStaging,
    /// `source`/`amount` disagree with the staged record.
    Mismatch,
    /// The sender doesn't actually have enough of what it staged.
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropStackResult {
    pub item_id: ItemId,
}

/// Validate and apply a `drop_stack`. On success the staged record is
/// consumed, the inventory/meseta is debited, a floor item is minted, and
/// the id to broadcast in the synthesized drop event is returned.
pub fn handle_drop_stack(
    staging: &mut Option<DropStaging>,
    floor_items: &mut FloorItemTable,
    inventory: &mut Inventory,
    source: DropSource,
    amount: u32,
    x: f32,
    z: f32,
    floor: u8,
) -> Result<DropStackResult, DropStackError> {
    let staged = staging.take().ok_or(DropStackError::NoStaging)?;
    if staged.source != source || staged.amount != amount {
        return Err(DropStackError::Mismatch);
    }

    let data = match source {
        DropSource::Meseta => {
            if !inventory.take_meseta(amount) {
                return Err(DropStackError::Insufficient);
            }
            ItemData::new([MESETA_STACK_KEY, 0, 0], 0)
        }
        DropSource::ItemSlot(idx) => {
            let Some(slot) = inventory.items.get(idx) else {
                return Err(DropStackError::Insufficient);
            };
            let data = slot.data;
            if slot.quantity < amount || !inventory.remove(idx, amount) {
                return Err(DropStackError::Insufficient);
            }
            data
        }
    };

    let item_id = floor_items.spawn(data, amount, x, z, floor);
    Ok(DropStackResult { item_id })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickUpOutcome {
    Item { item_id: ItemId, data: ItemData, quantity: u32 },
    Meseta { amount: u32 },
}

/// Atomically remove a floor item and credit the picker
/// (`spec.md` §4.4: "meseta is capped at 999,999").
pub fn handle_pick_up(
    floor_items: &mut FloorItemTable,
    inventory: &mut Inventory,
    item_id: ItemId,
) -> Option<PickUpOutcome> {
    let floor_item = floor_items.take(item_id)?;
    if floor_item.data.stack_key() == MESETA_STACK_KEY {
        inventory.add_meseta(floor_item.quantity);
        Some(PickUpOutcome::Meseta { amount: floor_item.quantity })
    } else {
        inventory.add(floor_item.data, floor_item.quantity);
        Some(PickUpOutcome::Item {
            item_id,
            data: floor_item.data,
            quantity: floor_item.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_stack_without_staging_is_rejected() {
        let mut staging = None;
        let mut floor_items = FloorItemTable::new();
        let mut inventory = Inventory::new();
        let result = handle_drop_stack(
            &mut staging,
            &mut floor_items,
            &mut inventory,
            DropSource::ItemSlot(0),
            1,
            0.0,
            0.0,
            0,
        );
        assert_eq!(result, Err(DropStackError::NoStaging));
    }

    #[test]
    fn drop_stack_mismatch_against_staged_record_is_rejected() {
        let mut staging = Some(handle_drop_pos(DropSource::ItemSlot(0), 5));
        let mut floor_items = FloorItemTable::new();
        let mut inventory = Inventory::new();
        inventory.add(ItemData::new([1, 0, 0], 0), 5);
        let result = handle_drop_stack(
            &mut staging,
            &mut floor_items,
            &mut inventory,
            DropSource::ItemSlot(0),
            3,
            0.0,
            0.0,
            0,
        );
        assert_eq!(result, Err(DropStackError::Mismatch));
    }

    #[test]
    fn full_drop_and_pick_up_round_trip_for_an_item() {
        let mut staging = Some(handle_drop_pos(DropSource::ItemSlot(0), 2));
        let mut floor_items = FloorItemTable::new();
        let mut sender_inv = Inventory::new();
        sender_inv.add(ItemData::new([7, 0, 0], 0), 2);

        let dropped = handle_drop_stack(
            &mut staging,
            &mut floor_items,
            &mut sender_inv,
            DropSource::ItemSlot(0),
            2,
            10.0,
            20.0,
            1,
        )
        .unwrap();
        assert!(sender_inv.items.is_empty());
        assert!(staging.is_none());

        let mut picker_inv = Inventory::new();
        let outcome = handle_pick_up(&mut floor_items, &mut picker_inv, dropped.item_id).unwrap();
        assert_eq!(
            outcome,
            PickUpOutcome::Item {
                item_id: dropped.item_id,
                data: ItemData::new([7, 0, 0], 0),
                quantity: 2,
            }
        );
        assert_eq!(picker_inv.items[0].quantity, 2);
        assert!(floor_items.is_empty());
    }

    #[test]
    fn meseta_drop_and_pick_up_respects_the_cap() {
        let mut staging = Some(handle_drop_pos(DropSource::Meseta, 500));
        let mut floor_items = FloorItemTable::new();
        let mut sender_inv = Inventory::new();
        sender_inv.add_meseta(500);

        let dropped = handle_drop_stack(
            &mut staging,
            &mut floor_items,
            &mut sender_inv,
            DropSource::Meseta,
            500,
            0.0,
            0.0,
            0,
        )
        .unwrap();
        assert_eq!(sender_inv.meseta, 0);

        let mut picker_inv = Inventory::new();
        picker_inv.add_meseta(MESETA_CAP - 200);
        let outcome = handle_pick_up(&mut floor_items, &mut picker_inv, dropped.item_id).unwrap();
        assert_eq!(outcome, PickUpOutcome::Meseta { amount: 500 });
        assert_eq!(picker_inv.meseta, MESETA_CAP);
    }

    #[test]
    fn insufficient_inventory_is_rejected_even_if_staged() {
        let mut staging = Some(handle_drop_pos(DropSource::ItemSlot(0), 5));
        let mut floor_items = FloorItemTable::new();
        let mut inventory = Inventory::new();
        inventory.add(ItemData::new([7, 0, 0], 0), 2);

        let result = handle_drop_stack(
            &mut staging,
            &mut floor_items,
            &mut inventory,
            DropSource::ItemSlot(0),
            5,
            0.0,
            0.0,
            0,
        );
        assert_eq!(result, Err(DropStackError::Insufficient));
    }
}
