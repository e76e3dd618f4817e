//! Blue-Burst's bank protocol (`spec.md` §4.4 "Blue-Burst bank protocol"):
//! `open_bank` snapshots the whole bank in one packet, then `bank_action`
//! packets select among close/done/deposit/take. All of these are silent
//! (no broadcast) except a withdrawal's pickup notification.

use block_types::{Bank, ItemData, ItemId, Inventory};

/// A full copy of a character's bank, as sent in the single `open_bank`
/// reply packet.
#[derive(Debug, Clone, PartialEq)]
pub struct BankSnapshot {
    pub items: Vec<(ItemData, u32)>,
    pub meseta: u32,
}

pub fn open_bank(bank: &Bank) -> BankSnapshot {
    BankSnapshot {
        items: bank.items.clone(),
        meseta: bank.meseta,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankActionOutcome {
    /// `close`/`done`: no state change, nothing to send.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositError {
    SlotNotFound,
    InsufficientQuantity,
    BankFull,
}

/// Deposit `amount` of inventory slot `idx` into `bank`. If that slot is
/// equipped, it (and every index in `linked_equipped_indices`, i.e. units
/// worn on the frame being banked) is unequipped first (`spec.md` §4.4:
/// "unequip frame+units if moving an equipped frame").
pub fn deposit_item(
    inventory: &mut Inventory,
    bank: &mut Bank,
    idx: usize,
    amount: u32,
    linked_equipped_indices: &[usize],
) -> Result<(), DepositError> {
    let slot = inventory.items.get(idx).copied().ok_or(DepositError::SlotNotFound)?;
    if slot.quantity < amount {
        return Err(DepositError::InsufficientQuantity);
    }

    if !bank.deposit(slot.data, amount) {
        return Err(DepositError::BankFull);
    }

    if slot.equipped {
        for &unit_idx in linked_equipped_indices {
            if let Some(unit) = inventory.items.get_mut(unit_idx) {
                unit.equipped = false;
            }
        }
        if let Some(this_slot) = inventory.items.get_mut(idx) {
            this_slot.equipped = false;
        }
    }

    inventory.remove(idx, amount);
    Ok(())
}

pub fn deposit_meseta(bank: &mut Bank, amount: u32) {
    bank.deposit_meseta(amount);
}

/// Withdraw `amount` from bank slot `idx`, adding it back to `inventory`
/// under a freshly minted item id (`spec.md` §4.4: "withdrawals mint a
/// fresh inventory item-ID from the lobby counter"). The returned id is
/// what the pickup-notification packet carries.
pub fn withdraw_item(
    bank: &mut Bank,
    inventory: &mut Inventory,
    idx: usize,
    amount: u32,
    mint_item_id: impl FnOnce() -> ItemId,
) -> Option<(ItemId, ItemData, u32)> {
    let (data, taken) = bank.withdraw(idx, amount)?;
    inventory.add(data, taken);
    Some((mint_item_id(), data, taken))
}

pub fn withdraw_meseta(bank: &mut Bank, inventory: &mut Inventory, amount: u32) -> bool {
    if !bank.withdraw_meseta(amount) {
        return false;
    }
    inventory.add_meseta(amount);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bank_snapshots_current_contents() {
        let mut bank = Bank::new();
        bank.deposit(ItemData::new([1, 0, 0], 0), 4);
        bank.deposit_meseta(100);
        let snapshot = open_bank(&bank);
        assert_eq!(snapshot.meseta, 100);
        assert_eq!(snapshot.items, vec![(ItemData::new([1, 0, 0], 0), 4)]);
    }

    #[test]
    fn deposit_unequips_frame_and_its_units() {
        let mut inventory = Inventory::new();
        inventory.add(ItemData::new([20, 0, 0], 0), 1); // frame, idx 0
        inventory.add(ItemData::new([21, 0, 0], 0), 1); // unit, idx 1
        inventory.items[0].equipped = true;
        inventory.items[1].equipped = true;

        let mut bank = Bank::new();
        deposit_item(&mut inventory, &mut bank, 0, 1, &[1]).unwrap();

        // the frame slot is gone (fully deposited); the unit remains but unequipped
        assert_eq!(inventory.items.len(), 1);
        assert!(!inventory.items[0].equipped);
        assert_eq!(bank.items.len(), 1);
    }

    #[test]
    fn deposit_fails_on_insufficient_quantity() {
        let mut inventory = Inventory::new();
        inventory.add(ItemData::new([1, 0, 0], 0), 1);
        let mut bank = Bank::new();
        let result = deposit_item(&mut inventory, &mut bank, 0, 5, &[]);
        assert_eq!(result, Err(DepositError::InsufficientQuantity));
    }

    #[test]
    fn withdraw_mints_a_fresh_item_id_and_credits_inventory() {
        let mut bank = Bank::new();
        bank.deposit(ItemData::new([5, 0, 0], 0), 3);
        let mut inventory = Inventory::new();

        let mut next_id = 100u32;
        let (item_id, data, taken) = withdraw_item(&mut bank, &mut inventory, 0, 2, || {
            let id = block_types::ItemId(next_id);
            next_id += 1;
            id
        })
        .unwrap();

        assert_eq!(item_id, block_types::ItemId(100));
        assert_eq!(data, ItemData::new([5, 0, 0], 0));
        assert_eq!(taken, 2);
        assert_eq!(inventory.items[0].quantity, 2);
        assert_eq!(bank.items[0].1, 1);
    }

    #[test]
    fn withdraw_meseta_moves_between_bank_and_inventory() {
        let mut bank = Bank::new();
        bank.deposit_meseta(500);
        let mut inventory = Inventory::new();
        assert!(withdraw_meseta(&mut bank, &mut inventory, 300));
        assert_eq!(bank.meseta, 200);
        assert_eq!(inventory.meseta, 300);
        assert!(!withdraw_meseta(&mut bank, &mut inventory, 1000));
    }
}
