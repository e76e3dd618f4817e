//! A lobby's floor-item collection and its monotonic item-id counter
//! (`spec.md` §3, §8 invariants 4 and 5).

use block_types::{FloorItem, ItemData, ItemId};

#[derive(Debug, Default)]
pub struct FloorItemTable {
    next_item_id: u32,
    items: Vec<FloorItem>,
}

impl FloorItemTable {
    pub fn new() -> Self {
        Self {
            next_item_id: 0,
            items: Vec::new(),
        }
    }

    /// Mint a new, strictly-increasing item id scoped to this lobby.
    pub fn next_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        id
    }

    pub fn spawn(&mut self, data: ItemData, quantity: u32, x: f32, z: f32, floor: u8) -> ItemId {
        let item_id = self.next_id();
        self.items.push(FloorItem {
            item_id,
            data,
            quantity,
            x,
            z,
            floor,
        });
        item_id
    }

    /// Atomically remove and return a floor item by id, if present.
    pub fn take(&mut self, item_id: ItemId) -> Option<FloorItem> {
        let idx = self.items.iter().position(|i| i.item_id == item_id)?;
        Some(self.items.remove(idx))
    }

    pub fn get(&self, item_id: ItemId) -> Option<&FloorItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloorItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_are_strictly_monotone() {
        let mut table = FloorItemTable::new();
        let a = table.next_id();
        let b = table.next_id();
        assert!(b.0 > a.0);
    }

    #[test]
    fn spawn_then_take_round_trips() {
        let mut table = FloorItemTable::new();
        let data = ItemData::new([1, 2, 3], 4);
        let id = table.spawn(data, 1, 10.0, 20.0, 0);
        assert_eq!(table.len(), 1);
        let taken = table.take(id).unwrap();
        assert_eq!(taken.data, data);
        assert!(table.is_empty());
        assert!(table.take(id).is_none());
    }
}
