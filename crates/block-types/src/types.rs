use serde::{Deserialize, Serialize};

/// Minimal `bitflags`-shaped macro: the teacher's dependency set has no
/// `bitflags` crate, so this mirrors its API surface (`bits`, `contains`,
/// `insert`, `remove`, `set`) with a plain newtype over the integer type.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub struct $name(pub $repr);

        impl $name {
            $(pub const $flag: $name = $name($value);)*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub fn bits(self) -> $repr {
                self.0
            }

            pub fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

/// A guild card number, the player's persistent cross-session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildNumber(pub u32);

impl std::fmt::Display for GuildNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six wire protocol families, as nine distinguishable client variants.
/// `header_size()` is the one fact the framing layer needs from this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientVariant {
    V1Legacy,
    V1Trial,
    V2Legacy,
    V2Pc,
    V2PcTrial,
    V3Gc,
    V3Episode3,
    V3Xbox,
    V4Bb,
}

impl ClientVariant {
    /// Header size in bytes: 4 for every variant except Blue Burst's 8-byte envelope.
    pub fn header_size(self) -> usize {
        match self {
            ClientVariant::V4Bb => 8,
            _ => 4,
        }
    }

    /// Cipher block unit that packet lengths are rounded up to.
    pub fn cipher_block_unit(self) -> usize {
        match self {
            ClientVariant::V4Bb => 4,
            _ => 8,
        }
    }

    pub fn is_trial(self) -> bool {
        matches!(self, ClientVariant::V1Trial | ClientVariant::V2PcTrial)
    }

    pub fn is_pc_family(self) -> bool {
        matches!(self, ClientVariant::V2Pc | ClientVariant::V2PcTrial)
    }

    pub fn is_gc_family(self) -> bool {
        matches!(
            self,
            ClientVariant::V3Gc | ClientVariant::V3Episode3 | ClientVariant::V3Xbox
        )
    }

    pub fn is_blue_burst(self) -> bool {
        matches!(self, ClientVariant::V4Bb)
    }
}

/// Language code carried on a client's identity; used to key the localized
/// message table at send-time (see the gateway and subcommand error paths).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LanguageCode {
    Japanese = 0,
    English = 1,
    German = 2,
    French = 3,
    Spanish = 4,
    ChineseSimplified = 5,
    ChineseTraditional = 6,
    Korean = 7,
}

impl LanguageCode {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => LanguageCode::English,
            2 => LanguageCode::German,
            3 => LanguageCode::French,
            4 => LanguageCode::Spanish,
            5 => LanguageCode::ChineseSimplified,
            6 => LanguageCode::ChineseTraditional,
            7 => LanguageCode::Korean,
            _ => LanguageCode::Japanese,
        }
    }
}

bitflags_like! {
    /// Per-client privilege bitmask (GM / moderator-style flags granted by the ban/GM list).
    pub struct Privileges: u32 {
        const LOCAL_GM       = 1 << 0;
        const GLOBAL_GM      = 1 << 1;
        const LOCAL_ROOT     = 1 << 2;
        const GLOBAL_ROOT    = 1 << 3;
    }
}

bitflags_like! {
    /// Per-client behavioral flags (`spec.md` §3 Client).
    pub struct ClientFlags: u32 {
        const LOGGED_IN            = 1 << 0;
        const GC_PROTECTED         = 1 << 1;
        const WORD_CENSOR_ENABLED  = 1 << 2;
        const AUTO_BACKUP          = 1 << 3;
        const TRACK_KILLS          = 1 << 4;
        const ALWAYS_LEGIT         = 1 << 5;
        const TRACK_INVENTORY      = 1 << 6;
        const INVULNERABLE         = 1 << 7;
        const INFINITE_TP          = 1 << 8;
        const DISCONNECTED         = 1 << 9;
        const IS_TRIAL_EDITION     = 1 << 10;
        const IPV6_PEER            = 1 << 11;
        const BURSTING             = 1 << 12;
        const QUEST_STACK_LOCK     = 1 << 13;
    }
}

/// A world position: floor index plus 3-D coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub floor: u8,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const MAX_FLOOR: u8 = 17;

    pub fn new(floor: u8, x: f32, y: f32, z: f32) -> Self {
        Self { floor, x, y, z }
    }

    pub fn is_valid_floor(self) -> bool {
        self.floor <= Self::MAX_FLOOR
    }
}

/// A lobby-scoped monotonic item id. Never reused within a lobby's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Primary (3 words) + secondary (1 word) item data, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    pub data1: [u32; 3],
    pub data2: u32,
}

impl ItemData {
    pub fn new(data1: [u32; 3], data2: u32) -> Self {
        Self { data1, data2 }
    }

    /// First data word, used as the stackability merge key.
    pub fn stack_key(&self) -> u32 {
        self.data1[0]
    }
}

/// A floor item owned by a lobby until it is picked up (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorItem {
    pub item_id: ItemId,
    pub data: ItemData,
    pub quantity: u32,
    pub x: f32,
    pub z: f32,
    pub floor: u8,
}

/// A two-character menu code, e.g. the grouping shown in ship-select menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuCode(pub [u8; 2]);

impl MenuCode {
    pub const NONE: MenuCode = MenuCode([0, 0]);
}

/// A locally cached summary of another ship, learned from the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniShip {
    pub ship_id: u32,
    pub name: String,
    pub ipv4: std::net::Ipv4Addr,
    pub ipv6: Option<std::net::Ipv6Addr>,
    pub base_port: u16,
    pub client_count: u16,
    pub team_count: u16,
    pub menu_code: MenuCode,
    pub flags: u32,
    pub ship_number: u16,
    pub privileges: u32,
}

/// A quest register index, 0..256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterId(pub u8);

/// A slot index within a lobby, 0..max_clients for that lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u8);

/// A process-wide-unique handle for a connected client, stable for the
/// connection's lifetime. Lobbies store these rather than owning the
/// client objects themselves, which belong to their Block's client
/// collection (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

/// A lobby id, unique within a Block (`spec.md` §4.3: linear scan for an
/// unused id starting at 0x11 for new games; default lobbies occupy the ids
/// below that).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LobbyId(pub u32);

/// The cap on a character's held meseta (`spec.md` §4.4 Blue-Burst floor
/// item protocol: "meseta is capped at 999,999").
pub const MESETA_CAP: u32 = 999_999;

/// One inventory or bank slot: the item, how many, and (inventory only)
/// whether it is currently worn (`spec.md` §3: "30-slot inventory with
/// per-item equipped bit").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub data: ItemData,
    pub quantity: u32,
    pub equipped: bool,
}

impl InventorySlot {
    pub fn new(data: ItemData, quantity: u32) -> Self {
        Self {
            data,
            quantity,
            equipped: false,
        }
    }
}

/// The server-side inventory mirror `spec.md` §4.4 requires "Delete item /
/// buy / use item" and the Blue-Burst floor/bank protocols to mutate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<InventorySlot>,
    pub meseta: u32,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the slot index of an item sharing `data`'s stack key.
    pub fn find_stackable(&self, data: &ItemData) -> Option<usize> {
        self.items.iter().position(|slot| slot.data.stack_key() == data.stack_key())
    }

    /// Add `quantity` of `data`, merging into an existing unequipped stack
    /// if one matches (`spec.md` §4.4: "stackables merge by first-data-word
    /// match").
    pub fn add(&mut self, data: ItemData, quantity: u32) {
        if let Some(idx) = self.find_stackable(&data) {
            self.items[idx].quantity += quantity;
        } else {
            self.items.push(InventorySlot::new(data, quantity));
        }
    }

    /// Remove up to `quantity` from slot `idx`, dropping the slot entirely
    /// once its quantity reaches zero. Returns `false` if `idx` is out of
    /// range.
    pub fn remove(&mut self, idx: usize, quantity: u32) -> bool {
        let Some(entry) = self.items.get_mut(idx) else {
            return false;
        };
        entry.quantity = entry.quantity.saturating_sub(quantity);
        if entry.quantity == 0 {
            self.items.remove(idx);
        }
        true
    }

    /// Add `amount` meseta, saturating at `MESETA_CAP`.
    pub fn add_meseta(&mut self, amount: u32) {
        self.meseta = self.meseta.saturating_add(amount).min(MESETA_CAP);
    }

    /// Deduct `amount` meseta; fails without mutating if insufficient.
    pub fn take_meseta(&mut self, amount: u32) -> bool {
        if self.meseta < amount {
            return false;
        }
        self.meseta -= amount;
        true
    }
}

/// The number of slots a Blue-Burst character bank holds (`spec.md` §3).
pub const BANK_CAPACITY: usize = 200;

/// A Blue-Burst character's separately-tracked bank (`spec.md` §3, §4.4
/// "Blue-Burst bank protocol"). Bank slots are never equipped, so unlike
/// [`Inventory`] there is no per-slot equipped bit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bank {
    pub items: Vec<(ItemData, u32)>,
    pub meseta: u32,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= BANK_CAPACITY
    }

    pub fn find_stackable(&self, data: &ItemData) -> Option<usize> {
        self.items.iter().position(|(item, _)| item.stack_key() == data.stack_key())
    }

    /// Deposit `quantity` of `data`, merging into a matching stack when
    /// possible. Fails if the bank is full and no matching stack exists.
    pub fn deposit(&mut self, data: ItemData, quantity: u32) -> bool {
        if let Some(idx) = self.find_stackable(&data) {
            self.items[idx].1 += quantity;
            true
        } else if self.is_full() {
            false
        } else {
            self.items.push((data, quantity));
            true
        }
    }

    /// Withdraw up to `quantity` from slot `idx`, dropping the slot at
    /// zero. Returns the withdrawn `(data, quantity)` pair, if any.
    pub fn withdraw(&mut self, idx: usize, quantity: u32) -> Option<(ItemData, u32)> {
        let entry = self.items.get_mut(idx)?;
        let taken = quantity.min(entry.1);
        entry.1 -= taken;
        let data = entry.0;
        if entry.1 == 0 {
            self.items.remove(idx);
        }
        Some((data, taken))
    }

    pub fn deposit_meseta(&mut self, amount: u32) {
        self.meseta = self.meseta.saturating_add(amount).min(MESETA_CAP);
    }

    pub fn withdraw_meseta(&mut self, amount: u32) -> bool {
        if self.meseta < amount {
            return false;
        }
        self.meseta -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_flags_round_trip() {
        let mut flags = ClientFlags::empty();
        assert!(!flags.contains(ClientFlags::LOGGED_IN));
        flags.set(ClientFlags::LOGGED_IN, true);
        assert!(flags.contains(ClientFlags::LOGGED_IN));
        flags.set(ClientFlags::LOGGED_IN, false);
        assert!(!flags.contains(ClientFlags::LOGGED_IN));
    }

    #[test]
    fn variant_header_sizes() {
        assert_eq!(ClientVariant::V1Legacy.header_size(), 4);
        assert_eq!(ClientVariant::V4Bb.header_size(), 8);
        assert_eq!(ClientVariant::V4Bb.cipher_block_unit(), 4);
        assert_eq!(ClientVariant::V2Pc.cipher_block_unit(), 8);
    }

    #[test]
    fn position_floor_bounds() {
        assert!(Position::new(17, 0.0, 0.0, 0.0).is_valid_floor());
        assert!(!Position::new(18, 0.0, 0.0, 0.0).is_valid_floor());
    }

    #[test]
    fn inventory_add_merges_matching_stack_key() {
        let mut inv = Inventory::new();
        inv.add(ItemData::new([10, 0, 0], 0), 5);
        inv.add(ItemData::new([10, 0, 0], 0), 3);
        assert_eq!(inv.items.len(), 1);
        assert_eq!(inv.items[0].quantity, 8);

        inv.add(ItemData::new([11, 0, 0], 0), 1);
        assert_eq!(inv.items.len(), 2);
    }

    #[test]
    fn bank_deposit_and_withdraw_round_trip() {
        let mut bank = Bank::new();
        assert!(bank.deposit(ItemData::new([5, 0, 0], 0), 10));
        assert!(bank.deposit(ItemData::new([5, 0, 0], 0), 5));
        assert_eq!(bank.items.len(), 1);

        let (data, taken) = bank.withdraw(0, 12).unwrap();
        assert_eq!(data, ItemData::new([5, 0, 0], 0));
        assert_eq!(taken, 12);
        assert_eq!(bank.items[0].1, 3);

        let (_, taken2) = bank.withdraw(0, 3).unwrap();
        assert_eq!(taken2, 3);
        assert!(bank.items.is_empty());
    }

    #[test]
    fn bank_rejects_new_stack_when_full() {
        let mut bank = Bank::new();
        for i in 0..BANK_CAPACITY as u32 {
            assert!(bank.deposit(ItemData::new([i, 0, 0], 0), 1));
        }
        assert!(bank.is_full());
        assert!(!bank.deposit(ItemData::new([BANK_CAPACITY as u32, 0, 0], 0), 1));
    }

    #[test]
    fn inventory_remove_drops_slot_at_zero_quantity() {
        let mut inv = Inventory::new();
        inv.add(ItemData::new([10, 0, 0], 0), 2);
        assert!(inv.remove(0, 2));
        assert!(inv.items.is_empty());
        assert!(!inv.remove(0, 1));
    }

    #[test]
    fn inventory_meseta_saturates_at_cap() {
        let mut inv = Inventory::new();
        inv.add_meseta(MESETA_CAP - 1);
        inv.add_meseta(10);
        assert_eq!(inv.meseta, MESETA_CAP);
    }

    #[test]
    fn inventory_take_meseta_fails_when_insufficient() {
        let mut inv = Inventory::new();
        inv.add_meseta(50);
        assert!(!inv.take_meseta(100));
        assert_eq!(inv.meseta, 50);
        assert!(inv.take_meseta(50));
        assert_eq!(inv.meseta, 0);
    }
}
