//! Subcommand opcode tags used by this dispatcher's match table
//! (`spec.md` §4.4). Only `SYNC_REGISTER` is pinned by name in the
//! specification; the concrete wire catalog for the rest is part of the
//! cipher/codec detail `spec.md` §1 puts out of scope, so these are this
//! ship's own internal dispatch tags, kept distinct from one another.

pub const ITEM_DROP_REQUEST: u8 = 0x2A;
pub const TAKE_ITEM: u8 = 0x2B;
pub const DAMAGE_TAKEN: u8 = 0x2C;
pub const TECHNIQUE_USED: u8 = 0x2D;
pub const SET_AREA: u8 = 0x2E;
pub const SET_POSITION: u8 = 0x2F;
pub const MOVE: u8 = 0x30;
pub const DELETE_ITEM: u8 = 0x31;
pub const BUY_ITEM: u8 = 0x32;
pub const USE_ITEM: u8 = 0x33;
pub const MONSTER_HIT: u8 = 0x34;
pub const OBJECT_HIT: u8 = 0x35;
pub const WORD_SELECT: u8 = 0x36;
pub const GUILD_CARD_EXCHANGE: u8 = 0x37;
pub const DESTROY_ITEM: u8 = 0x38;
pub const STAT_MODIFIER: u8 = 0x39;
pub const SYNC_REGISTER: u8 = 0x60;

pub const BB_DROP_POS: u8 = 0x59;
pub const BB_DROP_STACK: u8 = 0x5A;
pub const BB_PICK_UP: u8 = 0x5B;

pub const BB_BANK_OPEN: u8 = 0x5C;
pub const BB_BANK_ACTION: u8 = 0x5D;
