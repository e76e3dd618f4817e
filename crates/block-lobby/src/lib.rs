//! Lobby/team state machine (`spec.md` §4.3): creation, join, leave, leader
//! election, burst synchronization, destruction. Grounded on the original
//! `lobby.c`'s slot-array/leader/burst-flag shape, reimplemented as a
//! generation-free slab per `spec.md` §9 ("intrusive linked-list queues →
//! typed collections... generation-indexed slab collections").

pub mod collection;
pub mod enemies;
pub mod floor_items;
pub mod lobby;
pub mod registers;

pub use collection::LobbyCollection;
pub use enemies::{EnemyRecord, MapState, ObjectRecord};
pub use floor_items::FloorItemTable;
pub use lobby::{Lobby, LobbyError, LobbyKind, LobbyState, JoinOutcome, LeaveOutcome};
pub use registers::LobbyRegisters;
