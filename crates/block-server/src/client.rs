//! Per-connection client state held by a Block (`spec.md` §3 Client):
//! the framed writer half, protocol/identity tags, inventory/bank
//! mirrors, the quest calling-convention stack, lobby membership, and the
//! idle/ping bookkeeping the block loop's per-client timers need.

use block_protocol_core::ConnectionWriter;
use block_quest::QuestStack;
use block_subcommand::{DropStaging, PendingAoeCast};
use block_types::{
    Bank, ClientFlags, ClientId, ClientVariant, GuildNumber, Inventory, LanguageCode, LobbyId,
    Position, Privileges, SlotId,
};
use std::collections::HashMap;
use std::time::Instant;

/// Character fields the quest-function dispatcher needs per slot
/// (`spec.md` §4.7) but that have no home in `block-types`' wire-shaped
/// `Inventory`/`Bank` pair — scoped to this crate rather than widening
/// those shared types for one consumer.
#[derive(Debug, Clone, Copy)]
pub struct CharSummary {
    pub class: i32,
    pub level: u32,
    pub section_id: u8,
}

pub struct ClientState {
    pub id: ClientId,
    pub writer: ConnectionWriter,
    pub variant: ClientVariant,
    pub guild: GuildNumber,
    pub lang: LanguageCode,
    pub privileges: Privileges,
    pub flags: ClientFlags,
    pub position: Position,
    pub inventory: Inventory,
    pub bank: Bank,
    pub quest_stack: QuestStack,
    pub char_summary: CharSummary,
    pub lobby: Option<LobbyId>,
    pub slot: Option<SlotId>,
    /// Last time any frame arrived from this client (`spec.md` §4.1: "120s
    /// idle disconnect").
    pub last_message_at: Instant,
    /// Last time the block sent this client anything (`spec.md` §4.1:
    /// "ping after 60s of outbound silence").
    pub last_send_at: Instant,
    /// Staged `drop_pos` awaiting a matching `drop_stack`
    /// (`spec.md` §4.4, §4.8 invariant 6).
    pub drop_staging: Option<DropStaging>,
    /// This client's most recent AoE technique cast, used to attribute a
    /// later object hit to it within the technique's window
    /// (`spec.md` §4.4 "Object hit").
    pub pending_aoe: Option<PendingAoeCast>,
    /// Per-species kill counter (`spec.md` §4.4: "increments the sender's
    /// per-species kill counter"), keyed by the monster's class byte.
    pub kill_counts: HashMap<u8, u32>,
}

impl ClientState {
    pub fn new(id: ClientId, writer: ConnectionWriter, variant: ClientVariant, guild: GuildNumber) -> Self {
        let now = Instant::now();
        Self {
            id,
            writer,
            variant,
            guild,
            lang: LanguageCode::English,
            privileges: Privileges::empty(),
            flags: ClientFlags::empty(),
            position: Position::new(0, 0.0, 0.0, 0.0),
            inventory: Inventory::new(),
            bank: Bank::new(),
            quest_stack: QuestStack::new(),
            char_summary: CharSummary {
                class: 0,
                level: 0,
                section_id: 0,
            },
            lobby: None,
            slot: None,
            last_message_at: now,
            last_send_at: now,
            drop_staging: None,
            pending_aoe: None,
            kill_counts: HashMap::new(),
        }
    }

    pub fn touch_received(&mut self) {
        self.last_message_at = Instant::now();
    }

    pub fn touch_sent(&mut self) {
        self.last_send_at = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_message_at.elapsed()
    }

    pub fn silent_for(&self) -> std::time::Duration {
        self.last_send_at.elapsed()
    }
}
