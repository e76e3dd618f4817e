//! The `Lobby` state machine itself (`spec.md` §4.3).

use crate::enemies::MapState;
use crate::floor_items::FloorItemTable;
use crate::registers::LobbyRegisters;
use block_types::{ClientId, LobbyId, SlotId};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyKind {
    /// A public chat room. Never destroyed by removal (`spec.md` §4.3).
    Default,
    /// A four-player game room ("team").
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Active,
    /// A newly-joined team member is receiving burst state from the leader.
    Bursting,
    Destroyed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("lobby is full")]
    Full,
    #[error("client is already in this lobby")]
    AlreadyPresent,
    #[error("client is not in this lobby")]
    NotPresent,
    #[error("destination lobby is bursting")]
    DestinationBursting,
}

/// Version/difficulty/etc tags carried only by game lobbies. Kept as a
/// separate struct so default lobbies don't pay for fields they never use.
#[derive(Debug, Clone, Default)]
pub struct GameTags {
    pub difficulty: u8,
    pub battle: bool,
    pub challenge: bool,
    pub version: u8,
    pub section_id: u8,
    pub event: u8,
    pub name: String,
    pub password: Option<String>,
}

pub struct JoinOutcome {
    pub slot: SlotId,
    pub became_leader: bool,
    pub entered_bursting: bool,
}

pub struct LeaveOutcome {
    pub vacated_slot: SlotId,
    pub was_leader: bool,
    pub new_leader: Option<SlotId>,
    /// Set when a now-empty game lobby transitioned to `Destroyed`
    /// (`spec.md` §4.3, §8 invariant 3).
    pub destroyed: bool,
}

pub struct Lobby {
    pub id: LobbyId,
    pub kind: LobbyKind,
    state: LobbyState,
    slots: Vec<Option<ClientId>>,
    leader_slot: SlotId,
    pub tags: GameTags,
    pub floor_items: FloorItemTable,
    pub registers: LobbyRegisters,
    pub map_seed: u32,
    /// The loaded quest's enemy/object hit tables, if any (`spec.md` §3:
    /// "a set of map seeds and enemy/object tables (when a quest is
    /// running)"). Default lobbies never populate this.
    pub map_state: MapState,
    /// Deferred broadcast payloads, keyed to the bursting member's slot,
    /// flushed in order when burst completes (`spec.md` §4.4, §8 invariant 7).
    burst_queue: VecDeque<(SlotId, Vec<u8>)>,
}

impl Lobby {
    pub fn new_default(id: LobbyId, capacity: usize) -> Self {
        Self {
            id,
            kind: LobbyKind::Default,
            state: LobbyState::Active,
            slots: vec![None; capacity],
            leader_slot: SlotId(0),
            tags: GameTags::default(),
            floor_items: FloorItemTable::new(),
            registers: LobbyRegisters::new(),
            map_seed: 0,
            map_state: MapState::new(),
            burst_queue: VecDeque::new(),
        }
    }

    pub fn new_game(id: LobbyId, capacity: usize, tags: GameTags, map_seed: u32) -> Self {
        Self {
            id,
            kind: LobbyKind::Game,
            state: LobbyState::Active,
            slots: vec![None; capacity],
            leader_slot: SlotId(0),
            tags,
            floor_items: FloorItemTable::new(),
            registers: LobbyRegisters::new(),
            map_seed,
            map_state: MapState::new(),
            burst_queue: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn num_clients(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.num_clients() == 0
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn leader_slot(&self) -> SlotId {
        self.leader_slot
    }

    pub fn slot_of(&self, client: ClientId) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| *s == Some(client))
            .map(|i| SlotId(i as u8))
    }

    pub fn client_in_slot(&self, slot: SlotId) -> Option<ClientId> {
        self.slots.get(slot.0 as usize).copied().flatten()
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = (SlotId, ClientId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|c| (SlotId(i as u8), c)))
    }

    /// Add `client` to the lowest empty slot. The first entrant becomes
    /// leader. Game lobbies enter `Bursting` for every join after the first
    /// (`spec.md` §4.3: "if the destination is a game, sets the Bursting
    /// flag").
    pub fn add_client(&mut self, client: ClientId) -> Result<JoinOutcome, LobbyError> {
        if self.state == LobbyState::Bursting {
            return Err(LobbyError::DestinationBursting);
        }
        if self.slot_of(client).is_some() {
            return Err(LobbyError::AlreadyPresent);
        }
        let slot_idx = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(LobbyError::Full)?;
        let was_empty = self.is_empty();
        self.slots[slot_idx] = Some(client);
        if was_empty {
            self.leader_slot = SlotId(slot_idx as u8);
        }

        let entered_bursting = self.kind == LobbyKind::Game && !was_empty;
        if entered_bursting {
            self.state = LobbyState::Bursting;
        }

        Ok(JoinOutcome {
            slot: SlotId(slot_idx as u8),
            became_leader: was_empty,
            entered_bursting,
        })
    }

    /// Remove `client`, electing a new leader (lowest-index remaining
    /// occupant) if it was the leader, and destroying an emptied game lobby
    /// (`spec.md` §4.3, §8 invariant 3).
    pub fn remove_client(&mut self, client: ClientId) -> Result<LeaveOutcome, LobbyError> {
        let slot = self.slot_of(client).ok_or(LobbyError::NotPresent)?;
        self.slots[slot.0 as usize] = None;
        self.burst_queue.retain(|(s, _)| *s != slot);

        let was_leader = slot == self.leader_slot;
        let mut new_leader = None;
        if self.is_empty() {
            self.leader_slot = SlotId(0);
            if self.kind == LobbyKind::Game {
                self.state = LobbyState::Destroyed;
            }
        } else if was_leader {
            let (elected_slot, _) = self
                .occupied_slots()
                .min_by_key(|(s, _)| s.0)
                .expect("checked non-empty above");
            self.leader_slot = elected_slot;
            new_leader = Some(elected_slot);
        }

        Ok(LeaveOutcome {
            vacated_slot: slot,
            was_leader,
            new_leader,
            destroyed: self.state == LobbyState::Destroyed,
        })
    }

    /// Clear `Bursting` once the new member reports done-bursting
    /// (`spec.md` §4.3: "burst completion").
    pub fn complete_burst(&mut self, slot: SlotId) -> Vec<Vec<u8>> {
        self.state = LobbyState::Active;
        let mut flushed = Vec::new();
        self.burst_queue.retain(|(s, payload)| {
            if *s == slot {
                flushed.push(payload.clone());
                false
            } else {
                true
            }
        });
        flushed
    }

    pub fn is_bursting(&self) -> bool {
        self.state == LobbyState::Bursting
    }

    /// Defer a broadcast payload for the bursting member at `slot`
    /// (`spec.md` §4.4).
    pub fn enqueue_burst_payload(&mut self, slot: SlotId, payload: Vec<u8>) {
        self.burst_queue.push_back((slot, payload));
    }
}

/// Returns `(a, b)` sorted by id, the order two lobbies must be locked in
/// together (`spec.md` §4.3, §5: "locks old and new lobbies (always in id
/// order to prevent deadlock)").
pub fn lock_order(a: LobbyId, b: LobbyId) -> (LobbyId, LobbyId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(n: u64) -> ClientId {
        ClientId(n)
    }

    #[test]
    fn first_entrant_becomes_leader() {
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        let outcome = lobby.add_client(cid(1)).unwrap();
        assert_eq!(outcome.slot, SlotId(0));
        assert!(outcome.became_leader);
        assert!(!outcome.entered_bursting);
        assert_eq!(lobby.leader_slot(), SlotId(0));
    }

    #[test]
    fn second_entrant_enters_bursting() {
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        lobby.add_client(cid(1)).unwrap();
        let outcome = lobby.add_client(cid(2)).unwrap();
        assert!(outcome.entered_bursting);
        assert!(lobby.is_bursting());
        assert_eq!(lobby.add_client(cid(3)).unwrap_err(), LobbyError::DestinationBursting);
    }

    #[test]
    fn leader_election_picks_lowest_remaining_slot() {
        // Scenario from spec.md §8: [A(leader), B, C, D] -> A disconnects.
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        lobby.add_client(cid(1)).unwrap(); // A -> slot 0, leader
        lobby.complete_burst(SlotId(0));
        lobby.add_client(cid(2)).unwrap(); // B -> slot 1
        lobby.complete_burst(SlotId(1));
        lobby.add_client(cid(3)).unwrap(); // C -> slot 2
        lobby.complete_burst(SlotId(2));
        lobby.add_client(cid(4)).unwrap(); // D -> slot 3
        lobby.complete_burst(SlotId(3));

        let outcome = lobby.remove_client(cid(1)).unwrap();
        assert!(outcome.was_leader);
        assert_eq!(outcome.new_leader, Some(SlotId(1)));
        assert_eq!(lobby.leader_slot(), SlotId(1));
        assert_eq!(lobby.num_clients(), 3);
        assert!(!outcome.destroyed);
    }

    #[test]
    fn emptied_game_lobby_is_destroyed() {
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        lobby.add_client(cid(1)).unwrap();
        let outcome = lobby.remove_client(cid(1)).unwrap();
        assert!(outcome.destroyed);
        assert_eq!(lobby.state(), LobbyState::Destroyed);
    }

    #[test]
    fn default_lobby_is_never_destroyed_when_emptied() {
        let mut lobby = Lobby::new_default(LobbyId(1), 12);
        lobby.add_client(cid(1)).unwrap();
        let outcome = lobby.remove_client(cid(1)).unwrap();
        assert!(!outcome.destroyed);
        assert_eq!(lobby.state(), LobbyState::Active);
    }

    #[test]
    fn burst_completion_flushes_only_that_slots_queue() {
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        lobby.add_client(cid(1)).unwrap();
        lobby.complete_burst(SlotId(0));
        let outcome = lobby.add_client(cid(2)).unwrap();
        assert!(outcome.entered_bursting);

        lobby.enqueue_burst_payload(outcome.slot, b"chat".to_vec());
        lobby.enqueue_burst_payload(SlotId(0), b"not-for-this-slot".to_vec());

        let flushed = lobby.complete_burst(outcome.slot);
        assert_eq!(flushed, vec![b"chat".to_vec()]);
        assert!(!lobby.is_bursting());
    }

    #[test]
    fn item_ids_are_monotone_within_a_lobby() {
        let mut lobby = Lobby::new_game(LobbyId(0x11), 4, GameTags::default(), 1);
        let a = lobby.floor_items.next_id();
        let b = lobby.floor_items.next_id();
        assert!(b.0 > a.0);
    }

    #[test]
    fn lock_order_is_id_ascending() {
        assert_eq!(lock_order(LobbyId(5), LobbyId(2)), (LobbyId(2), LobbyId(5)));
        assert_eq!(lock_order(LobbyId(2), LobbyId(5)), (LobbyId(2), LobbyId(5)));
    }
}
