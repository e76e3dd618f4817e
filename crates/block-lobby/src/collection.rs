//! A Block's ordered lobby collection: default lobbies created at startup
//! plus dynamically-created game lobbies, with per-block id allocation and
//! RNG for map seeds (`spec.md` §3 Block, §4.3 "Create game").

use crate::lobby::{GameTags, Lobby, LobbyError};
use block_types::LobbyId;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Game lobby ids are allocated starting here; ids below are reserved for
/// the block's default (chat-room) lobbies (`spec.md` §4.3).
pub const FIRST_GAME_LOBBY_ID: u32 = 0x11;

pub struct LobbyCollection {
    lobbies: BTreeMap<LobbyId, Lobby>,
    rng: ChaCha8Rng,
}

impl LobbyCollection {
    pub fn new(rng_seed: u64) -> Self {
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&rng_seed.to_le_bytes());
        Self {
            lobbies: BTreeMap::new(),
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Insert a pre-built default lobby (ids below `FIRST_GAME_LOBBY_ID`,
    /// created once at block startup).
    pub fn insert_default(&mut self, lobby: Lobby) {
        self.lobbies.insert(lobby.id, lobby);
    }

    /// Find the lowest unused id at or above `FIRST_GAME_LOBBY_ID` and
    /// create a new game lobby there (`spec.md` §4.3: "linear scan to find
    /// a gap starting at 0x11").
    pub fn create_game(&mut self, capacity: usize, tags: GameTags) -> LobbyId {
        let mut candidate = FIRST_GAME_LOBBY_ID;
        while self.lobbies.contains_key(&LobbyId(candidate)) {
            candidate += 1;
        }
        let id = LobbyId(candidate);
        let seed = self.rng.next_u32();
        self.lobbies.insert(id, Lobby::new_game(id, capacity, tags, seed));
        id
    }

    pub fn get(&self, id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(&id)
    }

    pub fn get_mut(&mut self, id: LobbyId) -> Option<&mut Lobby> {
        self.lobbies.get_mut(&id)
    }

    /// Get two distinct lobbies mutably at once, in the id order
    /// `lobby::lock_order` requires. Returns an error if either id is
    /// missing or they're the same lobby.
    pub fn get_pair_mut(
        &mut self,
        a: LobbyId,
        b: LobbyId,
    ) -> Result<(&mut Lobby, &mut Lobby), LobbyError> {
        let (lo, hi) = crate::lobby::lock_order(a, b);
        if lo == hi {
            return Err(LobbyError::AlreadyPresent);
        }
        // BTreeMap has no `get_two_mut`; since `lo != hi` the two lookups
        // never alias, so a raw pointer for the first ref is sound.
        let lo_ptr: *mut Lobby = self.lobbies.get_mut(&lo).ok_or(LobbyError::NotPresent)?;
        let hi_ref = self.lobbies.get_mut(&hi).ok_or(LobbyError::NotPresent)?;
        let lo_ref = unsafe { &mut *lo_ptr };
        Ok((lo_ref, hi_ref))
    }

    pub fn remove(&mut self, id: LobbyId) -> Option<Lobby> {
        self.lobbies.remove(&id)
    }

    /// Reclaim ids whose lobby transitioned to `Destroyed`
    /// (`spec.md` §4.1 two-phase cleanup).
    pub fn sweep_destroyed(&mut self) -> Vec<LobbyId> {
        let destroyed: Vec<LobbyId> = self
            .lobbies
            .iter()
            .filter(|(_, l)| l.state() == crate::lobby::LobbyState::Destroyed)
            .map(|(id, _)| *id)
            .collect();
        for id in &destroyed {
            self.lobbies.remove(id);
        }
        destroyed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LobbyId, &Lobby)> {
        self.lobbies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&LobbyId, &mut Lobby)> {
        self.lobbies.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::Lobby;
    use block_types::ClientId;

    #[test]
    fn game_ids_fill_gaps_starting_at_0x11() {
        let mut collection = LobbyCollection::new(1);
        let first = collection.create_game(4, GameTags::default());
        assert_eq!(first, LobbyId(FIRST_GAME_LOBBY_ID));
        let second = collection.create_game(4, GameTags::default());
        assert_eq!(second, LobbyId(FIRST_GAME_LOBBY_ID + 1));

        collection.remove(first);
        let third = collection.create_game(4, GameTags::default());
        assert_eq!(third, first, "should reuse the freed gap");
    }

    #[test]
    fn sweep_destroyed_removes_emptied_game_lobbies() {
        let mut collection = LobbyCollection::new(1);
        let id = collection.create_game(4, GameTags::default());
        let lobby = collection.get_mut(id).unwrap();
        lobby.add_client(ClientId(1)).unwrap();
        lobby.remove_client(ClientId(1)).unwrap();

        let swept = collection.sweep_destroyed();
        assert_eq!(swept, vec![id]);
        assert!(collection.get(id).is_none());
    }

    #[test]
    fn get_pair_mut_returns_both_lobbies() {
        let mut collection = LobbyCollection::new(1);
        collection.insert_default(Lobby::new_default(LobbyId(1), 12));
        collection.insert_default(Lobby::new_default(LobbyId(2), 12));
        let (a, b) = collection.get_pair_mut(LobbyId(2), LobbyId(1)).unwrap();
        assert_eq!(a.id, LobbyId(1));
        assert_eq!(b.id, LobbyId(2));
    }
}
