//! Per-lobby quest register wiring (`spec.md` §3, §4.4, §4.7, §9 Open
//! Questions #3). `q_ctl_reg` and `q_data_reg` are only meaningful once a
//! running quest sets the `LOBBY_QFLAG_DATA` flag; modeling them as
//! `Option<RegisterId>` that stays `None` until that flag is set preserves
//! "other quests must not trigger the dispatcher" without a separate
//! enabled/disabled bit to keep in sync.

use block_types::RegisterId;
use std::collections::HashMap;

/// Maximum entries in the cross-client register-sync sparse array
/// (`spec.md` §3: "a 12-word integer register-sync sparse array").
pub const MAX_SYNC_REGISTERS: usize = 12;

#[derive(Debug, Default)]
pub struct LobbyRegisters {
    /// Quest flag gating `q_ctl_reg`/`q_data_reg` (Open Question #3).
    quest_flag_data_enabled: bool,
    /// Configured register that triggers a short persistent-flag
    /// get/set/delete round-trip to the gateway when written.
    pub quest_flag_register: Option<RegisterId>,
    pub q_ctl_reg: Option<RegisterId>,
    pub q_data_reg: Option<RegisterId>,
    /// `[recipient_slot][subject_slot] -> register`, populated by quest
    /// function 21 (position-updates subscribe).
    pos_update_regs: [[Option<RegisterId>; 4]; 4],
    /// `[slot] -> register`, populated by quest function 26.
    client_count_update_regs: [Option<RegisterId>; 4],
    sync_registers: HashMap<RegisterId, i32>,
}

impl LobbyRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `q_ctl_reg`/`q_data_reg`. Called when a loading quest sets
    /// `LOBBY_QFLAG_DATA`; until then both registers stay `None` so the
    /// function dispatcher never triggers for quests that don't use it.
    pub fn enable_quest_data(&mut self, ctl_reg: RegisterId, data_reg: RegisterId) {
        self.quest_flag_data_enabled = true;
        self.q_ctl_reg = Some(ctl_reg);
        self.q_data_reg = Some(data_reg);
    }

    pub fn disable_quest_data(&mut self) {
        self.quest_flag_data_enabled = false;
        self.q_ctl_reg = None;
        self.q_data_reg = None;
    }

    pub fn quest_data_enabled(&self) -> bool {
        self.quest_flag_data_enabled
    }

    pub fn subscribe_position_updates(&mut self, recipient_slot: usize, subject_slot: usize, reg: RegisterId) {
        if recipient_slot < 4 && subject_slot < 4 {
            self.pos_update_regs[recipient_slot][subject_slot] = Some(reg);
        }
    }

    pub fn position_update_register(&self, recipient_slot: usize, subject_slot: usize) -> Option<RegisterId> {
        self.pos_update_regs.get(recipient_slot)?.get(subject_slot).copied().flatten()
    }

    pub fn subscribe_client_count_updates(&mut self, slot: usize, reg: RegisterId) {
        if slot < 4 {
            self.client_count_update_regs[slot] = Some(reg);
        }
    }

    pub fn client_count_update_register(&self, slot: usize) -> Option<RegisterId> {
        self.client_count_update_regs.get(slot).copied().flatten()
    }

    /// Register `reg` for ship-side sync storage, up to the 12-entry cap.
    /// Returns `false` if the table is full and `reg` is new.
    pub fn set_sync_register(&mut self, reg: RegisterId, value: i32) -> bool {
        if !self.sync_registers.contains_key(&reg) && self.sync_registers.len() >= MAX_SYNC_REGISTERS {
            return false;
        }
        self.sync_registers.insert(reg, value);
        true
    }

    pub fn sync_register(&self, reg: RegisterId) -> Option<i32> {
        self.sync_registers.get(&reg).copied()
    }

    pub fn is_sync_register(&self, reg: RegisterId) -> bool {
        self.sync_registers.contains_key(&reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quest_data_registers_start_disabled() {
        let regs = LobbyRegisters::new();
        assert!(!regs.quest_data_enabled());
        assert!(regs.q_ctl_reg.is_none());
        assert!(regs.q_data_reg.is_none());
    }

    #[test]
    fn enabling_sets_both_registers() {
        let mut regs = LobbyRegisters::new();
        regs.enable_quest_data(RegisterId(10), RegisterId(11));
        assert!(regs.quest_data_enabled());
        assert_eq!(regs.q_ctl_reg, Some(RegisterId(10)));
        assert_eq!(regs.q_data_reg, Some(RegisterId(11)));
    }

    #[test]
    fn sync_register_table_caps_at_twelve() {
        let mut regs = LobbyRegisters::new();
        for i in 0..MAX_SYNC_REGISTERS {
            assert!(regs.set_sync_register(RegisterId(i as u8), i as i32));
        }
        assert!(!regs.set_sync_register(RegisterId(200), 1));
        // Updating an existing entry is always fine, even when full.
        assert!(regs.set_sync_register(RegisterId(0), 99));
        assert_eq!(regs.sync_register(RegisterId(0)), Some(99));
    }

    #[test]
    fn position_update_subscription_round_trips() {
        let mut regs = LobbyRegisters::new();
        regs.subscribe_position_updates(1, 2, RegisterId(5));
        assert_eq!(regs.position_update_register(1, 2), Some(RegisterId(5)));
        assert_eq!(regs.position_update_register(0, 0), None);
    }
}
