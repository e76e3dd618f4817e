//! The register-sync subcommand's three behaviors (`spec.md` §4.4 point
//! (iii), opcode `SYNC_REGISTER`): a write to the configured short-flag
//! register starts a gateway round trip, a write to the configured
//! quest-data register feeds the quest-function calling convention
//! (`spec.md` §4.7), a write to a lobby sync-list register is stored and
//! re-broadcast, and everything else forwards unchanged.

use block_lobby::registers::LobbyRegisters;
use block_quest::stack::{PushOutcome, QuestStack};
use block_types::RegisterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortFlagOp {
    Get,
    Set,
    Delete,
}

/// Split `value`'s top 3 bits (the control encoding) from its low 29-bit
/// payload (`spec.md` §4.4: "respecting a three-bit control encoding
/// within the value").
pub fn decode_short_flag_value(value: u32) -> (ShortFlagOp, u32) {
    let control = (value >> 29) & 0b111;
    let payload = value & 0x1FFF_FFFF;
    let op = match control {
        0 => ShortFlagOp::Get,
        1 => ShortFlagOp::Set,
        _ => ShortFlagOp::Delete,
    };
    (op, payload)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSyncAction {
    /// Start a short-flag get/set/delete round trip with the gateway.
    ShortFlagRequest { op: ShortFlagOp, payload: u32 },
    /// The quest stack gained one more word but isn't ready to dispatch yet.
    QuestStackPending,
    /// The quest stack just completed; dispatch it (`block_quest::dispatcher::dispatch`).
    QuestStackReady,
    /// The quest stack was already full; the write is dropped.
    QuestStackOverflow,
    /// Store `value` ship-side under `reg` and forward a sync broadcast.
    ShipSideSync { reg: RegisterId, value: i32 },
    /// Neither register is configured for anything special; forward as-is.
    ForwardUnchanged,
}

/// Classify and apply one register-sync write. `quest_stack` is the
/// sending client's per-connection quest stack (`spec.md` §3); it is only
/// mutated when `reg` is the lobby's configured `q_data_reg`.
pub fn handle_register_sync(
    registers: &mut LobbyRegisters,
    quest_stack: &mut QuestStack,
    reg: RegisterId,
    value: i32,
) -> RegisterSyncAction {
    if Some(reg) == registers.quest_flag_register {
        let (op, payload) = decode_short_flag_value(value as u32);
        return RegisterSyncAction::ShortFlagRequest { op, payload };
    }

    if registers.quest_data_enabled() && Some(reg) == registers.q_data_reg {
        return match quest_stack.push(value as u32) {
            PushOutcome::Ready => RegisterSyncAction::QuestStackReady,
            PushOutcome::Incomplete => RegisterSyncAction::QuestStackPending,
            PushOutcome::Overflow => RegisterSyncAction::QuestStackOverflow,
        };
    }

    if registers.quest_data_enabled() && Some(reg) == registers.q_ctl_reg {
        quest_stack.reset();
        return RegisterSyncAction::QuestStackPending;
    }

    if registers.is_sync_register(reg) || registers.set_sync_register(reg, value) {
        RegisterSyncAction::ShipSideSync { reg, value }
    } else {
        RegisterSyncAction::ForwardUnchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flag_register_decodes_control_bits() {
        let mut registers = LobbyRegisters::new();
        registers.quest_flag_register = Some(RegisterId(9));
        let mut stack = QuestStack::new();

        // control=1 (Set), payload=42
        let value = (1i32 << 29) | 42;
        let action = handle_register_sync(&mut registers, &mut stack, RegisterId(9), value);
        assert_eq!(
            action,
            RegisterSyncAction::ShortFlagRequest {
                op: ShortFlagOp::Set,
                payload: 42
            }
        );
    }

    #[test]
    fn quest_data_register_feeds_the_stack() {
        let mut registers = LobbyRegisters::new();
        registers.enable_quest_data(RegisterId(10), RegisterId(11));
        let mut stack = QuestStack::new();

        // function=1, argc=0, retc=1, dest_reg=5 -> ready on the 4th write
        assert_eq!(
            handle_register_sync(&mut registers, &mut stack, RegisterId(11), 1),
            RegisterSyncAction::QuestStackPending
        );
        assert_eq!(
            handle_register_sync(&mut registers, &mut stack, RegisterId(11), 0),
            RegisterSyncAction::QuestStackPending
        );
        assert_eq!(
            handle_register_sync(&mut registers, &mut stack, RegisterId(11), 1),
            RegisterSyncAction::QuestStackPending
        );
        assert_eq!(
            handle_register_sync(&mut registers, &mut stack, RegisterId(11), 5),
            RegisterSyncAction::QuestStackReady
        );
    }

    #[test]
    fn ctl_register_resets_the_stack() {
        let mut registers = LobbyRegisters::new();
        registers.enable_quest_data(RegisterId(10), RegisterId(11));
        let mut stack = QuestStack::new();
        stack.push(1);
        stack.push(2);
        handle_register_sync(&mut registers, &mut stack, RegisterId(10), 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn new_register_joins_the_sync_list_while_there_is_room() {
        let mut registers = LobbyRegisters::new();
        let mut stack = QuestStack::new();
        let action = handle_register_sync(&mut registers, &mut stack, RegisterId(200), 7);
        assert_eq!(
            action,
            RegisterSyncAction::ShipSideSync {
                reg: RegisterId(200),
                value: 7
            }
        );
    }

    #[test]
    fn register_forwards_unchanged_once_sync_list_is_full() {
        use block_lobby::registers::MAX_SYNC_REGISTERS;
        let mut registers = LobbyRegisters::new();
        let mut stack = QuestStack::new();
        for i in 0..MAX_SYNC_REGISTERS {
            handle_register_sync(&mut registers, &mut stack, RegisterId(i as u8), 1);
        }
        let action = handle_register_sync(&mut registers, &mut stack, RegisterId(250), 1);
        assert_eq!(action, RegisterSyncAction::ForwardUnchanged);
    }
}
