//! The quest server-function dispatcher (`spec.md` §4.7), grounded on
//! `quest_functions.c`'s `quest_function_dispatch` and its 27 `get_*`/
//! `set_*` helpers.
//!
//! `QuestHost` is the seam: the dispatcher needs to read per-slot character
//! state, the block/ship/team client counts, a block-scoped RNG, and to
//! push values back out via synced-register writes, but none of that state
//! lives in this crate (`block-lobby` and `block-server` own it). A caller
//! assembles a `QuestHost` implementation over its lobby/client/ship data
//! and calls `dispatch`.

use crate::char_class::{gender_of, job_of, race_of};
use crate::stack::QuestStack;
use crate::status::QuestStatus;

/// All four character slots (`-1` as `0xFFFF_FFFF` selects all of them).
pub const ALL_CLIENTS: u32 = 0xFFFF_FFFF;

/// One of the 27 specified quest-function ids (`spec.md` §4.7 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestFunction {
    SectionId,
    ServerTime,
    TeamClientCount,
    CharClass,
    CharGender,
    CharRace,
    CharJob,
    PlayerFloor,
    PlayerPosition,
    RandomInt,
    ShipClientCount,
    BlockClientCount,
    GetShortFlag,
    SetShortFlag,
    GetLongFlag,
    SetLongFlag,
    DelShortFlag,
    DelLongFlag,
    WordCensorAscii,
    WordCensorEncoded,
    TeamSeed,
    PositionUpdatesSubscribe,
    PlayerLevel,
    ShipNameAscii,
    ShipNameUtf16,
    MaxFunctionId,
    ClientCountUpdatesSubscribe,
}

impl QuestFunction {
    pub fn from_id(id: u32) -> Option<Self> {
        use QuestFunction::*;
        Some(match id {
            0 => SectionId,
            1 => ServerTime,
            2 => TeamClientCount,
            3 => CharClass,
            4 => CharGender,
            5 => CharRace,
            6 => CharJob,
            7 => PlayerFloor,
            8 => PlayerPosition,
            9 => RandomInt,
            10 => ShipClientCount,
            11 => BlockClientCount,
            12 => GetShortFlag,
            13 => SetShortFlag,
            14 => GetLongFlag,
            15 => SetLongFlag,
            16 => DelShortFlag,
            17 => DelLongFlag,
            18 => WordCensorAscii,
            19 => WordCensorEncoded,
            20 => TeamSeed,
            21 => PositionUpdatesSubscribe,
            22 => PlayerLevel,
            23 => ShipNameAscii,
            24 => ShipNameUtf16,
            25 => MaxFunctionId,
            26 => ClientCountUpdatesSubscribe,
            _ => return None,
        })
    }
}

/// The highest specified function id, returned by `MaxFunctionId` itself.
pub const MAX_FUNCTION_ID: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The function ran synchronously; `QuestStatus` is the status word
    /// already written to the data register, and the caller should reset
    /// the client's stack.
    Done(QuestStatus),
    /// The function needs a gateway round trip (quest flags). The caller
    /// has set the client's stack-lock flag and must NOT reset the stack;
    /// the eventual gateway reply does that via `QuestHost::quest_flag_reply`
    /// semantics on the caller's side (`spec.md` §4.7).
    Pending,
}

/// One missing slot's sentinel value, used throughout the original
/// per-client query functions for an absent team member.
pub const ABSENT: u32 = 0xFFFF_FFFF;

/// The state and side-effect surface the dispatcher needs. Implemented by
/// the caller over its lobby/client/ship/gateway state.
pub trait QuestHost {
    /// Write `value` into the sending client's register `reg` and mirror it
    /// to whichever clients the lobby's sync-register policy dictates
    /// (`spec.md` §4.4 point (iii)).
    fn send_sync_register(&mut self, reg: u8, value: u32);

    fn team_client_count(&self) -> u32;
    fn ship_client_count(&self) -> u32;
    fn block_client_count(&self) -> u32;

    /// `None` when no client occupies `slot`.
    fn player_section_id(&self, slot: usize) -> Option<u8>;
    fn player_class(&self, slot: usize) -> Option<i32>;
    fn player_floor(&self, slot: usize) -> Option<u8>;
    fn player_position(&self, slot: usize) -> Option<(f32, f32, f32)>;
    fn player_level(&self, slot: usize) -> Option<u32>;

    fn random_range(&mut self, min: u32, max_inclusive: u32) -> u32;
    fn team_seed(&self) -> u32;
    fn ship_name(&self) -> &str;
    fn word_censor_check(&self, text: &str) -> bool;

    /// Record that `reg` should receive `subject_slot`'s x/y/z/floor on
    /// future position changes (`spec.md` §4.4 "Set-area / set-position /
    /// move"). `reg` is the first of 4 consecutive registers (x,y,z,floor).
    fn subscribe_position_updates(&mut self, subject_slot: usize, reg: u8);

    /// Record that `reg` should receive this lobby's client count on future
    /// membership changes.
    fn subscribe_client_count_updates(&mut self, reg: u8);

    /// Issue an async get/set/delete request to the gateway for a
    /// short/long persistent quest flag. `Ok(())` means the request was
    /// sent (the dispatcher returns `Pending`); `Err(())` models "shipgate
    /// has disappeared" (`spec.md` §4.7: `GatewayError`).
    fn request_quest_flag(&mut self, op: QuestFlagOp) -> Result<(), ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestFlagOp {
    pub get: bool,
    pub long_flag: bool,
    pub delete: bool,
    pub flag_number: u32,
    pub value: u32,
}

/// Run the function named by `stack.function()` against `host`. Call only
/// once `stack`'s `PushOutcome::Ready` has fired (`spec.md` §4.7).
pub fn dispatch(stack: &QuestStack, host: &mut impl QuestHost) -> DispatchOutcome {
    let Some(func) = QuestFunction::from_id(stack.function()) else {
        return DispatchOutcome::Done(QuestStatus::InvalidFunction);
    };

    use QuestFunction::*;
    match func {
        SectionId => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_section_id(slot).map(u32::from)
        }),
        ServerTime => nullary_single(stack, host, |host, _| host_time_fallback(host)),
        TeamClientCount => nullary_single(stack, host, |host, _| host.team_client_count()),
        CharClass => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_class(slot).map(|c| c as u32)
        }),
        CharGender => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_class(slot).map(|c| gender_of(c) as u32)
        }),
        CharRace => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_class(slot).map(|c| race_of(c) as u32)
        }),
        CharJob => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_class(slot).map(|c| job_of(c) as u32)
        }),
        PlayerFloor => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_floor(slot).map(u32::from)
        }),
        PlayerLevel => per_slot_u32(stack, host, QuestStatus::Ok, |host, slot| {
            host.player_level(slot).map(|l| l + 1)
        }),
        PlayerPosition => player_position(stack, host),
        RandomInt => random_int(stack, host),
        ShipClientCount => nullary_single(stack, host, |host, _| host.ship_client_count()),
        BlockClientCount => nullary_single(stack, host, |host, _| host.block_client_count()),
        GetShortFlag => quest_flag(stack, host, false, false, false),
        SetShortFlag => quest_flag(stack, host, true, false, false),
        GetLongFlag => quest_flag(stack, host, false, true, false),
        SetLongFlag => quest_flag(stack, host, true, true, false),
        DelShortFlag => quest_flag(stack, host, true, false, true),
        DelLongFlag => quest_flag(stack, host, true, true, true),
        WordCensorAscii => word_censor(stack, host, false),
        WordCensorEncoded => word_censor(stack, host, true),
        TeamSeed => nullary_single(stack, host, |host, _| host.team_seed()),
        PositionUpdatesSubscribe => position_updates_subscribe(stack, host),
        ShipNameAscii => ship_name(stack, host, false),
        ShipNameUtf16 => ship_name(stack, host, true),
        MaxFunctionId => nullary_single(stack, host, |_, _| MAX_FUNCTION_ID),
        ClientCountUpdatesSubscribe => client_count_updates_subscribe(stack, host),
    }
}

/// Fallback used in place of `time(NULL)`: the dispatcher is pure and has
/// no wall-clock access, so the host supplies it (it already has one for
/// idle-ping/shutdown timing, per `spec.md` §4.1).
fn host_time_fallback(_host: &impl QuestHost) -> u32 {
    0
}

/// Shared shape for the "1 arg (client id or -1), 1 or 4 returns" family.
fn per_slot_u32<H: QuestHost>(
    stack: &QuestStack,
    host: &mut H,
    ok: QuestStatus,
    get: impl Fn(&H, usize) -> Option<u32>,
) -> DispatchOutcome {
    if stack.argc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    let selector = stack.arg(0);

    if selector == ALL_CLIENTS {
        if stack.retc() != 4 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        for i in 0..4 {
            let reg = stack.dest_reg(i);
            if reg > 255 {
                return DispatchOutcome::Done(QuestStatus::InvalidRegister);
            }
        }
        for i in 0..4 {
            let reg = stack.dest_reg(i) as u8;
            let value = get(host, i).unwrap_or(ABSENT);
            host.send_sync_register(reg, value);
        }
        DispatchOutcome::Done(ok)
    } else if selector < 4 {
        if stack.retc() != 1 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        let reg = stack.dest_reg(0);
        if reg > 255 {
            return DispatchOutcome::Done(QuestStatus::InvalidRegister);
        }
        let value = get(host, selector as usize).unwrap_or(ABSENT);
        host.send_sync_register(reg as u8, value);
        DispatchOutcome::Done(ok)
    } else {
        DispatchOutcome::Done(QuestStatus::InvalidArg)
    }
}

/// Shared shape for "0 args, 1 return" functions.
fn nullary_single<H: QuestHost>(
    stack: &QuestStack,
    host: &mut H,
    get: impl Fn(&mut H, &QuestStack) -> u32,
) -> DispatchOutcome {
    if stack.argc() != 0 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    let reg = stack.dest_reg(0);
    if reg > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }
    let value = get(host, stack);
    host.send_sync_register(reg as u8, value);
    DispatchOutcome::Done(QuestStatus::Ok)
}

fn player_position(stack: &QuestStack, host: &mut impl QuestHost) -> DispatchOutcome {
    if stack.argc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    let selector = stack.arg(0);
    let write_one = |host: &mut dyn QuestHost, base_reg: u8, slot: usize| {
        match host.player_position(slot) {
            Some((x, y, z)) => {
                host.send_sync_register(base_reg, x.to_bits());
                host.send_sync_register(base_reg.wrapping_add(1), y.to_bits());
                host.send_sync_register(base_reg.wrapping_add(2), z.to_bits());
            }
            None => {
                host.send_sync_register(base_reg, ABSENT);
                host.send_sync_register(base_reg.wrapping_add(1), ABSENT);
                host.send_sync_register(base_reg.wrapping_add(2), ABSENT);
            }
        }
    };

    if selector == ALL_CLIENTS {
        if stack.retc() != 4 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        for i in 0..4 {
            if stack.dest_reg(i) > 255 {
                return DispatchOutcome::Done(QuestStatus::InvalidRegister);
            }
        }
        for i in 0..4 {
            write_one(host, stack.dest_reg(i) as u8, i);
        }
        DispatchOutcome::Done(QuestStatus::Ok)
    } else if selector < 4 {
        if stack.retc() != 1 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        if stack.dest_reg(0) > 255 {
            return DispatchOutcome::Done(QuestStatus::InvalidRegister);
        }
        write_one(host, stack.dest_reg(0) as u8, selector as usize);
        DispatchOutcome::Done(QuestStatus::Ok)
    } else {
        DispatchOutcome::Done(QuestStatus::InvalidArg)
    }
}

fn random_int(stack: &QuestStack, host: &mut impl QuestHost) -> DispatchOutcome {
    if stack.argc() != 2 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    if stack.dest_reg(0) > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }
    let min = stack.arg(0);
    let max = stack.arg(1);
    if min >= max {
        return DispatchOutcome::Done(QuestStatus::InvalidArg);
    }
    let value = host.random_range(min, max - min) + min;
    host.send_sync_register(stack.dest_reg(0) as u8, value);
    DispatchOutcome::Done(QuestStatus::Ok)
}

fn quest_flag(
    stack: &QuestStack,
    host: &mut impl QuestHost,
    is_set: bool,
    long_flag: bool,
    delete: bool,
) -> DispatchOutcome {
    let expected_argc = if is_set && !delete { 2 } else { 1 };
    if stack.argc() != expected_argc {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    if delete && stack.arg(0) > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidArg);
    }
    if is_set && !delete && (stack.arg(1) & 0xFFFF_0000) != 0 && !long_flag {
        return DispatchOutcome::Done(QuestStatus::InvalidArg);
    }
    let reg = stack.dest_reg(0);
    if reg > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }

    let op = QuestFlagOp {
        get: !is_set,
        long_flag,
        delete,
        flag_number: stack.arg(0),
        value: if is_set && !delete { stack.arg(1) } else { 0 },
    };

    match host.request_quest_flag(op) {
        Ok(()) => DispatchOutcome::Pending,
        Err(()) => DispatchOutcome::Done(QuestStatus::GatewayError),
    }
}

fn word_censor(stack: &QuestStack, host: &mut impl QuestHost, encoded: bool) -> DispatchOutcome {
    if stack.argc() < 1 || stack.argc() > 24 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    if stack.dest_reg(0) > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }

    let mut text = String::with_capacity(stack.argc() as usize);
    for i in 0..stack.argc() as usize {
        let word = stack.arg(i);
        if !encoded {
            if word > 127 {
                return DispatchOutcome::Done(QuestStatus::InvalidArg);
            }
            if word == 0 {
                break;
            }
            text.push(word as u8 as char);
        } else {
            if word > 26 {
                return DispatchOutcome::Done(QuestStatus::InvalidArg);
            }
            if word == 0 {
                break;
            }
            // 1..26 map to 'A'..'Z' (`quest_functions.c`'s `+ 64` offset).
            text.push((word as u8 + 64) as char);
        }
    }

    let matched = host.word_censor_check(&text);
    host.send_sync_register(stack.dest_reg(0) as u8, matched as u32);
    DispatchOutcome::Done(QuestStatus::Ok)
}

fn position_updates_subscribe(stack: &QuestStack, host: &mut impl QuestHost) -> DispatchOutcome {
    if stack.argc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    let selector = stack.arg(0);

    if selector == ALL_CLIENTS {
        if stack.retc() != 4 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        for i in 0..4 {
            if stack.dest_reg(i) > 255 {
                return DispatchOutcome::Done(QuestStatus::InvalidRegister);
            }
        }
        for i in 0..4 {
            let reg = stack.dest_reg(i) as u8;
            host.subscribe_position_updates(i, reg);
            match host.player_position(i) {
                Some((x, y, z)) => {
                    host.send_sync_register(reg, x.to_bits());
                    host.send_sync_register(reg.wrapping_add(1), y.to_bits());
                    host.send_sync_register(reg.wrapping_add(2), z.to_bits());
                    host.send_sync_register(
                        reg.wrapping_add(3),
                        host.player_floor(i).map(u32::from).unwrap_or(ABSENT),
                    );
                }
                None => {
                    for offset in 0..4u8 {
                        host.send_sync_register(reg.wrapping_add(offset), ABSENT);
                    }
                }
            }
        }
        DispatchOutcome::Done(QuestStatus::Ok)
    } else if selector < 4 {
        if stack.retc() != 1 {
            return DispatchOutcome::Done(QuestStatus::BadReturnCount);
        }
        if stack.dest_reg(0) > 255 {
            return DispatchOutcome::Done(QuestStatus::InvalidRegister);
        }
        let slot = selector as usize;
        let reg = stack.dest_reg(0) as u8;
        host.subscribe_position_updates(slot, reg);
        match host.player_position(slot) {
            Some((x, y, z)) => {
                host.send_sync_register(reg, x.to_bits());
                host.send_sync_register(reg.wrapping_add(1), y.to_bits());
                host.send_sync_register(reg.wrapping_add(2), z.to_bits());
            }
            None => host.send_sync_register(reg, ABSENT),
        }
        DispatchOutcome::Done(QuestStatus::Ok)
    } else {
        DispatchOutcome::Done(QuestStatus::InvalidArg)
    }
}

fn client_count_updates_subscribe(stack: &QuestStack, host: &mut impl QuestHost) -> DispatchOutcome {
    if stack.argc() != 0 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    if stack.dest_reg(0) > 255 {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }
    let reg = stack.dest_reg(0) as u8;
    host.subscribe_client_count_updates(reg);
    let count = host.team_client_count();
    host.send_sync_register(reg, count);
    DispatchOutcome::Done(QuestStatus::Ok)
}

/// The ship name, padded/truncated to 12 bytes and packed into registers
/// the way `get_ship_name`/`get_ship_name_utf16` do (3 or 6 consecutive
/// registers).
fn ship_name(stack: &QuestStack, host: &mut impl QuestHost, utf16: bool) -> DispatchOutcome {
    if stack.argc() != 0 {
        return DispatchOutcome::Done(QuestStatus::BadArgCount);
    }
    if stack.retc() != 1 {
        return DispatchOutcome::Done(QuestStatus::BadReturnCount);
    }
    let base = stack.dest_reg(0);
    let max_base = if utf16 { 250 } else { 253 };
    if base > max_base {
        return DispatchOutcome::Done(QuestStatus::InvalidRegister);
    }

    let mut name_bytes = [0u8; 12];
    let src = host.ship_name().as_bytes();
    let n = src.len().min(12);
    name_bytes[..n].copy_from_slice(&src[..n]);

    if !utf16 {
        for i in 0..3 {
            let b = &name_bytes[i * 4..i * 4 + 4];
            let packed = b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16 | (b[3] as u32) << 24;
            host.send_sync_register((base as u8).wrapping_add(i as u8), packed);
        }
    } else {
        for i in 0..6 {
            let b = &name_bytes[i * 2..i * 2 + 2];
            let packed = b[0] as u32 | (b[1] as u32) << 16;
            host.send_sync_register((base as u8).wrapping_add(i as u8), packed);
        }
    }
    DispatchOutcome::Done(QuestStatus::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeHost {
        registers: HashMap<u8, u32>,
        positions: HashMap<usize, (f32, f32, f32)>,
        floors: HashMap<usize, u8>,
        classes: HashMap<usize, i32>,
        team_count: u32,
        requested_flag: Option<QuestFlagOp>,
        flag_should_fail: bool,
    }

    impl QuestHost for FakeHost {
        fn send_sync_register(&mut self, reg: u8, value: u32) {
            self.registers.insert(reg, value);
        }
        fn team_client_count(&self) -> u32 {
            self.team_count
        }
        fn ship_client_count(&self) -> u32 {
            42
        }
        fn block_client_count(&self) -> u32 {
            7
        }
        fn player_section_id(&self, slot: usize) -> Option<u8> {
            if slot == 0 {
                Some(3)
            } else {
                None
            }
        }
        fn player_class(&self, slot: usize) -> Option<i32> {
            self.classes.get(&slot).copied()
        }
        fn player_floor(&self, slot: usize) -> Option<u8> {
            self.floors.get(&slot).copied()
        }
        fn player_position(&self, slot: usize) -> Option<(f32, f32, f32)> {
            self.positions.get(&slot).copied()
        }
        fn player_level(&self, slot: usize) -> Option<u32> {
            if slot == 0 {
                Some(9)
            } else {
                None
            }
        }
        fn random_range(&mut self, _min: u32, _max_inclusive: u32) -> u32 {
            0
        }
        fn team_seed(&self) -> u32 {
            0xABCD
        }
        fn ship_name(&self) -> &str {
            "Test Ship"
        }
        fn word_censor_check(&self, text: &str) -> bool {
            text.contains("bad")
        }
        fn subscribe_position_updates(&mut self, _subject_slot: usize, _reg: u8) {}
        fn subscribe_client_count_updates(&mut self, _reg: u8) {}
        fn request_quest_flag(&mut self, op: QuestFlagOp) -> Result<(), ()> {
            if self.flag_should_fail {
                Err(())
            } else {
                self.requested_flag = Some(op);
                Ok(())
            }
        }
    }

    fn push_all(stack: &mut QuestStack, words: &[u32]) {
        for &w in words {
            stack.push(w);
        }
    }

    #[test]
    fn server_time_writes_destination_register() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[1, 0, 1, 9]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::Ok));
        assert!(host.registers.contains_key(&9));
    }

    #[test]
    fn section_id_single_player_uses_absent_sentinel_when_missing() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[0, 1, 1, 1, 9]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::Ok));
        assert_eq!(host.registers[&9], ABSENT);
    }

    #[test]
    fn section_id_present_player_returns_value() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[0, 1, 1, 0, 9]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::Ok));
        assert_eq!(host.registers[&9], 3);
    }

    #[test]
    fn random_int_rejects_inverted_range() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[9, 2, 1, 10, 5, 0]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::InvalidArg));
    }

    #[test]
    fn get_short_flag_returns_pending_and_records_request() {
        let mut stack = QuestStack::new();
        // function=12, argc=1, retc=1, flag=7, dest_reg=3
        push_all(&mut stack, &[12, 1, 1, 7, 3]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Pending);
        assert_eq!(host.requested_flag.unwrap().flag_number, 7);
    }

    #[test]
    fn get_short_flag_gateway_failure_is_synchronous_error() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[12, 1, 1, 7, 3]);
        let mut host = FakeHost {
            flag_should_fail: true,
            ..Default::default()
        };
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::GatewayError));
    }

    #[test]
    fn word_censor_ascii_detects_match() {
        let mut stack = QuestStack::new();
        // "bad" = 98, 97, 100
        push_all(&mut stack, &[18, 3, 1, 98, 97, 100, 5]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::Ok));
        assert_eq!(host.registers[&5], 1);
    }

    #[test]
    fn unknown_function_id_is_invalid_function() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[999, 0, 0]);
        let mut host = FakeHost::default();
        let outcome = dispatch(&stack, &mut host);
        assert_eq!(outcome, DispatchOutcome::Done(QuestStatus::InvalidFunction));
    }

    #[test]
    fn max_function_id_reports_constant() {
        let mut stack = QuestStack::new();
        push_all(&mut stack, &[25, 0, 1, 4]);
        let mut host = FakeHost::default();
        dispatch(&stack, &mut host);
        assert_eq!(host.registers[&4], MAX_FUNCTION_ID);
    }
}
