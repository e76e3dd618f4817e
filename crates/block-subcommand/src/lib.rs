//! The in-team subcommand translator and server-side policy enforcer
//! (`spec.md` §4.4, §4.5): opcode constants, AoE hit-window timing,
//! register-sync's four behaviors, monster-hit bookkeeping, object-hit AoE
//! attribution, legit-mode policy, and the Blue-Burst floor-item and bank
//! protocols.

pub mod aoe_timing;
pub mod blue_burst_bank;
pub mod blue_burst_floor;
pub mod guildcard;
pub mod monster;
pub mod object_hit;
pub mod opcode;
pub mod policy;
pub mod register_sync;
pub mod word_select;

pub use aoe_timing::AoeTechnique;
pub use blue_burst_bank::{deposit_item, open_bank, withdraw_item, BankSnapshot, DepositError};
pub use blue_burst_floor::{handle_drop_pos, handle_drop_stack, handle_pick_up, DropSource, DropStaging};
pub use guildcard::{route_guildcard_exchange, GuildCardRoutingOutcome};
pub use monster::{is_dead, record_hit, should_count_kill, MonsterHitOutcome};
pub use object_hit::{attributes_to_aoe, start_cast, PendingAoeCast};
pub use policy::{decide_item_drop, decide_take_item, should_suppress_damage, should_suppress_technique_cost};
pub use register_sync::{handle_register_sync, RegisterSyncAction};
pub use word_select::{broadcast_word_select, WordSelectBroadcast};
