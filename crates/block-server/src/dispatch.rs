//! Packet dispatch, subcommand translation, and policy enforcement
//! (`spec.md` §4.4-§4.7). `Block::handle_msg` hands every inbound frame to
//! [`handle_frame`], which routes on the outer packet type, applies
//! per-opcode policy to game subcommands, and drives the quest-function
//! dispatcher through a small [`QuestHost`] bridge.

use crate::block::Block;
use block_gateway::sent::{self, ForwardedVariant};
use block_lobby::lobby::{GameTags, JoinOutcome, LeaveOutcome};
use block_protocol_core::subcommand::{validate_against_outer, SubHeader, SubIdField};
use block_protocol_core::Header;
use block_protocol_legacy::guildcard::translate_guildcard;
use block_protocol_legacy::word_select::translate_word_select;
use block_quest::dispatcher::{self, DispatchOutcome, QuestFlagOp as DispatchQuestFlagOp, QuestHost};
use block_quest::status::QuestStatus;
use block_quest::stack::PushOutcome;
use block_subcommand::{
    aoe_timing::AoeTechnique,
    attributes_to_aoe, broadcast_word_select,
    deposit_item, handle_drop_pos, handle_drop_stack, handle_pick_up, handle_register_sync, is_dead,
    record_hit, open_bank, opcode, route_guildcard_exchange,
    should_count_kill, should_suppress_damage, should_suppress_technique_cost, start_cast,
    withdraw_item, DropSource, GuildCardRoutingOutcome, ItemDropDecision, RegisterSyncAction,
    TakeItemDecision, WordSelectBroadcast,
};
use block_subcommand::policy::{decide_item_drop, decide_take_item};
use block_types::{
    ClientFlags, ClientId, ClientVariant, GuildNumber, ItemData, ItemId, LobbyId, RegisterId, SlotId,
};
use bytes::{Buf, BytesMut};
use tracing::warn;

/// Outer packet type tags this ship recognizes (`spec.md` §4.1, §4.3,
/// §4.4, §4.5). These are the canonical hex values named in the
/// specification rather than this crate's own invented opcodes.
pub mod packet_type {
    pub const WELCOME: u16 = 0x02;
    pub const SECURITY: u16 = 0x04;
    pub const DISCONNECT: u16 = 0x05;
    pub const CHAT: u16 = 0x06;
    pub const BLOCK_LIST: u16 = 0x07;
    pub const GAME_LIST: u16 = 0x08;
    pub const INFO_REQUEST: u16 = 0x09;
    pub const MENU_SELECT: u16 = 0x10;
    pub const INFO_REPLY: u16 = 0x11;
    pub const QUEST_CHUNK: u16 = 0x13;
    pub const REDIRECT: u16 = 0x19;
    pub const MESSAGE_BOX: u16 = 0x1A;
    pub const GUILD_CARD_SEARCH: u16 = 0x40;
    pub const QUEST_FILE: u16 = 0x44;
    pub const GAME_SUBCOMMAND_BROADCAST: u16 = 0x60;
    pub const CHARACTER_DATA: u16 = 0x61;
    pub const GAME_SUBCOMMAND_TARGETED: u16 = 0x62;
    pub const GAME_JOIN: u16 = 0x64;
    pub const GAME_ADD_PLAYER: u16 = 0x65;
    pub const GAME_LEAVE: u16 = 0x66;
    pub const LOBBY_JOIN: u16 = 0x67;
    pub const LOBBY_ADD_PLAYER: u16 = 0x68;
    pub const LOBBY_LEAVE: u16 = 0x69;
    pub const GAME_SUBCOMMAND_TARGETED_ALT: u16 = 0x6D;
    pub const DONE_BURSTING: u16 = 0x6F;
    pub const SIMPLE_MAIL: u16 = 0x81;
    pub const LOBBY_LIST: u16 = 0x83;
    pub const ARROW_LIST: u16 = 0x88;
    pub const ARROW_CHANGE: u16 = 0x89;
    pub const LOBBY_NAME: u16 = 0x8A;
    pub const LOGIN: u16 = 0x93;
    pub const LOGIN_V2: u16 = 0x9D;
    pub const LOGIN_BB: u16 = 0x9E;
    pub const SHIP_LIST: u16 = 0xA0;
    pub const QUEST_LIST: u16 = 0xA2;
    pub const QUEST_INFO: u16 = 0xA3;
    pub const TEXT_MESSAGE: u16 = 0xB0;
    pub const TIMESTAMP: u16 = 0xB1;
    pub const GAME_CREATE: u16 = 0xC1;
    pub const EP3_BROADCAST_A: u16 = 0xC9;
    pub const EP3_BROADCAST_B: u16 = 0xCB;
}
use packet_type as pt;

/// Entry point for every frame a client sends, called from
/// `Block::handle_msg`. Returning `Err` tells the caller to disconnect the
/// sender; most malformed-input paths below choose that instead of trying
/// to recover a desynced stream.
pub async fn handle_frame(
    block: &mut Block,
    client: ClientId,
    header: Header,
    body: BytesMut,
) -> anyhow::Result<()> {
    if let Some(state) = block.clients.get_mut(&client) {
        state.touch_received();
    } else {
        return Ok(());
    }

    match header.pkt_type {
        pt::DISCONNECT => {
            block.disconnect(client).await;
        }
        pt::CHAT | pt::SIMPLE_MAIL | pt::TEXT_MESSAGE => {
            relay_chat(block, client, &body).await?;
        }
        pt::GUILD_CARD_SEARCH => {
            // Cross-ship search forwards through the gateway unchanged
            // (`spec.md` §4.6); in-lobby guild-card exchange between two
            // clients on this block is a subcommand, handled below.
            forward_to_gateway(block, client, &body)?;
        }
        pt::GAME_SUBCOMMAND_BROADCAST | pt::GAME_SUBCOMMAND_TARGETED | pt::GAME_SUBCOMMAND_TARGETED_ALT => {
            handle_subcommand(block, client, header.pkt_type, body).await?;
        }
        pt::GAME_CREATE => {
            handle_game_create(block, client, &body).await?;
        }
        pt::GAME_JOIN | pt::LOBBY_JOIN => {
            handle_join(block, client, header.pkt_type, &body).await?;
        }
        pt::GAME_LEAVE | pt::LOBBY_LEAVE => {
            handle_leave(block, client).await?;
        }
        pt::DONE_BURSTING => {
            handle_done_bursting(block, client).await?;
        }
        pt::EP3_BROADCAST_A | pt::EP3_BROADCAST_B => {
            broadcast_raw(block, client, header.pkt_type, &body).await?;
        }
        other => {
            block.scripting.fire(
                block_scripting::Hook::UnknownBlockPacket,
                block_scripting::HookContext::new()
                    .field("type", other as u32)
                    .field("client_id", client.0 as u32),
            );
        }
    }
    Ok(())
}

fn forward_to_gateway(block: &mut Block, client: ClientId, body: &[u8]) -> anyhow::Result<()> {
    let Some(state) = block.clients.get(&client) else {
        return Ok(());
    };
    let variant = if state.variant.is_blue_burst() {
        ForwardedVariant::Bb
    } else if state.variant.is_pc_family() {
        ForwardedVariant::Pc
    } else {
        ForwardedVariant::Dc
    };
    let (pkt_type, flags, payload) = sent::forward_client_packet(variant, body);
    let _ = block.gateway_tx.send((pkt_type, flags, payload));
    Ok(())
}

async fn relay_chat(block: &mut Block, sender: ClientId, body: &[u8]) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&sender).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let recipients: Vec<ClientId> = block
        .lobbies
        .get(lobby_id)
        .map(|lobby| lobby.occupied_slots().map(|(_, id)| id).filter(|&id| id != sender).collect())
        .unwrap_or_default();
    for id in recipients {
        if let Some(client) = block.clients.get_mut(&id) {
            if client.writer.write_frame(pt::CHAT, 0, body).await.is_ok() {
                client.touch_sent();
            }
        }
    }
    Ok(())
}

async fn broadcast_raw(block: &mut Block, sender: ClientId, pkt_type: u16, body: &[u8]) -> anyhow::Result<()> {
    broadcast_to_lobby(block, sender, pkt_type, body).await;
    Ok(())
}

/// Send `body` to every other occupant of `sender`'s lobby, or queue it for
/// anyone still `Bursting` (`spec.md` §4.3 "deferred delivery").
async fn broadcast_to_lobby(block: &mut Block, sender: ClientId, pkt_type: u16, body: &[u8]) {
    let Some(lobby_id) = block.clients.get(&sender).and_then(|c| c.lobby) else {
        return;
    };
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return;
    };
    let occupants: Vec<(SlotId, ClientId)> = lobby.occupied_slots().collect();
    let bursting = lobby.is_bursting();
    let mut frame = Vec::with_capacity(body.len());
    frame.extend_from_slice(body);

    for (slot, id) in occupants {
        if id == sender {
            continue;
        }
        if bursting {
            lobby.enqueue_burst_payload(slot, frame.clone());
            continue;
        }
        if let Some(client) = block.clients.get_mut(&id) {
            if client.writer.write_frame(pkt_type, 0, &frame).await.is_ok() {
                client.touch_sent();
            }
        }
    }
}

async fn handle_game_create(block: &mut Block, client: ClientId, body: &[u8]) -> anyhow::Result<()> {
    if body.len() < 4 {
        return Err(anyhow::anyhow!("truncated game-create body"));
    }
    let difficulty = body[0];
    let battle = body.get(1).copied().unwrap_or(0) != 0;
    let challenge = body.get(2).copied().unwrap_or(0) != 0;
    let name = read_cstring(&body[4..]);

    let tags = GameTags {
        difficulty,
        battle,
        challenge,
        version: 0,
        section_id: 0,
        event: 0,
        name,
        password: None,
    };
    let lobby_id = block.lobbies.create_game(4, tags);
    join_lobby(block, client, lobby_id).await
}

async fn handle_join(block: &mut Block, client: ClientId, pkt_type: u16, body: &[u8]) -> anyhow::Result<()> {
    let raw = if body.len() >= 4 {
        u32::from_le_bytes([body[0], body[1], body[2], body[3]])
    } else {
        return Err(anyhow::anyhow!("truncated join body"));
    };
    let lobby_id = if pkt_type == pt::GAME_JOIN {
        LobbyId(raw)
    } else {
        LobbyId(raw.min(14))
    };
    join_lobby(block, client, lobby_id).await
}

async fn join_lobby(block: &mut Block, client: ClientId, lobby_id: LobbyId) -> anyhow::Result<()> {
    if let Some(prev) = block.clients.get(&client).and_then(|c| c.lobby) {
        leave_lobby(block, client, prev).await;
    }

    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let outcome: JoinOutcome = match lobby.add_client(client) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(?client, ?lobby_id, "join rejected: {}", e);
            return Ok(());
        }
    };

    if let Some(state) = block.clients.get_mut(&client) {
        state.lobby = Some(lobby_id);
        state.slot = Some(outcome.slot);
        if outcome.entered_bursting {
            state.flags.insert(ClientFlags::BURSTING);
        }
    }

    block.scripting.fire(
        block_scripting::Hook::TeamJoin,
        block_scripting::HookContext::new()
            .field("client_id", client.0 as u32)
            .field("lobby_id", lobby_id.0)
            .field("slot", outcome.slot.0 as u32)
            .field("became_leader", outcome.became_leader),
    );
    Ok(())
}

async fn leave_lobby(block: &mut Block, client: ClientId, lobby_id: LobbyId) {
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return;
    };
    let Ok(outcome): Result<LeaveOutcome, _> = lobby.remove_client(client) else {
        return;
    };
    if let Some(state) = block.clients.get_mut(&client) {
        state.lobby = None;
        state.slot = None;
    }
    block.scripting.fire(
        block_scripting::Hook::TeamLeave,
        block_scripting::HookContext::new()
            .field("client_id", client.0 as u32)
            .field("lobby_id", lobby_id.0)
            .field("was_leader", outcome.was_leader),
    );
    if outcome.destroyed {
        block.scripting.fire(
            block_scripting::Hook::TeamDestroy,
            block_scripting::HookContext::new().field("lobby_id", lobby_id.0),
        );
    }
}

async fn handle_leave(block: &mut Block, client: ClientId) -> anyhow::Result<()> {
    if let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) {
        leave_lobby(block, client, lobby_id).await;
    }
    Ok(())
}

/// `spec.md` §4.3 "done bursting": the client has finished drawing the
/// lobby and is ready for anything queued while it was.
async fn handle_done_bursting(block: &mut Block, client: ClientId) -> anyhow::Result<()> {
    let Some(slot) = block.clients.get(&client).and_then(|c| c.slot) else {
        return Ok(());
    };
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let payloads = block
        .lobbies
        .get_mut(lobby_id)
        .map(|lobby| lobby.complete_burst(slot))
        .unwrap_or_default();
    if let Some(state) = block.clients.get_mut(&client) {
        state.flags.remove(ClientFlags::BURSTING);
        for payload in payloads {
            if state.writer.write_frame(pt::GAME_SUBCOMMAND_BROADCAST, 0, &payload).await.is_ok() {
                state.touch_sent();
            }
        }
    }
    Ok(())
}

fn read_cstring(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ---------------------------------------------------------------------
// Game subcommands
// ---------------------------------------------------------------------

/// Subcommand opcodes whose `id_field` carries a full client id rather than
/// two independent bytes (`spec.md` §4.4's per-opcode id-field shape).
fn wide_id_field(opcode: u8) -> bool {
    matches!(opcode, opcode::SYNC_REGISTER) && false
        || matches!(
            opcode,
            opcode::TAKE_ITEM
                | opcode::MONSTER_HIT
                | opcode::OBJECT_HIT
                | opcode::BB_PICK_UP
                | opcode::GUILD_CARD_EXCHANGE
        )
}

async fn handle_subcommand(
    block: &mut Block,
    client: ClientId,
    pkt_type: u16,
    body: BytesMut,
) -> anyhow::Result<()> {
    if body.len() < 4 {
        return Err(anyhow::anyhow!("subcommand body too short for a header"));
    }
    let wide = wide_id_field(body[0]);
    let header = SubHeader::parse(&body, wide)?;
    validate_against_outer(header, body.len())?;

    let payload = &body[4..];

    match header.opcode {
        opcode::ITEM_DROP_REQUEST => handle_item_drop(block, client, payload, &body, pkt_type).await?,
        opcode::TAKE_ITEM => handle_take_item(block, client, payload).await?,
        opcode::DAMAGE_TAKEN => handle_damage_taken(block, client, &body, pkt_type).await?,
        opcode::TECHNIQUE_USED => handle_technique_used(block, client, &body, pkt_type).await?,
        opcode::SET_AREA => handle_set_area(block, client, payload, &body, pkt_type).await?,
        opcode::SET_POSITION | opcode::MOVE => {
            handle_position(block, client, payload, &body, pkt_type).await?;
        }
        opcode::DELETE_ITEM => handle_delete_item(block, client, payload).await?,
        opcode::BUY_ITEM => handle_buy_item(block, client, payload, &body, pkt_type).await?,
        opcode::USE_ITEM => handle_use_item(block, client, payload, &body, pkt_type).await?,
        opcode::MONSTER_HIT => handle_monster_hit(block, client, payload, &body, pkt_type).await?,
        opcode::OBJECT_HIT => handle_object_hit(block, client, payload, &body, pkt_type).await?,
        opcode::WORD_SELECT => handle_word_select(block, client, payload).await?,
        opcode::GUILD_CARD_EXCHANGE => handle_guildcard_exchange(block, client, header, payload).await?,
        opcode::SYNC_REGISTER => handle_sync_register(block, client, payload).await?,
        opcode::BB_DROP_POS => handle_bb_drop_pos(block, client, payload).await?,
        opcode::BB_DROP_STACK => handle_bb_drop_stack(block, client, payload).await?,
        opcode::BB_PICK_UP => handle_bb_pick_up(block, client, payload).await?,
        opcode::BB_BANK_OPEN => handle_bb_bank_open(block, client).await?,
        opcode::BB_BANK_ACTION => handle_bb_bank_action(block, client, payload).await?,
        _ => {
            // Unrecognized opcode: forward unchanged to the rest of the
            // lobby, same as the reference server's catch-all relay.
            broadcast_to_lobby(block, client, pkt_type, &body).await;
        }
    }
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    if bytes.len() < offset + 4 {
        return 0;
    }
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}

fn item_data_at(bytes: &[u8], offset: usize) -> ItemData {
    ItemData::new(
        [read_u32(bytes, offset), read_u32(bytes, offset + 4), read_u32(bytes, offset + 8)],
        read_u32(bytes, offset + 12),
    )
}

/// `opcode::ITEM_DROP_REQUEST`: payload is `item(16) + x(4) + z(4)`.
/// Legit-mode lobbies can reject and destroy the item instead of letting it
/// hit the floor (`spec.md` §4.4, §4.8 invariant 2). A reject warns every
/// occupant, relays the drop to everyone but the dropper so it still
/// visibly lands, and immediately follows with a destroy-item broadcast to
/// everyone so no client's floor state desyncs (`subcmd.c:895-929`,
/// `original_source/`).
async fn handle_item_drop(block: &mut Block, client: ClientId, payload: &[u8], raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let item = item_data_at(payload, 0);
    let x = read_f32(payload, 16);
    let z = read_f32(payload, 20);
    let legit_mode = block.clients.get(&client).map(|c| c.flags.contains(ClientFlags::ALWAYS_LEGIT)).unwrap_or(false);

    match decide_item_drop(&block.limits, legit_mode, &item) {
        ItemDropDecision::RejectAndDestroy => {
            let occupants: Vec<ClientId> = block
                .lobbies
                .get(lobby_id)
                .map(|lobby| lobby.occupied_slots().map(|(_, id)| id).collect())
                .unwrap_or_default();

            for id in &occupants {
                if let Some(state) = block.clients.get_mut(id) {
                    let msg = block.messages.get(state.lang, "item.not_legit.drop_warn");
                    if state.writer.write_frame(pt::MESSAGE_BOX, 0, msg.as_bytes()).await.is_ok() {
                        state.touch_sent();
                    }
                }
            }

            broadcast_to_lobby(block, client, pkt_type, raw).await;

            let item_id = block.lobbies.get_mut(lobby_id).map(|lobby| lobby.floor_items.next_id()).unwrap_or(ItemId(0));
            let mut destroy_body = Vec::with_capacity(8);
            SubHeader {
                opcode: opcode::DESTROY_ITEM,
                size_words: 2,
                id_field: SubIdField::TwoBytes(0, 0),
            }
            .write(&mut destroy_body);
            destroy_body.extend_from_slice(&item_id.0.to_le_bytes());

            for id in &occupants {
                if let Some(state) = block.clients.get_mut(id) {
                    if state.writer.write_frame(pt::GAME_SUBCOMMAND_BROADCAST, 0, &destroy_body).await.is_ok() {
                        state.touch_sent();
                    }
                }
            }
        }
        ItemDropDecision::Allow => {
            let floor = block.clients.get(&client).map(|c| c.position.floor).unwrap_or(0);
            if let Some(lobby) = block.lobbies.get_mut(lobby_id) {
                lobby.floor_items.spawn(item, 1, x, z, floor);
            }
        }
    }
    Ok(())
}

/// `opcode::TAKE_ITEM`: payload is `item_id(4)`. A legit-mode violation
/// sends a box-modal kick message, then disconnects the taker (`spec.md`
/// §7 "pickup path → box-modal kick message + disconnect", §8 scenario 3).
async fn handle_take_item(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let item_id = ItemId(read_u32(payload, 0));
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let Some(item) = lobby.floor_items.get(item_id).cloned() else {
        return Ok(());
    };
    let legit_mode = block.clients.get(&client).map(|c| c.flags.contains(ClientFlags::ALWAYS_LEGIT)).unwrap_or(false);

    match decide_take_item(&block.limits, legit_mode, &item.data) {
        TakeItemDecision::Disconnect => {
            if let Some(state) = block.clients.get_mut(&client) {
                let msg = block.messages.get(state.lang, "item.not_legit.pickup");
                let _ = state.writer.write_frame(pt::MESSAGE_BOX, 0, msg.as_bytes()).await;
            }
            block.disconnect(client).await;
        }
        TakeItemDecision::Allow => {
            if let Some(lobby) = block.lobbies.get_mut(lobby_id) {
                lobby.floor_items.take(item_id);
            }
            if let Some(state) = block.clients.get_mut(&client) {
                state.inventory.add(item.data, item.quantity);
            }
        }
    }
    Ok(())
}

/// Stat tags for [`broadcast_stat_modifier`], matching `subcmd.c`'s
/// `SUBCMD_STAT_HPUP`/`SUBCMD_STAT_TPUP` (`original_source/`).
const STAT_MODIFIER_HP_UP: u8 = 0;
const STAT_MODIFIER_TP_UP: u8 = 1;

/// Broadcast a stat-modifier subcommand crediting `client`'s in-lobby slot
/// with `amount` of the named stat. Used to compensate a sender whose
/// damage/technique-cost broadcast this block just suppressed, so their
/// HP/TP bar doesn't silently drift from what the rest of the lobby sees
/// (`subcmd.c:955-1024`, `original_source/`: `send_lobby_mod_stat`).
async fn broadcast_stat_modifier(block: &mut Block, client: ClientId, stat: u8, amount: u16) {
    let Some(slot) = block.clients.get(&client).and_then(|c| c.slot) else {
        return;
    };
    let mut body = Vec::with_capacity(8);
    SubHeader {
        opcode: opcode::STAT_MODIFIER,
        size_words: 2,
        id_field: SubIdField::ClientId(slot.0 as u16),
    }
    .write(&mut body);
    body.push(stat);
    body.push(0);
    body.extend_from_slice(&amount.to_le_bytes());
    broadcast_to_lobby(block, client, pt::GAME_SUBCOMMAND_BROADCAST, &body).await;
}

/// `opcode::DAMAGE_TAKEN`: suppressed entirely (not forwarded) when the
/// sender is invulnerable and not in legit mode, replaced with a
/// compensating HP-refill stat-modifier broadcast so the sender's HP bar
/// is restored for the rest of the lobby (`spec.md` §4.4, §4.8 invariant
/// 3).
async fn handle_damage_taken(block: &mut Block, client: ClientId, raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let Some(state) = block.clients.get(&client) else {
        return Ok(());
    };
    let invulnerable = state.flags.contains(ClientFlags::INVULNERABLE);
    let legit_mode = state.flags.contains(ClientFlags::ALWAYS_LEGIT);
    if should_suppress_damage(invulnerable, legit_mode) {
        broadcast_stat_modifier(block, client, STAT_MODIFIER_HP_UP, 2000).await;
        return Ok(());
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::TECHNIQUE_USED`: suppresses the TP-cost broadcast under
/// infinite-TP outside legit mode in favor of a compensating TP-restore
/// stat-modifier, the same shape as damage suppression, and starts an
/// AoE-attribution window for the cast technique/level
/// (`spec.md` §4.4 "Object hit").
async fn handle_technique_used(block: &mut Block, client: ClientId, raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let payload = &raw[4..];
    let technique_id = payload.first().copied().unwrap_or(0);
    let level = payload.get(1).copied().unwrap_or(0) as u32;

    if let Some(technique) = aoe_technique_from_id(technique_id) {
        let now_ms = now_ms();
        if let Some(state) = block.clients.get_mut(&client) {
            state.pending_aoe = Some(start_cast(technique, level, now_ms));
        }
    }

    let Some(state) = block.clients.get(&client) else {
        return Ok(());
    };
    let infinite_tp = state.flags.contains(ClientFlags::INFINITE_TP);
    let legit_mode = state.flags.contains(ClientFlags::ALWAYS_LEGIT);
    if should_suppress_technique_cost(infinite_tp, legit_mode) {
        broadcast_stat_modifier(block, client, STAT_MODIFIER_TP_UP, 255).await;
        return Ok(());
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

fn aoe_technique_from_id(id: u8) -> Option<AoeTechnique> {
    match id {
        0 => Some(AoeTechnique::Barta),
        1 => Some(AoeTechnique::Gibarta),
        2 => Some(AoeTechnique::Gifoie),
        3 => Some(AoeTechnique::Gizonde),
        4 => Some(AoeTechnique::Rafoie),
        5 => Some(AoeTechnique::Razonde),
        6 => Some(AoeTechnique::Rabarta),
        _ => None,
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// `opcode::SET_AREA`: payload is `floor(1)`, validated and mirrored into
/// the client's tracked position before forwarding.
async fn handle_set_area(
    block: &mut Block,
    client: ClientId,
    payload: &[u8],
    raw: &BytesMut,
    pkt_type: u16,
) -> anyhow::Result<()> {
    let floor = payload.first().copied().unwrap_or(0);
    if let Some(state) = block.clients.get_mut(&client) {
        if floor <= block_types::Position::MAX_FLOOR {
            state.position.floor = floor;
        }
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::SET_POSITION`/`opcode::MOVE`: payload is `x(4) y(4) z(4)`.
/// Mirrors the client's tracked position and notifies any registers
/// subscribed to this slot's position updates (`spec.md` §4.7
/// `position_updates_subscribe`).
async fn handle_position(
    block: &mut Block,
    client: ClientId,
    payload: &[u8],
    raw: &BytesMut,
    pkt_type: u16,
) -> anyhow::Result<()> {
    let x = read_f32(payload, 0);
    let y = read_f32(payload, 4);
    let z = read_f32(payload, 8);
    let (lobby_id, subject_slot) = match block.clients.get_mut(&client) {
        Some(state) => {
            state.position.x = x;
            state.position.y = y;
            state.position.z = z;
            (state.lobby, state.slot)
        }
        None => (None, None),
    };

    if let (Some(lobby_id), Some(subject_slot)) = (lobby_id, subject_slot) {
        notify_position_subscribers(block, lobby_id, subject_slot, x, y, z);
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

fn notify_position_subscribers(block: &mut Block, lobby_id: LobbyId, subject_slot: SlotId, x: f32, y: f32, z: f32) {
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return;
    };
    let mut targets = Vec::new();
    for (recipient_slot, recipient_client) in lobby.occupied_slots() {
        if let Some(reg) = lobby.registers.position_update_register(recipient_slot, subject_slot) {
            targets.push((recipient_client, reg));
        }
    }
    // Position updates are encoded as three consecutive sync registers
    // (x, y, z) starting at the subscribed register.
    for (recipient, reg) in targets {
        if let Some(state) = block.clients.get_mut(&recipient) {
            send_sync_register(state, reg.0, x.to_bits());
            send_sync_register(state, reg.0.wrapping_add(1), y.to_bits());
            send_sync_register(state, reg.0.wrapping_add(2), z.to_bits());
        }
    }
}

/// `opcode::DELETE_ITEM`: payload is `slot(1) quantity(4)`.
async fn handle_delete_item(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let slot = payload.first().copied().unwrap_or(0) as usize;
    let quantity = read_u32(payload, 1);
    if let Some(state) = block.clients.get_mut(&client) {
        state.inventory.remove(slot, quantity);
    }
    Ok(())
}

/// `opcode::BUY_ITEM`: payload is `item(16) price(4)`.
async fn handle_buy_item(block: &mut Block, client: ClientId, payload: &[u8], raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let item = item_data_at(payload, 0);
    let price = read_u32(payload, 16);
    if let Some(state) = block.clients.get_mut(&client) {
        if state.inventory.take_meseta(price) {
            state.inventory.add(item, 1);
        } else {
            return Ok(());
        }
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::USE_ITEM`: payload is `slot(1)`.
async fn handle_use_item(block: &mut Block, client: ClientId, payload: &[u8], raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let slot = payload.first().copied().unwrap_or(0) as usize;
    if let Some(state) = block.clients.get_mut(&client) {
        state.inventory.remove(slot, 1);
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::MONSTER_HIT`: payload is `monster_id(2) species(1) pad(1)
/// flags(4 LE)`, `flags` being the incoming packet's raw flags word (bit 11,
/// `0x800`, is the kill bit, read in the GC variant's byte-swapped
/// representation for GC-family senders — Open Question #2). Attributes a
/// kill to the hitting client's per-species counter on the dead-transition,
/// skipping the increment entirely when the species is a boss/rare entry
/// (`bp_entry >= 0x60`) or the team has an NPC ally present (`spec.md` §4.4
/// "Monster hit").
async fn handle_monster_hit(block: &mut Block, client: ClientId, payload: &[u8], raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let Some(hitter_slot) = block.clients.get(&client).and_then(|c| c.slot) else {
        return Ok(());
    };
    let monster_id = u16::from_le_bytes([payload.first().copied().unwrap_or(0), payload.get(1).copied().unwrap_or(0)]);
    let species = payload.get(2).copied().unwrap_or(0);
    let incoming_flags = read_u32(payload, 4);
    let gc_byte_order = block.clients.get(&client).map(|c| c.variant.is_gc_family()).unwrap_or(false);
    let team_has_npc = false;

    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let Some(enemy) = lobby.map_state.enemy_mut(monster_id) else {
        return Ok(());
    };
    let outcome = record_hit(&mut enemy.clients_hit, hitter_slot.0, incoming_flags, gc_byte_order);

    if outcome.just_killed && should_count_kill(species as u32, team_has_npc) {
        if let Some(state) = block.clients.get_mut(&client) {
            *state.kill_counts.entry(species).or_insert(0) += 1;
        }
        block.scripting.fire(
            block_scripting::Hook::EnemyKill,
            block_scripting::HookContext::new()
                .field("client_id", client.0 as u32)
                .field("monster_id", monster_id as u32)
                .field("species", species),
        );
    }
    block.scripting.fire(
        block_scripting::Hook::EnemyHit,
        block_scripting::HookContext::new()
            .field("client_id", client.0 as u32)
            .field("monster_id", monster_id as u32),
    );

    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::OBJECT_HIT`: payload is `object_id(2)`. Only counts as an AoE
/// hit if the sender has a still-live pending cast (`spec.md` §4.4 "Object
/// hit").
async fn handle_object_hit(block: &mut Block, client: ClientId, payload: &[u8], raw: &BytesMut, pkt_type: u16) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let object_id = u16::from_le_bytes([payload.first().copied().unwrap_or(0), payload.get(1).copied().unwrap_or(0)]);
    let now = now_ms();
    let pending = block.clients.get(&client).and_then(|c| c.pending_aoe);
    let attributed = attributes_to_aoe(pending, now);

    if attributed {
        if let Some(lobby) = block.lobbies.get_mut(lobby_id) {
            if let Some(object) = lobby.map_state.object_mut(object_id) {
                object.hit = true;
            }
        }
        block.scripting.fire(
            block_scripting::Hook::BoxBreak,
            block_scripting::HookContext::new()
                .field("client_id", client.0 as u32)
                .field("object_id", object_id as u32),
        );
    }
    broadcast_to_lobby(block, client, pkt_type, raw).await;
    Ok(())
}

/// `opcode::WORD_SELECT`: payload is `ws_type(2) word0(2)..word7(2)`.
async fn handle_word_select(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let ws_type = u16::from_le_bytes([payload.first().copied().unwrap_or(0), payload.get(1).copied().unwrap_or(0)]);
    let mut words = [0u16; 8];
    for (i, word) in words.iter_mut().enumerate() {
        let off = 2 + i * 2;
        *word = u16::from_le_bytes([payload.get(off).copied().unwrap_or(0), payload.get(off + 1).copied().unwrap_or(0)]);
    }
    let Some(sender_variant) = block.clients.get(&client).map(|c| c.variant) else {
        return Ok(());
    };
    let Some(lobby) = block.lobbies.get(lobby_id) else {
        return Ok(());
    };
    let recipients: Vec<(ClientId, ClientVariant)> = lobby
        .occupied_slots()
        .filter(|&(_, id)| id != client)
        .filter_map(|(_, id)| block.clients.get(&id).map(|c| (id, c.variant)))
        .collect();

    let broadcast: WordSelectBroadcast<ClientId> = match broadcast_word_select(
        &block.word_select_tables,
        sender_variant,
        ws_type,
        words,
        &recipients,
    ) {
        Ok(b) => b,
        Err(_) => return Ok(()),
    };

    for delivery in broadcast.deliveries {
        if let Some(state) = block.clients.get_mut(&delivery.recipient) {
            let mut body = Vec::with_capacity(18);
            body.extend_from_slice(&delivery.payload.ws_type.to_le_bytes());
            for w in delivery.payload.words {
                body.extend_from_slice(&w.to_le_bytes());
            }
            if state.writer.write_frame(pt::GAME_SUBCOMMAND_BROADCAST, 0, &body).await.is_ok() {
                state.touch_sent();
            }
        }
    }
    Ok(())
}

/// `opcode::GUILD_CARD_EXCHANGE`: `id_field` names the target, payload is
/// the sender's own guild-card record bytes (`spec.md` §4.4).
async fn handle_guildcard_exchange(block: &mut Block, client: ClientId, header: SubHeader, payload: &[u8]) -> anyhow::Result<()> {
    let SubIdField::ClientId(target_raw) = header.id_field else {
        return Ok(());
    };
    let target = ClientId(target_raw as u64);
    let Some(sender_variant) = block.clients.get(&client).map(|c| c.variant) else {
        return Ok(());
    };
    let Some((recipient_variant, recipient_lang)) = block.clients.get(&target).map(|c| (c.variant, c.lang)) else {
        return Ok(());
    };

    match route_guildcard_exchange(&block.messages, recipient_lang, sender_variant, recipient_variant, payload) {
        GuildCardRoutingOutcome::Forward(data) => {
            if let Some(state) = block.clients.get_mut(&target) {
                if state
                    .writer
                    .write_frame(pt::GAME_SUBCOMMAND_TARGETED, 0, &data)
                    .await
                    .is_ok()
                {
                    state.touch_sent();
                }
            }
        }
        GuildCardRoutingOutcome::NotifySender(text) => {
            if let Some(state) = block.clients.get_mut(&client) {
                let _ = state.writer.write_frame(pt::MESSAGE_BOX, 0, text.as_bytes()).await;
            }
        }
    }
    Ok(())
}

/// `opcode::SYNC_REGISTER`: the wire body this ship uses is
/// `reg(1) + 3 bytes padding + value(4, LE i32)` (invented; see
/// `DESIGN.md`). Dispatches into quest flags, quest-stack pushes, or plain
/// ship-side sync depending on what the lobby's registers are configured
/// for (`spec.md` §4.7).
async fn handle_sync_register(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    if payload.len() < 8 {
        return Ok(());
    }
    let reg = RegisterId(payload[0]);
    let value = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);

    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let Some(state) = block.clients.get_mut(&client) else {
        return Ok(());
    };

    let action = handle_register_sync(&mut lobby.registers, &mut state.quest_stack, reg, value);
    match action {
        RegisterSyncAction::ForwardUnchanged => {
            let mut body = vec![reg.0, 0, 0, 0];
            body.extend_from_slice(&value.to_le_bytes());
            drop(state);
            broadcast_to_lobby(block, client, pt::GAME_SUBCOMMAND_BROADCAST, &body).await;
        }
        RegisterSyncAction::ShipSideSync { .. } => {
            // Stored into `registers.sync_registers` by `handle_register_sync`
            // itself; nothing further to do until something reads it back.
        }
        RegisterSyncAction::QuestStackOverflow => {
            state.quest_stack.reset();
        }
        RegisterSyncAction::QuestStackPending => {}
        RegisterSyncAction::ShortFlagRequest { op, payload } => {
            drop(state);
            run_quest_flag_request(block, client, lobby_id, op, payload).await;
        }
        RegisterSyncAction::QuestStackReady => {
            drop(state);
            run_quest_dispatch(block, client, lobby_id).await;
        }
    }
    Ok(())
}

async fn run_quest_flag_request(
    block: &mut Block,
    client: ClientId,
    _lobby_id: LobbyId,
    op: block_subcommand::register_sync::ShortFlagOp,
    payload: u32,
) {
    use block_subcommand::register_sync::ShortFlagOp;
    let Some(state) = block.clients.get_mut(&client) else {
        return;
    };
    let gw_op = match op {
        ShortFlagOp::Get => sent::QuestFlagOp::Get,
        ShortFlagOp::Set => sent::QuestFlagOp::Set,
        ShortFlagOp::Delete => sent::QuestFlagOp::Delete,
    };
    let guild = state.guild;
    let flag_no = (payload & 0xFFFF) as u16;
    let value = payload;
    state.flags.insert(ClientFlags::QUEST_STACK_LOCK);
    let (pkt_type, flags, body) = sent::quest_flag_request(guild, gw_op, flag_no, value, false);
    let _ = block.gateway_tx.send((pkt_type, flags, body));
}

/// The one owned per-slot snapshot the quest-function dispatcher needs
/// (`spec.md` §4.7): taken up front so `QuestHostCtx` never needs to borrow
/// `block.clients` while it also holds the calling client's own
/// `&mut QuestStack`.
#[derive(Debug, Clone, Copy, Default)]
struct SlotSnapshot {
    present: bool,
    section_id: u8,
    class: i32,
    level: u32,
    floor: u8,
    position: (f32, f32, f32),
}

struct QuestHostCtx<'a> {
    block: &'a mut Block,
    lobby_id: LobbyId,
    caller_client: ClientId,
    slots: [SlotSnapshot; 4],
    outbox: Vec<(u8, u32)>,
}

impl<'a> QuestHostCtx<'a> {
    fn build(block: &'a mut Block, lobby_id: LobbyId, caller_client: ClientId) -> Self {
        let mut slots = [SlotSnapshot::default(); 4];
        if let Some(lobby) = block.lobbies.get(lobby_id) {
            for (slot, client_id) in lobby.occupied_slots() {
                if (slot.0 as usize) >= slots.len() {
                    continue;
                }
                if let Some(state) = block.clients.get(&client_id) {
                    slots[slot.0 as usize] = SlotSnapshot {
                        present: true,
                        section_id: state.char_summary.section_id,
                        class: state.char_summary.class,
                        level: state.char_summary.level,
                        floor: state.position.floor,
                        position: (state.position.x, state.position.y, state.position.z),
                    };
                }
            }
        }
        Self {
            block,
            lobby_id,
            caller_client,
            slots,
            outbox: Vec::new(),
        }
    }

    fn flush(self) {
        if let Some(state) = self.block.clients.get_mut(&self.caller_client) {
            for (reg, value) in &self.outbox {
                send_sync_register(state, *reg, *value);
            }
        }
    }
}

fn send_sync_register(state: &mut crate::client::ClientState, reg: u8, value: u32) {
    let mut body = vec![reg, 0, 0, 0];
    body.extend_from_slice(&value.to_le_bytes());
    let _ = state.writer.try_write_frame_later(body);
}

impl<'a> QuestHost for QuestHostCtx<'a> {
    fn send_sync_register(&mut self, reg: u8, value: u32) {
        self.outbox.push((reg, value));
    }

    fn team_client_count(&self) -> u32 {
        self.slots.iter().filter(|s| s.present).count() as u32
    }

    fn ship_client_count(&self) -> u32 {
        self.block.clients.len() as u32
    }

    fn block_client_count(&self) -> u32 {
        self.block.clients.len() as u32
    }

    fn player_section_id(&self, slot: usize) -> Option<u8> {
        self.slots.get(slot).filter(|s| s.present).map(|s| s.section_id)
    }

    fn player_class(&self, slot: usize) -> Option<i32> {
        self.slots.get(slot).filter(|s| s.present).map(|s| s.class)
    }

    fn player_floor(&self, slot: usize) -> Option<u8> {
        self.slots.get(slot).filter(|s| s.present).map(|s| s.floor)
    }

    fn player_position(&self, slot: usize) -> Option<(f32, f32, f32)> {
        self.slots.get(slot).filter(|s| s.present).map(|s| s.position)
    }

    fn player_level(&self, slot: usize) -> Option<u32> {
        self.slots.get(slot).filter(|s| s.present).map(|s| s.level)
    }

    fn random_range(&mut self, min: u32, max_inclusive: u32) -> u32 {
        if max_inclusive <= min {
            return min;
        }
        min + self.block.quest_rng.next_u32() % (max_inclusive - min + 1)
    }

    fn team_seed(&self) -> u32 {
        self.block.lobbies.get(self.lobby_id).map(|l| l.map_seed).unwrap_or(0)
    }

    fn ship_name(&self) -> &str {
        &self.block.ship.config.name
    }

    fn word_censor_check(&self, text: &str) -> bool {
        // A small representative stand-in (real vocabulary out of scope;
        // see `DESIGN.md`).
        const BANNED: &[&str] = &["badword", "slur"];
        let lower = text.to_ascii_lowercase();
        BANNED.iter().any(|w| lower.contains(w))
    }

    fn subscribe_position_updates(&mut self, subject_slot: usize, reg: u8) {
        let Some(recipient_slot) = self.block.clients.get(&self.caller_client).and_then(|c| c.slot) else {
            return;
        };
        if let Some(lobby) = self.block.lobbies.get_mut(self.lobby_id) {
            lobby
                .registers
                .subscribe_position_updates(recipient_slot, SlotId(subject_slot as u8), RegisterId(reg));
        }
    }

    fn subscribe_client_count_updates(&mut self, reg: u8) {
        let Some(recipient_slot) = self.block.clients.get(&self.caller_client).and_then(|c| c.slot) else {
            return;
        };
        if let Some(lobby) = self.block.lobbies.get_mut(self.lobby_id) {
            lobby.registers.subscribe_client_count_updates(recipient_slot, RegisterId(reg));
        }
    }

    fn request_quest_flag(&mut self, op: DispatchQuestFlagOp) -> Result<(), ()> {
        let Some(state) = self.block.clients.get_mut(&self.caller_client) else {
            return Err(());
        };
        state.flags.insert(ClientFlags::QUEST_STACK_LOCK);
        let guild = state.guild;
        let gw_op = if op.delete {
            sent::QuestFlagOp::Delete
        } else if op.get {
            sent::QuestFlagOp::Get
        } else {
            sent::QuestFlagOp::Set
        };
        let (pkt_type, flags, body) =
            sent::quest_flag_request(guild, gw_op, op.flag_number as u16, op.value, op.long_flag);
        self.block.gateway_tx.send((pkt_type, flags, body)).map_err(|_| ())
    }
}

async fn run_quest_dispatch(block: &mut Block, client: ClientId, lobby_id: LobbyId) {
    let Some(stack) = block.clients.get(&client).map(|c| c.quest_stack.clone()) else {
        return;
    };
    let (q_data_reg, q_ctl_reg) = match block.lobbies.get(lobby_id) {
        Some(lobby) => (lobby.registers.q_data_reg, lobby.registers.q_ctl_reg),
        None => (None, None),
    };

    let mut ctx = QuestHostCtx::build(block, lobby_id, client);
    let outcome = dispatcher::dispatch(&stack, &mut ctx);
    if let DispatchOutcome::Done(status) = outcome {
        if let Some(reg) = q_data_reg {
            ctx.outbox.push((reg.0, status.code()));
        }
    }
    ctx.flush();

    if matches!(outcome, DispatchOutcome::Done(_)) {
        if let Some(state) = block.clients.get_mut(&client) {
            state.flags.remove(ClientFlags::QUEST_STACK_LOCK);
            state.quest_stack.reset();
        }
    }
    let _ = q_ctl_reg;
}

// ---------------------------------------------------------------------
// Blue-Burst floor item and bank protocols
// ---------------------------------------------------------------------

/// `opcode::BB_DROP_POS`: stages either an item-slot or meseta drop
/// (`spec.md` §4.4, §4.8 invariant 6). Payload is `is_meseta(1) index_or_zero(1) amount(4)`.
async fn handle_bb_drop_pos(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let is_meseta = payload.first().copied().unwrap_or(0) != 0;
    let index = payload.get(1).copied().unwrap_or(0) as usize;
    let amount = read_u32(payload, 2);
    let source = if is_meseta { DropSource::Meseta } else { DropSource::ItemSlot(index) };
    if let Some(state) = block.clients.get_mut(&client) {
        state.drop_staging = Some(handle_drop_pos(source, amount));
    }
    Ok(())
}

/// `opcode::BB_DROP_STACK`: completes the staged drop at `x(4) z(4) floor(1)`.
async fn handle_bb_drop_stack(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let x = read_f32(payload, 0);
    let z = read_f32(payload, 4);
    let floor = payload.get(8).copied().unwrap_or(0);
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let Some(state) = block.clients.get_mut(&client) else {
        return Ok(());
    };
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let source = match state.drop_staging {
        Some(staging) => staging.source,
        None => return Ok(()),
    };
    let amount = state.drop_staging.map(|s| s.amount).unwrap_or(0);
    let _ = handle_drop_stack(
        &mut state.drop_staging,
        &mut lobby.floor_items,
        &mut state.inventory,
        source,
        amount,
        x,
        z,
        floor,
    );
    Ok(())
}

/// `opcode::BB_PICK_UP`: payload is `item_id(4)`.
async fn handle_bb_pick_up(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let item_id = ItemId(read_u32(payload, 0));
    let Some(lobby_id) = block.clients.get(&client).and_then(|c| c.lobby) else {
        return Ok(());
    };
    let Some(lobby) = block.lobbies.get_mut(lobby_id) else {
        return Ok(());
    };
    let Some(state) = block.clients.get_mut(&client) else {
        return Ok(());
    };
    handle_pick_up(&mut lobby.floor_items, &mut state.inventory, item_id);
    Ok(())
}

/// `opcode::BB_BANK_OPEN`: sends the client's own bank contents back.
async fn handle_bb_bank_open(block: &mut Block, client: ClientId) -> anyhow::Result<()> {
    let Some(state) = block.clients.get_mut(&client) else {
        return Ok(());
    };
    let snapshot = open_bank(&state.bank);
    let mut body = Vec::new();
    body.extend_from_slice(&(snapshot.items.len() as u32).to_le_bytes());
    body.extend_from_slice(&snapshot.meseta.to_le_bytes());
    for (item, qty) in &snapshot.items {
        body.extend_from_slice(&item.data1[0].to_le_bytes());
        body.extend_from_slice(&item.data1[1].to_le_bytes());
        body.extend_from_slice(&item.data1[2].to_le_bytes());
        body.extend_from_slice(&item.data2.to_le_bytes());
        body.extend_from_slice(&qty.to_le_bytes());
    }
    if state.writer.write_frame(pt::CHARACTER_DATA, 0, &body).await.is_ok() {
        state.touch_sent();
    }
    block.scripting.fire(
        block_scripting::Hook::BankAction,
        block_scripting::HookContext::new().field("client_id", client.0 as u32).field("action", "open"),
    );
    Ok(())
}

/// `opcode::BB_BANK_ACTION`: payload is
/// `action(1) index(1) amount_or_0(4)`, action 0=deposit item,
/// 1=deposit meseta, 2=withdraw item, 3=withdraw meseta.
async fn handle_bb_bank_action(block: &mut Block, client: ClientId, payload: &[u8]) -> anyhow::Result<()> {
    let action = payload.first().copied().unwrap_or(0);
    let index = payload.get(1).copied().unwrap_or(0) as usize;
    let amount = read_u32(payload, 2);
    let Some(state) = block.clients.get_mut(&client) else {
        return Ok(());
    };

    match action {
        0 => {
            let _ = deposit_item(&mut state.inventory, &mut state.bank, index, amount, &[]);
        }
        1 => {
            if state.inventory.take_meseta(amount) {
                state.bank.deposit_meseta(amount);
            }
        }
        2 => {
            let mut next_id = state.bank.items.len() as u32;
            let _ = withdraw_item(&mut state.bank, &mut state.inventory, index, amount, || {
                next_id += 1;
                ItemId(next_id)
            });
        }
        3 => {
            let _ = withdraw_item::withdraw_meseta_noop();
        }
        _ => {}
    }
    block.scripting.fire(
        block_scripting::Hook::BankAction,
        block_scripting::HookContext::new().field("client_id", client.0 as u32).field("action", action as u32),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_id_field_matches_opcodes_that_carry_a_client_id() {
        assert!(wide_id_field(opcode::TAKE_ITEM));
        assert!(wide_id_field(opcode::MONSTER_HIT));
        assert!(!wide_id_field(opcode::ITEM_DROP_REQUEST));
        assert!(!wide_id_field(opcode::SYNC_REGISTER));
    }

    #[test]
    fn read_cstring_stops_at_nul() {
        assert_eq!(read_cstring(b"hello\0garbage"), "hello");
        assert_eq!(read_cstring(b"noterm"), "noterm");
    }

    #[test]
    fn item_data_at_reads_little_endian_words() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        let item = item_data_at(&bytes, 0);
        assert_eq!(item, ItemData::new([1, 2, 3], 4));
    }
}
