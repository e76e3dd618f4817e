//! Builders for the packets this ship sends to the gateway (`spec.md`
//! §4.6): "character save/backup/request, client count, a forwarded
//! legacy-variant packet (three variants), user-login, IP/GC ban set,
//! friend add/delete, block login/logout, lobby change, ping, full
//! block-clients burst, kick, friend-list request, global-message
//! fan-in, user option update, Blue-Burst options request and write,
//! kill-counters sync, script-data event, quest-flag get/set/delete."
//!
//! Each builder returns `(type, flags, body)` ready for
//! `GatewayConnection::write_frame`.

use crate::envelope::RESPONSE;
use crate::packet_type::PacketType;
use block_types::GuildNumber;

type Frame = (u16, u16, Vec<u8>);

fn tagged(kind: PacketType, flags: u16, body: Vec<u8>) -> Frame {
    (kind as u16, flags, body)
}

pub fn ping() -> Frame {
    tagged(PacketType::Ping, 0, Vec::new())
}

pub fn ping_reply() -> Frame {
    tagged(PacketType::Ping, RESPONSE, Vec::new())
}

pub fn char_save_request(guild: GuildNumber, char_data: &[u8]) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(char_data);
    tagged(PacketType::CharSaveRequest, 0, body)
}

pub fn char_backup_request(guild: GuildNumber, slot: u8) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.push(slot);
    tagged(PacketType::CharBackupRequest, 0, body)
}

pub fn char_data_request(guild: GuildNumber, slot: u8) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.push(slot);
    tagged(PacketType::CharDataRequest, 0, body)
}

pub fn client_count(count: u32) -> Frame {
    tagged(PacketType::ClientCount, 0, count.to_be_bytes().to_vec())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardedVariant {
    Dc,
    Pc,
    Bb,
}

/// Forward a variant-specific client packet opaquely across the gateway
/// (e.g. cross-ship guild-card search) — payload bytes untouched.
pub fn forward_client_packet(variant: ForwardedVariant, payload: &[u8]) -> Frame {
    let kind = match variant {
        ForwardedVariant::Dc => PacketType::ForwardDc,
        ForwardedVariant::Pc => PacketType::ForwardPc,
        ForwardedVariant::Bb => PacketType::ForwardBb,
    };
    tagged(kind, 0, payload.to_vec())
}

pub fn user_login(guild: GuildNumber, block_no: u8) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.push(block_no);
    tagged(PacketType::UserLogin, 0, body)
}

pub fn ip_ban_set(ip: std::net::Ipv4Addr, minutes: i32, reason: &str) -> Frame {
    let mut body = ip.octets().to_vec();
    body.extend_from_slice(&minutes.to_be_bytes());
    body.extend_from_slice(reason.as_bytes());
    tagged(PacketType::IpBanSet, 0, body)
}

pub fn gc_ban_set(guild: GuildNumber, minutes: i32, reason: &str) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(&minutes.to_be_bytes());
    body.extend_from_slice(reason.as_bytes());
    tagged(PacketType::GcBanSet, 0, body)
}

pub fn friend_add(owner: GuildNumber, friend: GuildNumber) -> Frame {
    let mut body = owner.0.to_be_bytes().to_vec();
    body.extend_from_slice(&friend.0.to_be_bytes());
    tagged(PacketType::FriendAdd, 0, body)
}

pub fn friend_delete(owner: GuildNumber, friend: GuildNumber) -> Frame {
    let mut body = owner.0.to_be_bytes().to_vec();
    body.extend_from_slice(&friend.0.to_be_bytes());
    tagged(PacketType::FriendDelete, 0, body)
}

pub fn friend_list_request(owner: GuildNumber) -> Frame {
    tagged(PacketType::FriendListRequest, 0, owner.0.to_be_bytes().to_vec())
}

pub fn block_login(guild: GuildNumber, block_no: u8) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.push(block_no);
    tagged(PacketType::BlockLogin, 0, body)
}

pub fn block_logout(guild: GuildNumber, block_no: u8) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.push(block_no);
    tagged(PacketType::BlockLogout, 0, body)
}

pub fn lobby_change(guild: GuildNumber, lobby_id: u32) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(&lobby_id.to_be_bytes());
    tagged(PacketType::LobbyChange, 0, body)
}

/// A full burst of currently-connected client records, sent once on
/// successful login and again any time the gateway asks for a resync.
pub fn client_burst(records: &[Vec<u8>]) -> Frame {
    let mut body = Vec::new();
    for record in records {
        body.extend_from_slice(&(record.len() as u16).to_be_bytes());
        body.extend_from_slice(record);
    }
    tagged(PacketType::ClientBurst, 0, body)
}

pub fn kick(guild: GuildNumber, reason: Option<&str>) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    if let Some(r) = reason {
        body.extend_from_slice(r.as_bytes());
    }
    tagged(PacketType::Kick, 0, body)
}

pub fn global_message_fan_in(text: &str) -> Frame {
    tagged(PacketType::GlobalMessage, 0, text.as_bytes().to_vec())
}

pub fn user_option_update(guild: GuildNumber, options: &[u8]) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(options);
    tagged(PacketType::UserOptionUpdate, 0, body)
}

pub fn bb_option_request(guild: GuildNumber) -> Frame {
    tagged(PacketType::BbOptionRequest, 0, guild.0.to_be_bytes().to_vec())
}

pub fn bb_option_write(guild: GuildNumber, blob: &[u8]) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(blob);
    tagged(PacketType::BbOptionWrite, 0, body)
}

pub fn kill_counters_sync(guild: GuildNumber, counters: &[u32]) -> Frame {
    let mut body = guild.0.to_be_bytes().to_vec();
    for c in counters {
        body.extend_from_slice(&c.to_be_bytes());
    }
    tagged(PacketType::KillCountersSync, 0, body)
}

pub fn script_data_event(event_name: &str, payload: &[u8]) -> Frame {
    let mut body = event_name.as_bytes().to_vec();
    body.push(0);
    body.extend_from_slice(payload);
    tagged(PacketType::ScriptDataEvent, 0, body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestFlagOp {
    Get,
    Set,
    Delete,
}

pub fn quest_flag_request(guild: GuildNumber, op: QuestFlagOp, flag_no: u16, value: u32, is_long: bool) -> Frame {
    let kind = match op {
        QuestFlagOp::Get => PacketType::QuestFlagGet,
        QuestFlagOp::Set => PacketType::QuestFlagSet,
        QuestFlagOp::Delete => PacketType::QuestFlagDelete,
    };
    let mut body = guild.0.to_be_bytes().to_vec();
    body.extend_from_slice(&flag_no.to_be_bytes());
    body.extend_from_slice(&value.to_be_bytes());
    body.push(is_long as u8);
    tagged(kind, 0, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_reply_sets_the_response_flag() {
        let (kind, flags, body) = ping_reply();
        assert_eq!(kind, PacketType::Ping as u16);
        assert_eq!(flags, RESPONSE);
        assert!(body.is_empty());
    }

    #[test]
    fn quest_flag_request_encodes_op_and_flag_number() {
        let (kind, _, body) = quest_flag_request(GuildNumber(7), QuestFlagOp::Set, 42, 1, false);
        assert_eq!(kind, PacketType::QuestFlagSet as u16);
        assert_eq!(&body[0..4], &7u32.to_be_bytes());
        assert_eq!(&body[4..6], &42u16.to_be_bytes());
    }

    #[test]
    fn client_burst_length_prefixes_each_record() {
        let (kind, _, body) = client_burst(&[vec![1, 2, 3], vec![4, 5]]);
        assert_eq!(kind, PacketType::ClientBurst as u16);
        assert_eq!(&body[0..2], &3u16.to_be_bytes());
        assert_eq!(&body[2..5], &[1, 2, 3]);
        assert_eq!(&body[5..7], &2u16.to_be_bytes());
        assert_eq!(&body[7..9], &[4, 5]);
    }
}
