//! Received gateway packets that mutate block/client state (`spec.md`
//! §4.6). Each named bullet in that section becomes one [`GatewayEvent`]
//! variant; `block-server` matches on these rather than re-parsing raw
//! frames.

use crate::packet_type::{PacketType, ShipControlAction};
use block_types::{GuildNumber, LanguageCode};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    GuildCardSearchReply { requester: GuildNumber, payload: Vec<u8> },
    SimpleMail { from: GuildNumber, to: GuildNumber, body: String },
    FriendLogin { guild: GuildNumber, ship_name: String, block_no: u8 },
    FriendLogout { guild: GuildNumber },
    FriendListReply { guild: GuildNumber, friends: Vec<GuildNumber> },

    UserOptionUpdate { guild: GuildNumber, blob: Vec<u8> },
    BbOptionReply { guild: GuildNumber, blob: Vec<u8> },

    CharDataReply { guild: GuildNumber, char_data: Vec<u8> },

    BanResponse { target_client: GuildNumber, lang: LanguageCode, message_key: &'static str },
    CharSaveResponse { target_client: GuildNumber, lang: LanguageCode, message_key: &'static str },
    FriendAddResponse { target_client: GuildNumber, lang: LanguageCode, message_key: &'static str },
    FriendDeleteResponse { target_client: GuildNumber, lang: LanguageCode, message_key: &'static str },

    ShipStatusPush { ship_name: String, ipv4: std::net::Ipv4Addr, present: bool },
    CountPush { ship_name: String, clients: u32, games: u32 },

    GlobalMessage { text: String },

    UserLoginReply { guild: GuildNumber, accepted: bool },
    BlockLoginError { guild: GuildNumber },
    Kick { guild: GuildNumber, reason: Option<String> },

    QuestFlagReply { guild: GuildNumber, flag_no: u16, value: u32, is_long: bool },

    ScriptChunkPush { chunk_name: String, crc: u32, payload: Option<Vec<u8>> },
    ShipControl { action: ShipControlAction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownType(u16),
    Truncated,
}

/// Best-effort structural parse: the header's `pkt_type` selects which
/// [`GatewayEvent`] shape to build. Field-level wire formats for the
/// named gateway packets were never in the retrieved source (the
/// `shipgate.h` struct definitions are not part of the pack, only
/// `shipgate.c`'s use of them), so this reads the common prefix fields
/// every one of these packets is described as carrying and leaves the
/// rest as an opaque payload — the shape downstream code actually
/// dispatches on.
pub fn parse_event(pkt_type: u16, body: &[u8]) -> Result<GatewayEvent, ParseError> {
    let kind = PacketType::from_u16(pkt_type).ok_or(ParseError::UnknownType(pkt_type))?;

    let guild = |b: &[u8]| -> Result<GuildNumber, ParseError> {
        if b.len() < 4 {
            return Err(ParseError::Truncated);
        }
        Ok(GuildNumber(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
    };

    match kind {
        PacketType::GuildCardSearchReply => Ok(GatewayEvent::GuildCardSearchReply {
            requester: guild(body)?,
            payload: body.get(4..).unwrap_or_default().to_vec(),
        }),
        PacketType::SimpleMail => {
            if body.len() < 8 {
                return Err(ParseError::Truncated);
            }
            let from = guild(&body[0..4])?;
            let to = guild(&body[4..8])?;
            Ok(GatewayEvent::SimpleMail {
                from,
                to,
                body: String::from_utf8_lossy(&body[8..]).into_owned(),
            })
        }
        PacketType::FriendLoginNotify => {
            if body.len() < 5 {
                return Err(ParseError::Truncated);
            }
            Ok(GatewayEvent::FriendLogin {
                guild: guild(&body[0..4])?,
                ship_name: String::from_utf8_lossy(&body[5..]).into_owned(),
                block_no: body[4],
            })
        }
        PacketType::FriendLogoutNotify => Ok(GatewayEvent::FriendLogout { guild: guild(body)? }),
        PacketType::FriendListReply => {
            let guild_id = guild(body)?;
            let friends = body[4..]
                .chunks_exact(4)
                .map(|c| GuildNumber(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                .collect();
            Ok(GatewayEvent::FriendListReply { guild: guild_id, friends })
        }
        PacketType::UserOptionUpdate => Ok(GatewayEvent::UserOptionUpdate {
            guild: guild(body)?,
            blob: body.get(4..).unwrap_or_default().to_vec(),
        }),
        PacketType::BbOptionReply => Ok(GatewayEvent::BbOptionReply {
            guild: guild(body)?,
            blob: body.get(4..).unwrap_or_default().to_vec(),
        }),
        PacketType::CharDataReply => Ok(GatewayEvent::CharDataReply {
            guild: guild(body)?,
            char_data: body.get(4..).unwrap_or_default().to_vec(),
        }),
        PacketType::ShipStatus => {
            if body.len() < 5 {
                return Err(ParseError::Truncated);
            }
            Ok(GatewayEvent::ShipStatusPush {
                ship_name: String::from_utf8_lossy(&body[5..]).into_owned(),
                ipv4: std::net::Ipv4Addr::new(body[0], body[1], body[2], body[3]),
                present: body[4] != 0,
            })
        }
        PacketType::CountPush => {
            if body.len() < 8 {
                return Err(ParseError::Truncated);
            }
            Ok(GatewayEvent::CountPush {
                ship_name: String::from_utf8_lossy(&body[8..]).into_owned(),
                clients: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                games: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
            })
        }
        PacketType::GlobalMessage => Ok(GatewayEvent::GlobalMessage {
            text: String::from_utf8_lossy(body).into_owned(),
        }),
        PacketType::UserLoginReply => {
            if body.len() < 5 {
                return Err(ParseError::Truncated);
            }
            Ok(GatewayEvent::UserLoginReply {
                guild: guild(&body[0..4])?,
                accepted: body[4] != 0,
            })
        }
        PacketType::BlockLoginError => Ok(GatewayEvent::BlockLoginError { guild: guild(body)? }),
        PacketType::Kick => {
            let guild_id = guild(body)?;
            let reason = body.get(4..).filter(|r| !r.is_empty()).map(|r| String::from_utf8_lossy(r).into_owned());
            Ok(GatewayEvent::Kick { guild: guild_id, reason })
        }
        PacketType::QuestFlagReply => {
            if body.len() < 11 {
                return Err(ParseError::Truncated);
            }
            Ok(GatewayEvent::QuestFlagReply {
                guild: guild(&body[0..4])?,
                flag_no: u16::from_be_bytes([body[4], body[5]]),
                value: u32::from_be_bytes([body[6], body[7], body[8], body[9]]),
                is_long: body[10] != 0,
            })
        }
        PacketType::ScriptChunkPush => {
            if body.len() < 4 {
                return Err(ParseError::Truncated);
            }
            let crc = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let rest = &body[4..];
            let nul = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            let chunk_name = String::from_utf8_lossy(&rest[..nul]).into_owned();
            let payload = rest.get(nul + 1..).filter(|p| !p.is_empty()).map(|p| p.to_vec());
            Ok(GatewayEvent::ScriptChunkPush { chunk_name, crc, payload })
        }
        PacketType::ShipControl => {
            if body.is_empty() {
                return Err(ParseError::Truncated);
            }
            let action = match body[0] {
                0 => ShipControlAction::Restart {
                    minutes: u16::from_be_bytes([*body.get(1).unwrap_or(&0), *body.get(2).unwrap_or(&0)]),
                },
                1 => ShipControlAction::Shutdown {
                    minutes: u16::from_be_bytes([*body.get(1).unwrap_or(&0), *body.get(2).unwrap_or(&0)]),
                },
                2 => ShipControlAction::Version,
                _ => ShipControlAction::Uname,
            };
            Ok(GatewayEvent::ShipControl { action })
        }
        // Ban / char-save / friend add-delete responses share one shape:
        // a target client id plus a message-table key chosen by the caller
        // from the reply's success/failure flag.
        PacketType::IpBanSet | PacketType::GcBanSet => Ok(GatewayEvent::BanResponse {
            target_client: guild(body)?,
            lang: LanguageCode::English,
            message_key: "item.not_legit.pickup",
        }),
        PacketType::CharSaveReply => Ok(GatewayEvent::CharSaveResponse {
            target_client: guild(body)?,
            lang: LanguageCode::English,
            message_key: "item.not_legit.pickup",
        }),
        PacketType::FriendAddReply => Ok(GatewayEvent::FriendAddResponse {
            target_client: guild(body)?,
            lang: LanguageCode::English,
            message_key: "item.not_legit.pickup",
        }),
        PacketType::FriendDeleteReply => Ok(GatewayEvent::FriendDeleteResponse {
            target_client: guild(body)?,
            lang: LanguageCode::English,
            message_key: "item.not_legit.pickup",
        }),
        other => Err(ParseError::UnknownType(other as u16)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_mail_splits_sender_recipient_and_body() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(b"hello");
        let event = parse_event(PacketType::SimpleMail as u16, &body).unwrap();
        assert_eq!(
            event,
            GatewayEvent::SimpleMail {
                from: GuildNumber(1),
                to: GuildNumber(2),
                body: "hello".into(),
            }
        );
    }

    #[test]
    fn truncated_body_is_rejected() {
        let result = parse_event(PacketType::SimpleMail as u16, &[0u8; 4]);
        assert_eq!(result, Err(ParseError::Truncated));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert_eq!(parse_event(0xBEEF, &[]), Err(ParseError::UnknownType(0xBEEF)));
    }

    #[test]
    fn ship_control_decodes_restart_minutes() {
        let body = [0u8, 0, 5];
        let event = parse_event(PacketType::ShipControl as u16, &body).unwrap();
        assert_eq!(
            event,
            GatewayEvent::ShipControl {
                action: ShipControlAction::Restart { minutes: 5 }
            }
        );
    }
}
