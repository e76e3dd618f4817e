//! Routing layer over `block_protocol_legacy::guildcard` (`spec.md` §4.4):
//! the per-variant encode/decode/translate logic lives there; this module
//! turns a rejected translation into the localized notice the sender sees
//! ("unsupported combinations ... produce a localized error message back
//! to the sender and drop the translation").

use block_data::messages::MessageTable;
use block_protocol_legacy::guildcard::{translate_guildcard, GuildCardError};
use block_types::{ClientVariant, LanguageCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildCardRoutingOutcome {
    /// Forward the translated payload to the recipient.
    Forward(Vec<u8>),
    /// Drop the translation; send this localized text back to the sender.
    NotifySender(String),
}

/// Translate `data` from `sender` to `recipient`'s wire encoding, routing
/// any failure into a localized message for `sender_lang` instead of
/// propagating the error.
pub fn route_guildcard_exchange(
    messages: &MessageTable,
    sender_lang: LanguageCode,
    sender: ClientVariant,
    recipient: ClientVariant,
    data: &[u8],
) -> GuildCardRoutingOutcome {
    match translate_guildcard(sender, recipient, data) {
        Ok(translated) => GuildCardRoutingOutcome::Forward(translated),
        Err(GuildCardError::TrialEditionUnsupported) => {
            GuildCardRoutingOutcome::NotifySender(messages.get(sender_lang, "guildcard.exchange.unsupported"))
        }
        Err(GuildCardError::Truncated { .. }) => {
            GuildCardRoutingOutcome::NotifySender(messages.get(sender_lang, "guildcard.exchange.unsupported"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_protocol_legacy::guildcard::GuildCardRecord;

    #[test]
    fn supported_pair_forwards_translated_payload() {
        let messages = MessageTable::new();
        let record = GuildCardRecord {
            guild_number: 42,
            name: "Rico".into(),
            description: "Hunter".into(),
        };
        let bytes = record.encode(ClientVariant::V1Legacy);
        let outcome = route_guildcard_exchange(
            &messages,
            LanguageCode::English,
            ClientVariant::V1Legacy,
            ClientVariant::V2Pc,
            &bytes,
        );
        assert!(matches!(outcome, GuildCardRoutingOutcome::Forward(_)));
    }

    #[test]
    fn trial_edition_recipient_yields_localized_notice() {
        let messages = MessageTable::new();
        let record = GuildCardRecord {
            guild_number: 1,
            name: "X".into(),
            description: "Y".into(),
        };
        let bytes = record.encode(ClientVariant::V2Pc);
        let outcome = route_guildcard_exchange(
            &messages,
            LanguageCode::English,
            ClientVariant::V2Pc,
            ClientVariant::V2PcTrial,
            &bytes,
        );
        match outcome {
            GuildCardRoutingOutcome::NotifySender(text) => {
                assert!(text.contains("Cannot exchange"));
            }
            _ => panic!("expected a notify-sender outcome"),
        }
    }
}
