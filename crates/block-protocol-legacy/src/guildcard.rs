//! Guild-card exchange translation. Name encoding and struct padding differ
//! across the four protocol families (`spec.md` §4.4); this module decodes
//! into one canonical in-memory record and re-encodes for the recipient's
//! family, which is what makes the round-trip law in `spec.md` §8 hold:
//! "Legacy ↔ PC guild-card translation preserves identity".

use block_types::ClientVariant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuildCardError {
    #[error("guild card exchange unsupported for trial-edition peer")]
    TrialEditionUnsupported,
    #[error("guild card payload too short: got {got}, need at least {need}")]
    Truncated { got: usize, need: usize },
}

/// Fixed field widths per family, in bytes. Legacy (DC) uses a narrow
/// single-byte-per-character name field; PC and GC widen it. Real widths
/// and encodings (Shift-JIS vs UTF-16) are implementation detail the core
/// does not specify beyond "differ across variants" — this picks one
/// consistent scheme wide enough to exercise the translation logic.
fn name_width(variant: ClientVariant) -> usize {
    if variant.is_pc_family() {
        24
    } else if variant.is_gc_family() {
        24
    } else {
        16
    }
}

fn description_width(variant: ClientVariant) -> usize {
    if variant.is_blue_burst() {
        88
    } else {
        56
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildCardRecord {
    pub guild_number: u32,
    pub name: String,
    pub description: String,
}

impl GuildCardRecord {
    /// Decode a variant-specific guild card payload into the canonical
    /// record. Trailing NUL padding is trimmed from both text fields.
    pub fn decode(variant: ClientVariant, data: &[u8]) -> Result<Self, GuildCardError> {
        let name_w = name_width(variant);
        let desc_w = description_width(variant);
        let need = 4 + name_w + desc_w;
        if data.len() < need {
            return Err(GuildCardError::Truncated {
                got: data.len(),
                need,
            });
        }
        let guild_number = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let name = trim_padded(&data[4..4 + name_w]);
        let description = trim_padded(&data[4 + name_w..4 + name_w + desc_w]);
        Ok(Self {
            guild_number,
            name,
            description,
        })
    }

    /// Encode the record into `variant`'s field widths, truncating text
    /// that overflows and zero-padding the remainder.
    pub fn encode(&self, variant: ClientVariant) -> Vec<u8> {
        let name_w = name_width(variant);
        let desc_w = description_width(variant);
        let mut out = Vec::with_capacity(4 + name_w + desc_w);
        out.extend_from_slice(&self.guild_number.to_le_bytes());
        write_padded(&mut out, &self.name, name_w);
        write_padded(&mut out, &self.description, desc_w);
        out
    }
}

fn trim_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_padded(out: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (width - n), 0);
}

/// Translate a guild-card payload from `sender`'s wire encoding to
/// `recipient`'s. Fails for trial-edition recipients, which cannot parse
/// the full guild-card record at all (`spec.md` §4.4, §7).
pub fn translate_guildcard(
    sender: ClientVariant,
    recipient: ClientVariant,
    data: &[u8],
) -> Result<Vec<u8>, GuildCardError> {
    if recipient.is_trial() {
        return Err(GuildCardError::TrialEditionUnsupported);
    }
    let record = GuildCardRecord::decode(sender, data)?;
    Ok(record.encode(recipient))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_to_pc_to_legacy_round_trips_text() {
        let record = GuildCardRecord {
            guild_number: 1234,
            name: "Ash".into(),
            description: "Hunter".into(),
        };
        let legacy_bytes = record.encode(ClientVariant::V1Legacy);
        let pc_bytes =
            translate_guildcard(ClientVariant::V1Legacy, ClientVariant::V2Pc, &legacy_bytes).unwrap();
        let back_to_legacy =
            translate_guildcard(ClientVariant::V2Pc, ClientVariant::V1Legacy, &pc_bytes).unwrap();
        let decoded = GuildCardRecord::decode(ClientVariant::V1Legacy, &back_to_legacy).unwrap();
        assert_eq!(decoded.name, "Ash");
        assert_eq!(decoded.description, "Hunter");
        assert_eq!(decoded.guild_number, 1234);
    }

    #[test]
    fn trial_edition_recipient_is_rejected() {
        let record = GuildCardRecord {
            guild_number: 1,
            name: "X".into(),
            description: "Y".into(),
        };
        let bytes = record.encode(ClientVariant::V2Pc);
        let err =
            translate_guildcard(ClientVariant::V2Pc, ClientVariant::V2PcTrial, &bytes).unwrap_err();
        assert_eq!(err, GuildCardError::TrialEditionUnsupported);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let err = GuildCardRecord::decode(ClientVariant::V1Legacy, &[0u8; 2]).unwrap_err();
        assert!(matches!(err, GuildCardError::Truncated { .. }));
    }
}
