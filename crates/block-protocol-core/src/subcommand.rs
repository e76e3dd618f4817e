use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubHeaderError {
    #[error("subcommand body shorter than its header")]
    Truncated,
    #[error("declared size {declared} words does not match outer body length {outer} bytes")]
    SizeMismatch { declared: usize, outer: usize },
}

/// The client-id/two-byte field that follows `opcode`/`size_words`, whose
/// interpretation is opcode-dependent (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIdField {
    ClientId(u16),
    TwoBytes(u8, u8),
}

/// The nested header every subcommand body carries, ahead of its own payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubHeader {
    pub opcode: u8,
    pub size_words: u8,
    pub id_field: SubIdField,
}

impl SubHeader {
    /// Size in bytes of this subcommand's body, including this header.
    pub fn declared_len(self) -> usize {
        self.size_words as usize * 4
    }

    /// Parse the four-byte nested header from the front of a subcommand body.
    /// `wide_id` selects whether bytes 2..4 are one little-endian client id
    /// or two independent one-byte fields, per opcode.
    pub fn parse(data: &[u8], wide_id: bool) -> Result<Self, SubHeaderError> {
        if data.len() < 4 {
            return Err(SubHeaderError::Truncated);
        }
        let opcode = data[0];
        let size_words = data[1];
        let id_field = if wide_id {
            SubIdField::ClientId(u16::from_le_bytes([data[2], data[3]]))
        } else {
            SubIdField::TwoBytes(data[2], data[3])
        };
        Ok(Self {
            opcode,
            size_words,
            id_field,
        })
    }

    pub fn write(self, out: &mut Vec<u8>) {
        out.push(self.opcode);
        out.push(self.size_words);
        match self.id_field {
            SubIdField::ClientId(id) => out.extend_from_slice(&id.to_le_bytes()),
            SubIdField::TwoBytes(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }
}

/// Validate that a subcommand's declared word-size matches the space left in
/// the outer envelope's body. A mismatch is a protocol violation; `spec.md`
/// §4.4 requires disconnecting the sender.
pub fn validate_against_outer(header: SubHeader, outer_body_len: usize) -> Result<(), SubHeaderError> {
    let declared = header.declared_len();
    if declared != outer_body_len {
        return Err(SubHeaderError::SizeMismatch {
            declared,
            outer: outer_body_len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wide_client_id() {
        let data = [0x60, 0x05, 0x02, 0x00];
        let header = SubHeader::parse(&data, true).unwrap();
        assert_eq!(header.opcode, 0x60);
        assert_eq!(header.size_words, 5);
        assert_eq!(header.id_field, SubIdField::ClientId(2));
        assert_eq!(header.declared_len(), 20);
    }

    #[test]
    fn parses_narrow_fields() {
        let data = [0x05, 0x02, 0x01, 0x03];
        let header = SubHeader::parse(&data, false).unwrap();
        assert_eq!(header.id_field, SubIdField::TwoBytes(1, 3));
    }

    #[test]
    fn rejects_mismatched_size() {
        let header = SubHeader {
            opcode: 0x60,
            size_words: 3,
            id_field: SubIdField::ClientId(0),
        };
        assert!(validate_against_outer(header, 12).is_ok());
        assert_eq!(
            validate_against_outer(header, 8),
            Err(SubHeaderError::SizeMismatch {
                declared: 12,
                outer: 8
            })
        );
    }

    #[test]
    fn rejects_truncated_body() {
        assert_eq!(
            SubHeader::parse(&[0x60, 0x01], true),
            Err(SubHeaderError::Truncated)
        );
    }
}
