use block_types::ClientVariant;

/// A decoded packet header, independent of which of the two wire families it
/// came from. `body_len` excludes the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub pkt_type: u16,
    pub flags: u16,
    pub body_len: usize,
}

/// Short envelope: one byte type, one byte flags, little-endian u16 length.
/// Used by every variant except Blue Burst.
fn read_short(buf: &[u8]) -> Header {
    let pkt_type = buf[0] as u16;
    let flags = buf[1] as u16;
    let total_len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    Header {
        pkt_type,
        flags,
        body_len: total_len.saturating_sub(4),
    }
}

fn write_short(header: Header, out: &mut Vec<u8>) {
    out.push(header.pkt_type as u8);
    out.push(header.flags as u8);
    let total_len = (header.body_len + 4) as u16;
    out.extend_from_slice(&total_len.to_le_bytes());
}

/// Long envelope (Blue Burst): little-endian u32 length, little-endian u16
/// type, little-endian u16 flags.
fn read_long(buf: &[u8]) -> Header {
    let total_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let pkt_type = u16::from_le_bytes([buf[4], buf[5]]);
    let flags = u16::from_le_bytes([buf[6], buf[7]]);
    Header {
        pkt_type,
        flags,
        body_len: total_len.saturating_sub(8),
    }
}

fn write_long(header: Header, out: &mut Vec<u8>) {
    let total_len = (header.body_len + 8) as u32;
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&header.pkt_type.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
}

/// Read a header out of `buf`, which must hold at least `variant.header_size()`
/// bytes of already-decrypted data.
pub fn read_header(variant: ClientVariant, buf: &[u8]) -> Header {
    if variant.is_blue_burst() {
        read_long(buf)
    } else {
        read_short(buf)
    }
}

/// Serialize `header` in the wire form `variant` expects.
pub fn write_header(variant: ClientVariant, header: Header, out: &mut Vec<u8>) {
    if variant.is_blue_burst() {
        write_long(header, out);
    } else {
        write_short(header, out);
    }
}

/// Round a frame length (header + body) up to the variant's cipher block
/// unit, per `spec.md` §4.2 ("payloads are always padded to the cipher block
/// size with zero bytes").
pub fn padded_frame_len(variant: ClientVariant, raw_len: usize) -> usize {
    let unit = variant.cipher_block_unit();
    raw_len.div_ceil(unit) * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_header_round_trips() {
        let header = Header {
            pkt_type: 0x60,
            flags: 0x00,
            body_len: 12,
        };
        let mut out = Vec::new();
        write_header(ClientVariant::V2Pc, header, &mut out);
        assert_eq!(out.len(), 4);
        let parsed = read_header(ClientVariant::V2Pc, &out);
        assert_eq!(parsed, header);
    }

    #[test]
    fn long_header_round_trips() {
        let header = Header {
            pkt_type: 0x62,
            flags: 0x03,
            body_len: 200,
        };
        let mut out = Vec::new();
        write_header(ClientVariant::V4Bb, header, &mut out);
        assert_eq!(out.len(), 8);
        let parsed = read_header(ClientVariant::V4Bb, &out);
        assert_eq!(parsed, header);
    }

    #[test]
    fn padding_rounds_up_to_block_unit() {
        assert_eq!(padded_frame_len(ClientVariant::V2Pc, 10), 16);
        assert_eq!(padded_frame_len(ClientVariant::V2Pc, 8), 8);
        assert_eq!(padded_frame_len(ClientVariant::V4Bb, 10), 12);
    }
}
