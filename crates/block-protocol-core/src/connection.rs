use crate::cipher::StreamCipher;
use crate::envelope::{self, Header};
use block_types::ClientVariant;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

/// A framed client connection: short or long envelope depending on
/// `variant`, decrypt/encrypt in place via a per-direction [`StreamCipher`].
///
/// The reassembly buffer holds raw bytes as they arrive off the socket. A
/// header is decrypted in place exactly once per frame and retained in the
/// buffer (`pending_header`) until the rest of the frame has arrived — the
/// cipher's keystream was already consumed decrypting it, so it must not be
/// decrypted twice.
pub struct Connection {
    stream: Option<TcpStream>,
    variant: ClientVariant,
    read_buf: BytesMut,
    pending_header: Option<Header>,
    encryptor: Option<Box<dyn StreamCipher>>,
    decryptor: Option<Box<dyn StreamCipher>>,
    send_scratch: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream, variant: ClientVariant) -> Self {
        Self {
            stream: Some(stream),
            variant,
            read_buf: BytesMut::with_capacity(4096),
            pending_header: None,
            encryptor: None,
            decryptor: None,
            send_scratch: Vec::with_capacity(65536),
        }
    }

    pub fn variant(&self) -> ClientVariant {
        self.variant
    }

    /// Install the per-direction ciphers negotiated by the welcome exchange.
    /// Must happen before any authenticated payload is sent or received.
    pub fn enable_encryption(
        &mut self,
        encryptor: Box<dyn StreamCipher>,
        decryptor: Box<dyn StreamCipher>,
    ) {
        self.encryptor = Some(encryptor);
        self.decryptor = Some(decryptor);
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream
            .as_ref()
            .map(|s| s.peer_addr())
            .unwrap_or(Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection has been split",
            )))
    }

    /// Read a single frame, blocking on socket reads as needed.
    pub async fn read_frame(&mut self) -> anyhow::Result<(Header, BytesMut)> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("connection has been split"))?;
        loop {
            if let Some(frame) = try_take_frame(
                self.variant,
                &mut self.read_buf,
                &mut self.pending_header,
                &mut self.decryptor,
            )? {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }

    /// Write a single frame: `pkt_type`/`flags` from the caller, `body`
    /// zero-padded up to the cipher block unit before encryption.
    pub async fn write_frame(&mut self, pkt_type: u16, flags: u16, body: &[u8]) -> anyhow::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("connection has been split"))?;
        build_frame(
            self.variant,
            pkt_type,
            flags,
            body,
            &mut self.encryptor,
            &mut self.send_scratch,
        );
        stream.write_all(&self.send_scratch).await?;
        Ok(())
    }

    /// Split into independently-ownable halves for concurrent read/write tasks.
    pub fn into_split(mut self) -> (ConnectionReader, ConnectionWriter) {
        let stream = self.stream.take().expect("cannot split an already-split connection");
        let (read_half, write_half) = stream.into_split();
        (
            ConnectionReader {
                stream: read_half,
                variant: self.variant,
                read_buf: self.read_buf,
                pending_header: self.pending_header,
                decryptor: self.decryptor,
            },
            ConnectionWriter {
                stream: write_half,
                variant: self.variant,
                encryptor: self.encryptor,
                send_scratch: self.send_scratch,
            },
        )
    }
}

pub struct ConnectionReader {
    stream: OwnedReadHalf,
    variant: ClientVariant,
    read_buf: BytesMut,
    pending_header: Option<Header>,
    decryptor: Option<Box<dyn StreamCipher>>,
}

impl ConnectionReader {
    pub async fn read_frame(&mut self) -> anyhow::Result<(Header, BytesMut)> {
        loop {
            if let Some(frame) = try_take_frame(
                self.variant,
                &mut self.read_buf,
                &mut self.pending_header,
                &mut self.decryptor,
            )? {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

pub struct ConnectionWriter {
    stream: OwnedWriteHalf,
    variant: ClientVariant,
    encryptor: Option<Box<dyn StreamCipher>>,
    send_scratch: Vec<u8>,
}

impl ConnectionWriter {
    pub async fn write_frame(&mut self, pkt_type: u16, flags: u16, body: &[u8]) -> anyhow::Result<()> {
        build_frame(
            self.variant,
            pkt_type,
            flags,
            body,
            &mut self.encryptor,
            &mut self.send_scratch,
        );
        self.stream.write_all(&self.send_scratch).await?;
        Ok(())
    }
}

/// Attempt to pull one complete frame out of `read_buf`. Returns `None` when
/// more socket bytes are needed.
fn try_take_frame(
    variant: ClientVariant,
    read_buf: &mut BytesMut,
    pending_header: &mut Option<Header>,
    decryptor: &mut Option<Box<dyn StreamCipher>>,
) -> anyhow::Result<Option<(Header, BytesMut)>> {
    let header_size = variant.header_size();

    if pending_header.is_none() {
        if read_buf.len() < header_size {
            return Ok(None);
        }
        if let Some(dec) = decryptor {
            dec.decrypt_in_place(&mut read_buf[..header_size]);
        }
        let header = envelope::read_header(variant, &read_buf[..header_size]);
        *pending_header = Some(header);
    }

    let header = pending_header.expect("checked above");
    let padded_total = envelope::padded_frame_len(variant, header_size + header.body_len);
    if read_buf.len() < padded_total {
        return Ok(None);
    }

    if let Some(dec) = decryptor {
        dec.decrypt_in_place(&mut read_buf[header_size..padded_total]);
    }

    let mut frame = read_buf.split_to(padded_total);
    frame.advance(header_size);
    frame.truncate(header.body_len);
    *pending_header = None;

    trace!(pkt_type = header.pkt_type, body_len = header.body_len, "read frame");
    Ok(Some((header, frame)))
}

fn build_frame(
    variant: ClientVariant,
    pkt_type: u16,
    flags: u16,
    body: &[u8],
    encryptor: &mut Option<Box<dyn StreamCipher>>,
    scratch: &mut Vec<u8>,
) {
    scratch.clear();
    let header_size = variant.header_size();
    let header = Header {
        pkt_type,
        flags,
        body_len: body.len(),
    };
    envelope::write_header(variant, header, scratch);
    scratch.extend_from_slice(body);

    let padded_total = envelope::padded_frame_len(variant, header_size + body.len());
    scratch.resize(padded_total, 0);

    if let Some(enc) = encryptor {
        enc.encrypt_in_place(scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::LegacyBlockCipher;

    #[test]
    fn build_then_take_frame_round_trips_without_cipher() {
        let variant = ClientVariant::V2Pc;
        let mut scratch = Vec::new();
        let mut no_cipher: Option<Box<dyn StreamCipher>> = None;
        build_frame(variant, 0x60, 0x00, b"hello", &mut no_cipher, &mut scratch);

        let mut read_buf = BytesMut::from(&scratch[..]);
        let mut pending = None;
        let mut no_decryptor: Option<Box<dyn StreamCipher>> = None;
        let (header, body) =
            try_take_frame(variant, &mut read_buf, &mut pending, &mut no_decryptor)
                .unwrap()
                .unwrap();
        assert_eq!(header.pkt_type, 0x60);
        assert_eq!(&body[..], b"hello");
        assert!(read_buf.is_empty());
    }

    #[test]
    fn build_then_take_frame_round_trips_with_cipher() {
        let variant = ClientVariant::V4Bb;
        let key = [3u8; 48];
        let mut scratch = Vec::new();
        let mut encryptor: Option<Box<dyn StreamCipher>> =
            Some(Box::new(crate::cipher::BlueBurstCipher::new(&key)));
        build_frame(variant, 0x62, 0x01, b"burst payload", &mut encryptor, &mut scratch);

        let mut read_buf = BytesMut::from(&scratch[..]);
        let mut pending = None;
        let mut decryptor: Option<Box<dyn StreamCipher>> =
            Some(Box::new(crate::cipher::BlueBurstCipher::new(&key)));
        let (header, body) =
            try_take_frame(variant, &mut read_buf, &mut pending, &mut decryptor)
                .unwrap()
                .unwrap();
        assert_eq!(header.pkt_type, 0x62);
        assert_eq!(&body[..], b"burst payload");
    }

    #[test]
    fn partial_frame_yields_none_and_preserves_decrypted_header() {
        let variant = ClientVariant::V2Pc;
        let key = [5u8, 6, 7, 8];
        let mut scratch = Vec::new();
        let mut encryptor: Option<Box<dyn StreamCipher>> =
            Some(Box::new(LegacyBlockCipher::new(&key)));
        build_frame(variant, 0x06, 0x00, b"chat message here", &mut encryptor, &mut scratch);

        // Feed only the header first.
        let mut read_buf = BytesMut::from(&scratch[..4]);
        let mut pending = None;
        let mut decryptor: Option<Box<dyn StreamCipher>> =
            Some(Box::new(LegacyBlockCipher::new(&key)));
        let result = try_take_frame(variant, &mut read_buf, &mut pending, &mut decryptor).unwrap();
        assert!(result.is_none());
        assert!(pending.is_some());

        // Now feed the rest; the already-decrypted header must not be
        // decrypted a second time.
        read_buf.extend_from_slice(&scratch[4..]);
        let (header, body) =
            try_take_frame(variant, &mut read_buf, &mut pending, &mut decryptor)
                .unwrap()
                .unwrap();
        assert_eq!(header.pkt_type, 0x06);
        assert_eq!(&body[..], b"chat message here");
    }
}
