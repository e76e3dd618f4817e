//! The gateway session transport: TLS over TCP, framed per
//! [`crate::envelope`] (`spec.md` §4.6).
//!
//! **Framing invariant**: the connection keeps one "header read" flag
//! (`pending_header`); it reads exactly one header, then consumes the
//! remainder of that packet before moving on to the next. A partial
//! packet simply leaves bytes sitting in the reassembly buffer until
//! more arrive off the socket.

use crate::envelope::{self, Header, HEADER_LEN};
use bytes::{Buf, BytesMut};
use rustls_pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

pub struct GatewayConnection {
    stream: TlsStream<TcpStream>,
    read_buf: BytesMut,
    pending_header: Option<Header>,
}

impl GatewayConnection {
    /// Connect to `host:port` over TCP, then upgrade to TLS authenticated
    /// against `connector`'s trust root (`spec.md` §4.6: "Session is
    /// wrapped in a TLS transport authenticated by a certificate trust
    /// root provided at startup").
    pub async fn connect(connector: &TlsConnector, host: &str, port: u16) -> anyhow::Result<Self> {
        let tcp = TcpStream::connect((host, port)).await?;
        tcp.set_nodelay(true)?;
        let server_name = ServerName::try_from(host.to_owned())?;
        let stream = connector.connect(server_name, tcp).await?;
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            pending_header: None,
        })
    }

    pub async fn read_frame(&mut self) -> anyhow::Result<(Header, BytesMut)> {
        loop {
            if let Some(frame) = try_take_frame(&mut self.read_buf, &mut self.pending_header)? {
                return Ok(frame);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("gateway connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }

    pub async fn write_frame(&mut self, pkt_type: u16, flags: u16, body: &[u8]) -> anyhow::Result<()> {
        let bytes = build_frame(pkt_type, flags, body);
        self.stream.write_all(&bytes).await?;
        Ok(())
    }
}

fn try_take_frame(
    read_buf: &mut BytesMut,
    pending_header: &mut Option<Header>,
) -> anyhow::Result<Option<(Header, BytesMut)>> {
    if pending_header.is_none() {
        if read_buf.len() < HEADER_LEN {
            return Ok(None);
        }
        *pending_header = Some(envelope::read_header(&read_buf[..HEADER_LEN]));
    }

    let header = pending_header.expect("checked above");
    let total_len = header.length as usize;
    if total_len < HEADER_LEN {
        return Err(anyhow::anyhow!("gateway header declares length {total_len} shorter than the header itself"));
    }
    if read_buf.len() < total_len {
        return Ok(None);
    }

    let mut frame = read_buf.split_to(total_len);
    frame.advance(HEADER_LEN);
    *pending_header = None;
    Ok(Some((header, frame)))
}

fn build_frame(pkt_type: u16, flags: u16, body: &[u8]) -> Vec<u8> {
    let header = Header {
        length: (HEADER_LEN + body.len()) as u16,
        pkt_type,
        flags,
        version: 0,
        reserved: 0,
    };
    let mut out = Vec::with_capacity(header.length as usize);
    envelope::write_header(header, &mut out);
    out.extend_from_slice(body);
    out
}

/// Load a PEM-encoded trust root into a rustls client config
/// (`spec.md` §4.6's "certificate trust root provided at startup").
pub fn connector_from_trust_root(pem: &[u8]) -> anyhow::Result<TlsConnector> {
    let mut roots = rustls::RootCertStore::empty();
    let mut cursor = std::io::Cursor::new(pem);
    for cert in rustls_pemfile::certs(&mut cursor) {
        roots.add(cert?)?;
    }
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_header_yields_none_and_retains_buffered_bytes() {
        let frame = build_frame(5, 0, b"hello");
        let mut read_buf = BytesMut::from(&frame[..4]);
        let mut pending = None;
        let result = try_take_frame(&mut read_buf, &mut pending).unwrap();
        assert!(result.is_none());
        assert_eq!(read_buf.len(), 4);
    }

    #[test]
    fn header_is_retained_once_parsed_and_not_reparsed() {
        let frame = build_frame(5, envelope::RESPONSE, b"hello");
        let mut read_buf = BytesMut::from(&frame[..HEADER_LEN]);
        let mut pending = None;
        assert!(try_take_frame(&mut read_buf, &mut pending).unwrap().is_none());
        assert!(pending.is_some());

        read_buf.extend_from_slice(&frame[HEADER_LEN..]);
        let (header, body) = try_take_frame(&mut read_buf, &mut pending).unwrap().unwrap();
        assert_eq!(header.pkt_type, 5);
        assert!(header.is_response());
        assert_eq!(&body[..], b"hello");
        assert!(pending.is_none());
    }

    #[test]
    fn full_frame_in_one_read_is_taken_whole() {
        let frame = build_frame(9, 0, b"abc");
        let mut read_buf = BytesMut::from(&frame[..]);
        let mut pending = None;
        let (header, body) = try_take_frame(&mut read_buf, &mut pending).unwrap().unwrap();
        assert_eq!(header.pkt_type, 9);
        assert_eq!(&body[..], b"abc");
        assert!(read_buf.is_empty());
    }
}
