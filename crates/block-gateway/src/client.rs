//! The ship-side gateway session (`spec.md` §4.6): owns the TLS
//! connection, drives the reconnect policy, and turns inbound frames
//! into [`GatewayEvent`]s for the caller to act on.

use crate::connection::GatewayConnection;
use crate::envelope::HEADER_LEN;
use crate::events::{parse_event, GatewayEvent, ParseError};
use crate::login::ShipRegistration;
use crate::reconnect::{ReconnectPolicy, ReconnectStep};
use tokio_rustls::TlsConnector;
use tracing::{info, warn};

pub struct GatewayClient {
    connector: TlsConnector,
    host: String,
    port: u16,
    registration: ShipRegistration,
    connection: Option<GatewayConnection>,
    has_key: bool,
    policy: ReconnectPolicy,
}

impl GatewayClient {
    pub fn new(connector: TlsConnector, host: String, port: u16, registration: ShipRegistration) -> Self {
        Self {
            connector,
            host,
            port,
            registration,
            connection: None,
            has_key: false,
            policy: ReconnectPolicy::new(),
        }
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    /// Connect and perform the login handshake. On success `has_key`
    /// becomes true and the caller should follow up with a full
    /// client-records burst (`spec.md` §4.6).
    pub async fn connect_and_login(&mut self) -> anyhow::Result<()> {
        let mut conn = GatewayConnection::connect(&self.connector, &self.host, self.port).await?;

        let (header, _challenge) = conn.read_frame().await?;
        info!(gateway_version = header.version, "received login challenge");

        let body = encode_registration(&self.registration);
        conn.write_frame(crate::packet_type::PacketType::Login as u16, 0, &body)
            .await?;

        let (reply_header, reply_body) = conn.read_frame().await?;
        if reply_header.is_failure() {
            anyhow::bail!(
                "gateway rejected login: code {}",
                reply_body.first().copied().unwrap_or(0xFF)
            );
        }

        self.connection = Some(conn);
        self.has_key = true;
        self.policy.on_success();
        Ok(())
    }

    /// Read and classify the next inbound frame. `None` distinguishes a
    /// frame this client has no use for (outside the named list in
    /// `spec.md` §4.6, e.g. the login reply itself once already logged in)
    /// from a hard error.
    pub async fn next_event(&mut self) -> anyhow::Result<Option<GatewayEvent>> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("not connected"))?;
        let (header, body) = conn.read_frame().await?;
        match parse_event(header.pkt_type, &body) {
            Ok(event) => Ok(Some(event)),
            Err(ParseError::UnknownType(_)) => Ok(None),
            Err(ParseError::Truncated) => Err(anyhow::anyhow!(
                "truncated gateway packet type {} (body {} bytes)",
                header.pkt_type,
                body.len()
            )),
        }
    }

    pub async fn send(&mut self, pkt_type: u16, flags: u16, body: &[u8]) -> anyhow::Result<()> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("not connected"))?;
        conn.write_frame(pkt_type, flags, body).await
    }

    /// Run the reconnect loop forever: connect, log in, and hand control
    /// to `on_connected` until it returns (session lost); then wait the
    /// flat 15s cooldown and try again (`spec.md` §5: "the gateway
    /// reconnect cooldown is 15 s").
    pub async fn run<F, Fut>(&mut self, mut on_connected: F)
    where
        F: FnMut(&mut GatewayClient) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<()>>,
    {
        loop {
            self.has_key = false;
            self.connection = None;
            match self.connect_and_login().await {
                Ok(()) => {
                    if let Err(e) = on_connected(self).await {
                        warn!(error = %e, "gateway session ended");
                    }
                    self.policy.on_success();
                }
                Err(e) => {
                    warn!(error = %e, "gateway connect/login failed");
                    match self.policy.on_failure() {
                        ReconnectStep::Wait(delay) => tokio::time::sleep(delay).await,
                        ReconnectStep::AttemptNow => {}
                    }
                }
            }
        }
    }
}

fn encode_registration(reg: &ShipRegistration) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&reg.ipv4.octets());
    if let Some(v6) = reg.ipv6 {
        out.push(1);
        out.extend_from_slice(&v6.octets());
    } else {
        out.push(0);
    }
    out.extend_from_slice(&reg.base_port.to_be_bytes());
    out.extend_from_slice(&reg.client_count.to_be_bytes());
    out.extend_from_slice(&reg.team_count.to_be_bytes());
    out.extend_from_slice(&reg.menu_code.to_be_bytes());
    out.extend_from_slice(&reg.privileges.to_be_bytes());
    out.extend_from_slice(&reg.proto_version.to_be_bytes());
    out.extend_from_slice(reg.name.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_registration_carries_name_after_fixed_fields() {
        let reg = ShipRegistration {
            name: "Ship01".into(),
            ipv4: std::net::Ipv4Addr::new(192, 168, 0, 1),
            ipv6: None,
            base_port: 5100,
            client_count: 4,
            team_count: 1,
            menu_code: 0,
            privileges: 0,
            proto_version: 1,
        };
        let encoded = encode_registration(&reg);
        assert!(encoded.len() > HEADER_LEN);
        assert_eq!(&encoded[0..4], &[192, 168, 0, 1]);
        assert_eq!(encoded[4], 0);
        assert!(encoded.ends_with(b"Ship01"));
    }
}
