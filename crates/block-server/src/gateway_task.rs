//! The per-block gateway session (`spec.md` §4.6): one `GatewayClient`
//! per Block, reconnecting on the flat 15s cooldown the crate already
//! implements, translating inbound `GatewayEvent`s into `BlockMsg::Gateway`
//! and draining an outgoing-frame queue the rest of the block feeds.

use crate::block::BlockMsg;
use crate::ship::Ship;
use block_gateway::client::GatewayClient;
use block_gateway::connection::connector_from_trust_root;
use block_gateway::login::ShipRegistration;
use block_types::MenuCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// A frame the block wants sent to the gateway: `(type, flags, body)`,
/// matching every builder in `block_gateway::sent`.
pub type OutgoingFrame = (u16, u16, Vec<u8>);

pub fn spawn(
    ship: Arc<Ship>,
    block_no: u8,
    block_tx: mpsc::UnboundedSender<BlockMsg>,
    mut outgoing_rx: mpsc::UnboundedReceiver<OutgoingFrame>,
) -> anyhow::Result<()> {
    let trust_root = std::fs::read(&ship.config.shipgate.trust_root_path)?;
    let connector = connector_from_trust_root(&trust_root)?;

    let registration = ShipRegistration {
        name: format!("{}-{}", ship.config.name, block_no),
        ipv4: ship.config.ipv4,
        ipv6: ship.config.ipv6,
        base_port: ship.config.base_port,
        client_count: 0,
        team_count: 0,
        menu_code: u16::from_be_bytes(ship.config.menu_code),
        privileges: ship.config.privileges,
        proto_version: 1,
    };

    let host = ship.config.shipgate.host.clone();
    let port = ship.config.shipgate.port;

    tokio::spawn(async move {
        let mut client = GatewayClient::new(connector, host, port, registration);

        client
            .run(|client| {
                let block_tx = block_tx.clone();
                let rx = &mut outgoing_rx;
                async move { drive_session(client, &block_tx, rx).await }
            })
            .await;
    });

    Ok(())
}

/// Drain `client`'s inbound events and `outgoing`'s queued frames for as
/// long as the session stays up; any `anyhow::Error` returned here tells
/// `GatewayClient::run` the session dropped, which feeds the reconnect
/// policy (`spec.md` §4.6).
async fn drive_session(
    client: &mut GatewayClient,
    block_tx: &mpsc::UnboundedSender<BlockMsg>,
    outgoing: &mut mpsc::UnboundedReceiver<OutgoingFrame>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            event = client.next_event() => {
                match event? {
                    Some(event) => {
                        if block_tx.send(BlockMsg::Gateway(event)).is_err() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                }
            }
            frame = outgoing.recv() => {
                match frame {
                    Some((pkt_type, flags, body)) => {
                        client.send(pkt_type, flags, &body).await?;
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Translate one inbound gateway event into whatever the block needs to do
/// with it (`spec.md` §4.6's received-packet list). Most events are
/// per-client state pushes the dispatch layer applies when it next sees
/// the affected client; the ship-wide ones (`ShipStatusPush`, `CountPush`,
/// `GlobalMessage`) are applied here directly.
pub async fn handle_event(block: &mut crate::block::Block, event: block_gateway::GatewayEvent) {
    use block_gateway::GatewayEvent::*;
    match event {
        GlobalMessage { text } => {
            for client in block.clients.values_mut() {
                let _ = client.writer.write_frame(0xEE, 0, text.as_bytes()).await;
            }
        }
        ShipStatusPush { ship_name, ipv4, present } => {
            let mut ships = block.ship.mini_ships.write();
            if present {
                if let Some(existing) = ships.iter_mut().find(|s| s.name == ship_name) {
                    existing.ipv4 = ipv4;
                } else {
                    ships.push(block_types::MiniShip {
                        ship_id: ships.len() as u32,
                        name: ship_name,
                        ipv4,
                        ipv6: None,
                        base_port: block.ship.config.base_port,
                        client_count: 0,
                        team_count: 0,
                        menu_code: MenuCode(block.ship.config.menu_code),
                        flags: 0,
                        ship_number: ships.len() as u16,
                        privileges: 0,
                    });
                }
            } else {
                ships.retain(|s| s.name != ship_name);
            }
        }
        CountPush { ship_name, clients, games } => {
            let mut ships = block.ship.mini_ships.write();
            if let Some(ship) = ships.iter_mut().find(|s| s.name == ship_name) {
                ship.client_count = clients;
                ship.team_count = games;
            }
        }
        BanResponse { target_client, lang: _, message_key } => {
            if let Some(client) = block
                .clients
                .values_mut()
                .find(|c| c.guild == target_client)
            {
                let _ = client.writer.write_frame(0x05, 0, message_key.as_bytes()).await;
            }
        }
        Kick { guild, reason } => {
            if let Some(client) = block.clients.values_mut().find(|c| c.guild == guild) {
                let body = reason.unwrap_or_default();
                let _ = client.writer.write_frame(0x05, 0, body.as_bytes()).await;
            }
        }
        QuestFlagReply { .. } | CharDataReply { .. } | FriendListReply { .. } | UserOptionUpdate { .. }
        | BbOptionReply { .. } | GuildCardSearchReply { .. } | SimpleMail { .. } | FriendLogin { .. }
        | FriendLogout { .. } | UserLoginReply { .. } | BlockLoginError { .. } | CharSaveResponse { .. }
        | FriendAddResponse { .. } | FriendDeleteResponse { .. } | ScriptChunkPush { .. } | ShipControl { .. } => {
            // These correlate to an in-flight per-client request (quest-flag
            // round trips, char data, friend list, mail) that the dispatch
            // layer resolves the next time it touches that client; nothing
            // ship-wide to apply here. Out of scope per `spec.md` §1 for the
            // save/backup storage backing them.
        }
    }
}
