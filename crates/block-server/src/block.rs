//! The Block actor (`spec.md` §4.1): owns the connected-client table, the
//! lobby collection, the per-block scripting runtime, and the gateway
//! session. Runs as its own Tokio task — the async-task equivalent of "one
//! thread per Block" (`spec.md` §5).

use crate::client::ClientState;
use crate::dispatch;
use crate::gateway_task;
use crate::ship::Ship;
use block_data::limits::DenylistLimits;
use block_data::{MessageTable, WordSelectTables};
use block_protocol_core::{BlueBurstCipher, Connection, Header, LegacyBlockCipher, StreamCipher};
use block_scripting::{Hook, HookContext, ScriptRuntime};
use block_types::{ClientFlags, ClientId, ClientVariant, GuildNumber, LobbyId};
use block_lobby::{Lobby, LobbyCollection};
use bytes::BytesMut;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Idle timers a Block applies to every connected client (`spec.md` §4.1:
/// "idle > 120s → mark disconnect; idle > 60s with no send in the last 10s
/// → enqueue ping").
const IDLE_DISCONNECT: Duration = Duration::from_secs(120);
const PING_AFTER_SILENCE: Duration = Duration::from_secs(60);
const PING_DEBOUNCE: Duration = Duration::from_secs(10);
const BAN_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const HOUSEKEEPING_TICK: Duration = Duration::from_secs(1);

/// The six listening ports a Block opens, one per protocol family
/// (`spec.md` §6: `base_port + 6*block_no + variant_offset`). Trial clients
/// share their non-trial sibling's port and are told apart at the welcome
/// handshake instead, a simplification over a thirteen-variant listener set
/// (see `DESIGN.md`).
const VARIANT_OFFSETS: [(u16, ClientVariant); 6] = [
    (0, ClientVariant::V2Legacy),
    (1, ClientVariant::V2Pc),
    (2, ClientVariant::V3Gc),
    (3, ClientVariant::V3Episode3),
    (4, ClientVariant::V4Bb),
    (5, ClientVariant::V3Xbox),
];

pub enum BlockMsg {
    Accepted {
        variant: ClientVariant,
        connection: Connection,
        addr: SocketAddr,
    },
    Frame {
        client: ClientId,
        header: Header,
        body: BytesMut,
    },
    ClientClosed {
        client: ClientId,
    },
    Gateway(block_gateway::GatewayEvent),
}

pub struct Block {
    pub ship: Arc<Ship>,
    pub block_no: u8,
    pub clients: HashMap<ClientId, ClientState>,
    pub lobbies: LobbyCollection,
    pub limits: DenylistLimits,
    pub messages: MessageTable,
    pub word_select_tables: WordSelectTables,
    pub scripting: ScriptRuntime,
    pub quest_rng: ChaCha8Rng,
    pub gateway_tx: mpsc::UnboundedSender<gateway_task::OutgoingFrame>,
    msg_tx: mpsc::UnboundedSender<BlockMsg>,
    msg_rx: mpsc::UnboundedReceiver<BlockMsg>,
    next_client_id: u64,
    last_ban_sweep: Instant,
    active_event: Option<String>,
}

impl Block {
    pub async fn new(ship: Arc<Ship>, block_no: u8) -> anyhow::Result<Self> {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        for &(offset, variant) in &VARIANT_OFFSETS {
            let port = ship.config.listen_port(block_no, offset);
            bind_and_spawn(ship.config.ipv4.into(), port, variant, msg_tx.clone()).await?;
            if ship.config.ipv6_enabled {
                if let Some(ipv6) = ship.config.ipv6 {
                    bind_and_spawn(ipv6.into(), port, variant, msg_tx.clone()).await?;
                }
            }
        }

        // Default (lobby-select) lobbies pre-exist for the block's whole
        // lifetime and are never destroyed (`spec.md` §4.3 invariant).
        let mut lobbies = LobbyCollection::new(seed_for(block_no));
        for i in 0..15u32 {
            lobbies.insert_default(Lobby::new_default(LobbyId(i), 12));
        }

        let scripting = ScriptRuntime::new()?;
        if let Err(e) = scripting.load_scripts(&ship.config.scripts_dir) {
            warn!(block = block_no, "failed to load scripts: {}", e);
        }
        scripting.fire(Hook::Startup, HookContext::new().field("block", block_no as u32));

        let default_limits_name = ship.config.default_limits.clone().unwrap_or_else(|| "default".into());
        let limits = DenylistLimits::permissive(default_limits_name);

        let (gateway_tx, gateway_rx) = mpsc::unbounded_channel();
        gateway_task::spawn(ship.clone(), block_no, msg_tx.clone(), gateway_rx)?;

        Ok(Self {
            ship,
            block_no,
            clients: HashMap::new(),
            lobbies,
            limits,
            messages: MessageTable::new(),
            word_select_tables: WordSelectTables::new(),
            scripting,
            quest_rng: ChaCha8Rng::seed_from_u64(seed_for(block_no)),
            gateway_tx,
            msg_tx,
            msg_rx,
            next_client_id: 1,
            last_ban_sweep: Instant::now(),
            active_event: None,
        })
    }

    fn alloc_client_id(&mut self) -> ClientId {
        let id = ClientId(self.next_client_id);
        self.next_client_id += 1;
        id
    }

    /// Drive the block forever: a housekeeping tick interleaved with
    /// whatever accept/frame/gateway messages arrive (`spec.md` §4.1's
    /// ten-step pass, steps 2-6 and 9-10 folded into `housekeeping`, steps
    /// 7-8 handled per message as it arrives rather than batched, which is
    /// the natural shape once accept/read are each their own async task
    /// instead of one readiness-poll).
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(HOUSEKEEPING_TICK);
        loop {
            if self.clients.is_empty() && self.ship.is_shutdown_pending() && !self.has_pending_work() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.housekeeping().await;
                }
                msg = self.msg_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_msg(msg).await,
                        None => break,
                    }
                }
            }
        }

        self.scripting.fire(Hook::Shutdown, HookContext::new().field("block", self.block_no as u32));
    }

    fn has_pending_work(&self) -> bool {
        false
    }

    async fn handle_msg(&mut self, msg: BlockMsg) {
        match msg {
            BlockMsg::Accepted { variant, connection, addr } => self.on_accepted(variant, connection, addr).await,
            BlockMsg::Frame { client, header, body } => {
                if let Err(e) = dispatch::handle_frame(self, client, header, body).await {
                    warn!(block = self.block_no, ?client, "dropping client after dispatch error: {}", e);
                    self.disconnect(client).await;
                }
            }
            BlockMsg::ClientClosed { client } => {
                self.clients.remove(&client);
            }
            BlockMsg::Gateway(event) => {
                gateway_task::handle_event(self, event).await;
            }
        }
    }

    async fn on_accepted(&mut self, variant: ClientVariant, connection: Connection, addr: SocketAddr) {
        if self.ship.is_shutdown_pending() {
            // `spec.md` §4.1: "accept-with-shutdown-pending immediate
            // disconnect" — drop the connection without ever registering it.
            return;
        }

        let (reader, writer) = connection.into_split();
        let id = self.alloc_client_id();
        let mut state = ClientState::new(id, writer, variant, GuildNumber(0));
        if variant.is_trial() {
            state.flags.insert(ClientFlags::IS_TRIAL_EDITION);
        }
        if addr.is_ipv6() {
            state.flags.insert(ClientFlags::IPV6_PEER);
        }
        self.clients.insert(id, state);

        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let mut reader = reader;
            loop {
                match reader.read_frame().await {
                    Ok((header, body)) => {
                        if tx.send(BlockMsg::Frame { client: id, header, body }).is_err() {
                            return;
                        }
                    }
                    Err(_) => {
                        let _ = tx.send(BlockMsg::ClientClosed { client: id });
                        return;
                    }
                }
            }
        });

        info!(block = self.block_no, %addr, ?variant, ?id, "client connected");
    }

    pub(crate) async fn disconnect(&mut self, id: ClientId) {
        if let Some(mut state) = self.clients.remove(&id) {
            if let Some(lobby_id) = state.lobby {
                if let Some(lobby) = self.lobbies.get_mut(lobby_id) {
                    let _ = lobby.remove_client(id);
                }
            }
            let _ = state.writer.write_frame(0x05, 0, &[]).await;
        }
    }

    /// `spec.md` §4.1 steps 2-6, 9-10: ban sweep, gateway reconnect is
    /// driven entirely inside `gateway_task` so isn't repeated here, the
    /// calendar-event transition broadcast, per-client idle/ping timers,
    /// and the two-phase cleanup of disconnected clients and destroyed
    /// game lobbies.
    async fn housekeeping(&mut self) {
        if self.last_ban_sweep.elapsed() >= BAN_SWEEP_INTERVAL {
            let removed = self.ship.bans.write().sweep(unix_now());
            if removed > 0 {
                info!(block = self.block_no, removed, "swept expired bans");
            }
            self.last_ban_sweep = Instant::now();
        }

        self.check_calendar_transition().await;

        let mut to_disconnect = Vec::new();
        let mut to_ping = Vec::new();
        for (&id, client) in self.clients.iter() {
            if client.idle_for() >= IDLE_DISCONNECT {
                to_disconnect.push(id);
            } else if client.idle_for() >= PING_AFTER_SILENCE && client.silent_for() >= PING_DEBOUNCE {
                to_ping.push(id);
            }
        }
        for id in to_ping {
            if let Some(client) = self.clients.get_mut(&id) {
                if client.writer.write_frame(0x1A, 0, &[]).await.is_ok() {
                    client.touch_sent();
                }
            }
        }
        for id in to_disconnect {
            self.disconnect(id).await;
        }

        let destroyed = self.lobbies.sweep_destroyed();
        if !destroyed.is_empty() {
            info!(block = self.block_no, count = destroyed.len(), "destroyed empty game lobbies");
        }
    }

    async fn check_calendar_transition(&mut self) {
        let now = unix_now();
        let current = self
            .ship
            .config
            .events
            .iter()
            .find(|e| matches_window(e, now))
            .map(|e| e.name.clone());

        if current != self.active_event {
            self.active_event = current.clone();
            let text = match &current {
                Some(name) => format!("Event: {name}"),
                None => "Event ended".to_string(),
            };
            let default_lobby_clients: Vec<ClientId> = self
                .clients
                .iter()
                .filter(|(_, c)| c.lobby.map(|l| l.0 < 15).unwrap_or(false))
                .map(|(&id, _)| id)
                .collect();
            for id in default_lobby_clients {
                if let Some(client) = self.clients.get_mut(&id) {
                    let _ = client.writer.write_frame(0xB0, 0, text.as_bytes()).await;
                }
            }
        }
    }
}

fn matches_window(entry: &crate::config::EventCalendarEntry, now: i64) -> bool {
    let start: i64 = entry.start.parse().unwrap_or(i64::MAX);
    let end: i64 = entry.end.parse().unwrap_or(i64::MIN);
    now >= start && now < end
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn seed_for(block_no: u8) -> u64 {
    0xC0FFEE_u64 ^ (block_no as u64)
}

async fn bind_and_spawn(
    ip: std::net::IpAddr,
    port: u16,
    variant: ClientVariant,
    block_tx: mpsc::UnboundedSender<BlockMsg>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((ip, port)).await?;
    info!(%ip, port, ?variant, "block listening");
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = block_tx.clone();
                    tokio::spawn(async move {
                        accept_and_handshake(stream, variant, addr, tx).await;
                    });
                }
                Err(e) => warn!(%ip, port, "accept failed: {}", e),
            }
        }
    });
    Ok(())
}

/// Perform the welcome exchange before handing the connection to the block:
/// generate per-direction IVs, send them unencrypted in a welcome packet
/// (type `0x02`), then install the ciphers those IVs seed (`spec.md` §4.2:
/// "a welcome exchange with random IVs is required before any authenticated
/// payload"). `Connection::enable_encryption` only exists pre-split, so this
/// must all happen before `into_split`.
async fn accept_and_handshake(
    stream: tokio::net::TcpStream,
    variant: ClientVariant,
    addr: SocketAddr,
    block_tx: mpsc::UnboundedSender<BlockMsg>,
) {
    let mut conn = Connection::new(stream, variant);
    let key_len = if variant.is_blue_burst() { 48 } else { 4 };

    let mut server_key = vec![0u8; key_len];
    let mut client_key = vec![0u8; key_len];
    rand::thread_rng().fill_bytes(&mut server_key);
    rand::thread_rng().fill_bytes(&mut client_key);

    let mut welcome_body = server_key.clone();
    welcome_body.extend_from_slice(&client_key);
    if let Err(e) = conn.write_frame(0x02, 0, &welcome_body).await {
        warn!(%addr, "welcome send failed: {}", e);
        return;
    }

    let (encryptor, decryptor): (Box<dyn StreamCipher>, Box<dyn StreamCipher>) = if variant.is_blue_burst() {
        let mut sk = [0u8; 48];
        sk.copy_from_slice(&server_key);
        let mut ck = [0u8; 48];
        ck.copy_from_slice(&client_key);
        (Box::new(BlueBurstCipher::new(&sk)), Box::new(BlueBurstCipher::new(&ck)))
    } else {
        let mut sk = [0u8; 4];
        sk.copy_from_slice(&server_key);
        let mut ck = [0u8; 4];
        ck.copy_from_slice(&client_key);
        (Box::new(LegacyBlockCipher::new(&sk)), Box::new(LegacyBlockCipher::new(&ck)))
    };
    conn.enable_encryption(encryptor, decryptor);

    if block_tx.send(BlockMsg::Accepted { variant, connection: conn, addr }).is_err() {
        warn!(%addr, "block channel closed before handshake could be delivered");
    }
}
