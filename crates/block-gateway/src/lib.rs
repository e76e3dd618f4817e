//! The gateway client (`spec.md` §4.6): reconnect/backoff, authenticated
//! TLS channel framing, request/response correlation, and the packets
//! that mutate ship or client state.

pub mod client;
pub mod connection;
pub mod envelope;
pub mod events;
pub mod login;
pub mod packet_type;
pub mod reconnect;
pub mod script_chunk;
pub mod sent;

pub use client::GatewayClient;
pub use envelope::Header;
pub use events::GatewayEvent;
pub use login::{LoginChallenge, LoginFailure, LoginResult, ShipRegistration};
pub use packet_type::PacketType;
