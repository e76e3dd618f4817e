pub mod cipher;
pub mod connection;
pub mod envelope;
pub mod subcommand;

pub use cipher::{BlueBurstCipher, LegacyBlockCipher, StreamCipher};
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use envelope::Header;
pub use subcommand::{SubHeader, SubHeaderError, SubIdField};
