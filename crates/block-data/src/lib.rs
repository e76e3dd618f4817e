//! Boundary crate for data the core treats as pure-function tables
//! (`spec.md` §1 Non-goals): item generation, monster parameters, quest
//! files, limits tables, and the word-select vocabulary stay out of scope —
//! this crate only defines the *shape* those tables take and a small amount
//! of representative data so the core can be exercised without a full PSO
//! data dump.

pub mod bans;
pub mod limits;
pub mod messages;
pub mod word_select;

pub use bans::{BanList, GuildCardBan, IpBan};
pub use limits::LimitsTable;
pub use messages::MessageTable;
pub use word_select::WordSelectTables;
