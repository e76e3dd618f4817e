//! Per-variant subcommand translation (`spec.md` §4.4, §4.5): the pure data
//! conversions the four protocol families disagree on. The opcode-routing
//! table that decides *when* to call these lives in `block-subcommand`;
//! this crate only holds the conversions themselves, grounded on the
//! variant-dispatch design note in `spec.md` §9 ("a tagged variant plus
//! per-variant translators... a table keyed on (sender-variant,
//! recipient-variant, opcode)").

pub mod guildcard;
pub mod word_select;

pub use guildcard::{GuildCardError, GuildCardRecord};
pub use word_select::{translate_word_select, TranslatedWordSelect, WordSelectError};
