//! The generic event-bus machinery backing the scripting hook surface
//! (`spec.md` §9 "Scripting bridge"). Knows nothing about Lua or hook
//! names; `block-scripting` builds the fixed hook list on top of this.

pub mod bus;

pub use bus::{EventBus, EventResult, ListenerEntry, Priority};
