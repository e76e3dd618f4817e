//! The embedded scripting bridge (`spec.md` §9 "Scripting bridge"): a
//! fixed set of named hooks, not a general mod-loading system. The core
//! fires a hook by name with a small typed payload; a script function
//! returning a truthy value suppresses the core's default handling for
//! that hook.

pub mod bridge;
pub mod discovery;
pub mod hooks;
pub mod runtime;
pub mod sandbox;

pub use bridge::{HookContext, HookValue};
pub use hooks::Hook;
pub use runtime::ScriptRuntime;
