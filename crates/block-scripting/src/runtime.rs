use crate::bridge::HookContext;
use crate::discovery;
use crate::hooks::Hook;
use block_events::{EventBus, EventResult, Priority};
use mlua::{Lua, RegistryKey};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

fn lua_err(e: mlua::Error) -> anyhow::Error {
    anyhow::anyhow!("{}", e)
}

/// Owns the embedded Lua VM and the hook-dispatch bookkeeping
/// (`spec.md` §9 "Scripting bridge"). The VM is `!Send`, so one instance
/// lives on each Block's own task rather than being shared ship-wide.
pub struct ScriptRuntime {
    lua: Lua,
    event_bus: Arc<Mutex<EventBus>>,
    callbacks: Arc<Mutex<HashMap<u64, RegistryKey>>>,
}

impl ScriptRuntime {
    pub fn new() -> anyhow::Result<Self> {
        let lua = Lua::new();
        let event_bus = Arc::new(Mutex::new(EventBus::new()));
        let callbacks = Arc::new(Mutex::new(HashMap::new()));

        setup_globals(&lua, event_bus.clone(), callbacks.clone())?;

        Ok(Self {
            lua,
            event_bus,
            callbacks,
        })
    }

    /// Load every `.lua` file under `scripts_dir`. A script that fails to
    /// load is logged and skipped; it never aborts startup
    /// (`spec.md` §7: "Script errors: logged, the current event is treated
    /// as if no script ran").
    pub fn load_scripts(&self, scripts_dir: &Path) -> anyhow::Result<()> {
        let scripts = discovery::discover_scripts(scripts_dir)?;
        for path in &scripts {
            if let Err(e) = crate::sandbox::load_script(&self.lua, path) {
                error!("Failed to load script {:?}: {}", path, e);
            }
        }

        let bus = self.event_bus.lock().unwrap();
        info!(
            "Scripting initialized: {} scripts, {} hook registrations",
            scripts.len(),
            bus.listener_count()
        );

        Ok(())
    }

    /// Fire `hook` with `ctx`. Returns `EventResult::Cancel` if any
    /// non-Monitor listener asked to cancel; a script error on one listener
    /// is logged and treated as `Continue` for that listener.
    pub fn fire(&self, hook: Hook, ctx: HookContext) -> EventResult {
        let listeners: Vec<_> = {
            let bus = self.event_bus.lock().unwrap();
            bus.get_listeners(hook.name()).to_vec()
        };

        if listeners.is_empty() {
            return EventResult::Continue;
        }

        let table = match ctx.to_lua_table(&self.lua) {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to build hook table for {}: {}", hook.name(), e);
                return EventResult::Continue;
            }
        };

        let callbacks = self.callbacks.lock().unwrap();
        let mut result = EventResult::Continue;

        for listener in &listeners {
            let Some(reg_key) = callbacks.get(&listener.listener_id) else {
                continue;
            };
            let outcome: Result<bool, mlua::Error> = (|| {
                let func: mlua::Function = self.lua.registry_value(reg_key)?;
                func.call(table.clone())
            })();

            match outcome {
                Ok(true) if listener.priority != Priority::Monitor => {
                    result = EventResult::Cancel;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "Error in '{}' handler (listener {}): {}",
                        hook.name(),
                        listener.listener_id,
                        e
                    );
                }
            }
        }

        result
    }
}

fn setup_globals(
    lua: &Lua,
    event_bus: Arc<Mutex<EventBus>>,
    callbacks: Arc<Mutex<HashMap<u64, RegistryKey>>>,
) -> anyhow::Result<()> {
    let ship = lua.create_table().map_err(lua_err)?;

    let log_fn = lua
        .create_function(|_, msg: String| {
            info!("[Lua] {}", msg);
            Ok(())
        })
        .map_err(lua_err)?;
    ship.set("log", log_fn).map_err(lua_err)?;

    let hooks_table = lua.create_table().map_err(lua_err)?;

    // ship.hooks.on(hook_name, callback, priority?)
    let hooks_on = lua
        .create_function(
            move |lua_ctx, (hook_name, callback, priority): (String, mlua::Function, Option<String>)| {
                if Hook::from_name(&hook_name).is_none() {
                    return Err(mlua::Error::RuntimeError(format!(
                        "unknown hook '{hook_name}'"
                    )));
                }

                let priority = priority
                    .map(|p| Priority::from_str(&p))
                    .unwrap_or(Priority::Normal);

                let listener_id = {
                    let mut bus = event_bus.lock().unwrap();
                    bus.register(&hook_name, "script", priority)
                };

                let reg_key = lua_ctx.create_registry_value(callback)?;
                callbacks.lock().unwrap().insert(listener_id, reg_key);

                Ok(())
            },
        )
        .map_err(lua_err)?;
    hooks_table.set("on", hooks_on).map_err(lua_err)?;

    ship.set("hooks", hooks_table).map_err(lua_err)?;
    lua.globals().set("ship", ship).map_err(lua_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_with_no_listeners_continues() {
        let runtime = ScriptRuntime::new().unwrap();
        let result = runtime.fire(Hook::Startup, HookContext::new());
        assert_eq!(result, EventResult::Continue);
    }

    #[test]
    fn script_returning_true_cancels() {
        let runtime = ScriptRuntime::new().unwrap();
        runtime
            .lua
            .load("ship.hooks.on('EnemyHit', function(ctx) return true end)")
            .exec()
            .unwrap();
        let result = runtime.fire(
            Hook::EnemyHit,
            HookContext::new().field("enemy_id", 1u32),
        );
        assert_eq!(result, EventResult::Cancel);
    }

    #[test]
    fn monitor_priority_listener_cannot_cancel() {
        let runtime = ScriptRuntime::new().unwrap();
        runtime
            .lua
            .load("ship.hooks.on('BoxBreak', function(ctx) return true end, 'monitor')")
            .exec()
            .unwrap();
        let result = runtime.fire(Hook::BoxBreak, HookContext::new());
        assert_eq!(result, EventResult::Continue);
    }

    #[test]
    fn unknown_hook_name_is_rejected() {
        let runtime = ScriptRuntime::new().unwrap();
        let err = runtime
            .lua
            .load("ship.hooks.on('NotAHook', function(ctx) end)")
            .exec();
        assert!(err.is_err());
    }
}
