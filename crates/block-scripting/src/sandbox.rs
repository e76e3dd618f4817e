use mlua::Lua;
use std::path::Path;
use tracing::debug;

/// Execute one script file against `lua`. The script is expected to call
/// `ship.hooks.on(name, fn)` for whichever hooks it wants to handle.
pub fn load_script(lua: &Lua, path: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let chunk_name = format!("@{}", path.display());

    debug!("Executing script: {:?}", path);

    lua.load(&source)
        .set_name(&chunk_name)
        .exec()
        .map_err(|e| anyhow::anyhow!("Lua error in {:?}: {}", path, e))?;

    Ok(())
}
