//! Converts core-side hook arguments into the Lua table a hook function
//! receives (`spec.md` §9: "Each hook receives typed arguments").

use mlua::{Lua, Table, Value};

#[derive(Debug, Clone)]
pub enum HookValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl From<i64> for HookValue {
    fn from(v: i64) -> Self {
        HookValue::Int(v)
    }
}
impl From<u32> for HookValue {
    fn from(v: u32) -> Self {
        HookValue::Int(v as i64)
    }
}
impl From<u16> for HookValue {
    fn from(v: u16) -> Self {
        HookValue::Int(v as i64)
    }
}
impl From<u8> for HookValue {
    fn from(v: u8) -> Self {
        HookValue::Int(v as i64)
    }
}
impl From<f32> for HookValue {
    fn from(v: f32) -> Self {
        HookValue::Float(v as f64)
    }
}
impl From<&str> for HookValue {
    fn from(v: &str) -> Self {
        HookValue::Str(v.to_string())
    }
}
impl From<String> for HookValue {
    fn from(v: String) -> Self {
        HookValue::Str(v)
    }
}
impl From<bool> for HookValue {
    fn from(v: bool) -> Self {
        HookValue::Bool(v)
    }
}

/// The named-field payload passed to one hook invocation. Built by the
/// caller (a block's authority loop) from whatever state the fired hook
/// names in `spec.md` §9, e.g. `HookContext::new().field("client_id", id)`.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    fields: Vec<(&'static str, HookValue)>,
}

impl HookContext {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<HookValue>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub(crate) fn to_lua_table(&self, lua: &Lua) -> mlua::Result<Table> {
        let table = lua.create_table()?;
        for (name, value) in &self.fields {
            let lua_value = match value {
                HookValue::Int(v) => Value::Integer(*v),
                HookValue::Float(v) => Value::Number(*v),
                HookValue::Str(v) => Value::String(lua.create_string(v)?),
                HookValue::Bool(v) => Value::Boolean(*v),
            };
            table.set(*name, lua_value)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_with_mixed_field_types() {
        let lua = Lua::new();
        let ctx = HookContext::new()
            .field("client_id", 3u32)
            .field("name", "Ralph")
            .field("cancelled", false);
        let table = ctx.to_lua_table(&lua).unwrap();
        assert_eq!(table.get::<i64>("client_id").unwrap(), 3);
        assert_eq!(table.get::<String>("name").unwrap(), "Ralph");
        assert_eq!(table.get::<bool>("cancelled").unwrap(), false);
    }
}
