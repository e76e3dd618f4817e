//! Localized user-visible message lookup (`spec.md` §7: "Localized
//! user-visible messages are looked up through a language-code table at
//! send-time; the core assumes the translation function is infallible
//! (falls back to the key)").

use block_types::LanguageCode;
use std::collections::HashMap;

pub struct MessageTable {
    tables: HashMap<LanguageCode, HashMap<&'static str, &'static str>>,
}

impl MessageTable {
    pub fn new() -> Self {
        let mut english = HashMap::new();
        english.insert("item.not_legit.pickup", "\tEAttempt to remove a non-legit item from the field.");
        english.insert("item.not_legit.drop_warn", "\tEA non-legit item was dropped by a player.");
        english.insert("gc.protected.chat_blocked", "\tEYour chat is currently disabled.");
        english.insert("guildcard.exchange.unsupported", "\tECannot exchange guild cards with this player's game version.");
        english.insert("word_select.partial_delivery", "\tESome players could not receive that message.");

        let mut tables = HashMap::new();
        tables.insert(LanguageCode::English, english);
        Self { tables }
    }

    /// Look up `key` in `lang`'s table; falls back to `key` itself when the
    /// language or key is missing, per the infallibility assumption above.
    pub fn get(&self, lang: LanguageCode, key: &str) -> String {
        self.tables
            .get(&lang)
            .and_then(|t| t.get(key))
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                self.tables
                    .get(&LanguageCode::English)
                    .and_then(|t| t.get(key))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| key.to_string())
            })
    }
}

impl Default for MessageTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_resolves() {
        let table = MessageTable::new();
        let msg = table.get(LanguageCode::English, "item.not_legit.pickup");
        assert!(msg.contains("non-legit"));
    }

    #[test]
    fn unknown_key_falls_back_to_itself() {
        let table = MessageTable::new();
        assert_eq!(table.get(LanguageCode::English, "no.such.key"), "no.such.key");
    }

    #[test]
    fn missing_language_falls_back_to_english() {
        let table = MessageTable::new();
        let msg = table.get(LanguageCode::Japanese, "item.not_legit.pickup");
        assert!(msg.contains("non-legit"));
    }
}
