//! Script-chunk push handling (`spec.md` §4.6): "validates a 32-bit CRC
//! against an expected local file; if it matches, no network use;
//! otherwise downloads a new chunk, persists it, optionally registers a
//! script event hook."

use crc32fast::Hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptChunkDecision {
    /// The local copy's CRC already matches; nothing to fetch or write.
    UpToDate,
    /// The local copy is missing or stale; fetch the chunk named by the
    /// push and persist it under this path.
    FetchAndPersist,
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn decide(local_crc: Option<u32>, pushed_crc: u32) -> ScriptChunkDecision {
    match local_crc {
        Some(crc) if crc == pushed_crc => ScriptChunkDecision::UpToDate,
        _ => ScriptChunkDecision::FetchAndPersist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_crc_is_up_to_date() {
        let data = b"quest script contents";
        let crc = crc32(data);
        assert_eq!(decide(Some(crc), crc), ScriptChunkDecision::UpToDate);
    }

    #[test]
    fn mismatched_or_missing_crc_triggers_fetch() {
        assert_eq!(decide(Some(1), 2), ScriptChunkDecision::FetchAndPersist);
        assert_eq!(decide(None, 2), ScriptChunkDecision::FetchAndPersist);
    }
}
