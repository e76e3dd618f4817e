//! Ban-list persistence (`spec.md` §3, §6). The file is "owned by an
//! out-of-scope loader" per §6, but the core adds, sweeps, and rewrites it
//! when mutated, so the serialization boundary is in scope. `spec.md`
//! specifies an XML document with a named DTD; `quick-xml`'s serde
//! integration round-trips the shape without a bespoke parser.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

const DOCTYPE: &str = r#"<!DOCTYPE banlist SYSTEM "banlist.dtd">"#;

/// -1 (stored as `i64::MIN`-free sentinel `-1`) means "forever".
pub const FOREVER: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildCardBan {
    pub banned_gc: u32,
    pub set_by: u32,
    pub start_time: i64,
    pub end_time: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpBan {
    pub is_ipv6: bool,
    pub address: [u32; 4],
    pub netmask: [u32; 4],
    pub set_by: u32,
    pub start_time: i64,
    pub end_time: i64,
    pub reason: String,
}

impl IpBan {
    /// Whether `addr` falls within this ban's (address, netmask) range.
    pub fn matches(&self, addr: IpAddr) -> bool {
        let words = match addr {
            IpAddr::V4(v4) if !self.is_ipv6 => {
                let octets = v4.octets();
                [u32::from_be_bytes(octets), 0, 0, 0]
            }
            IpAddr::V6(v6) if self.is_ipv6 => {
                let segments = v6.segments();
                [
                    ((segments[0] as u32) << 16) | segments[1] as u32,
                    ((segments[2] as u32) << 16) | segments[3] as u32,
                    ((segments[4] as u32) << 16) | segments[5] as u32,
                    ((segments[6] as u32) << 16) | segments[7] as u32,
                ]
            }
            _ => return false,
        };
        words
            .iter()
            .zip(self.address.iter())
            .zip(self.netmask.iter())
            .all(|((w, a), m)| w & m == a & m)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "banlist")]
struct BanListDocument {
    #[serde(rename = "guildcard_ban", default)]
    guildcard_bans: Vec<GuildCardBan>,
    #[serde(rename = "ip_ban", default)]
    ip_bans: Vec<IpBan>,
}

/// Two disjoint ban sets under one read/write-lockable structure at the
/// caller's discretion (`spec.md` §3: "Both lists live under one
/// reader/writer lock"). This type itself is the guarded payload; callers
/// wrap it in `Arc<RwLock<BanList>>`.
#[derive(Debug, Default)]
pub struct BanList {
    guildcard_bans: Vec<GuildCardBan>,
    ip_bans: Vec<IpBan>,
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let xml = std::fs::read_to_string(path)?;
        let doc: BanListDocument = quick_xml::de::from_str(&xml)?;
        Ok(Self {
            guildcard_bans: doc.guildcard_bans,
            ip_bans: doc.ip_bans,
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let doc = BanListDocument {
            guildcard_bans: self.guildcard_bans.clone(),
            ip_bans: self.ip_bans.clone(),
        };
        let body = quick_xml::se::to_string(&doc)?;
        let full = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{DOCTYPE}\n{body}\n");
        std::fs::write(path, full)?;
        Ok(())
    }

    pub fn ban_guildcard(&mut self, ban: GuildCardBan) {
        self.guildcard_bans.retain(|b| b.banned_gc != ban.banned_gc);
        self.guildcard_bans.push(ban);
    }

    pub fn lift_guildcard_ban(&mut self, gc: u32) -> bool {
        let before = self.guildcard_bans.len();
        self.guildcard_bans.retain(|b| b.banned_gc != gc);
        self.guildcard_bans.len() != before
    }

    pub fn ban_ip(&mut self, ban: IpBan) {
        self.ip_bans.push(ban);
    }

    pub fn is_guildcard_banned(&self, gc: u32, now: i64) -> Option<&GuildCardBan> {
        self.guildcard_bans
            .iter()
            .find(|b| b.banned_gc == gc && (b.end_time == FOREVER || b.end_time > now))
    }

    pub fn is_ip_banned(&self, addr: IpAddr, now: i64) -> Option<&IpBan> {
        self.ip_bans
            .iter()
            .find(|b| b.matches(addr) && (b.end_time == FOREVER || b.end_time > now))
    }

    /// Drop every ban whose `end_time` has passed. Run on the 24-hour sweep
    /// cadence (`spec.md` §5).
    pub fn sweep(&mut self, now: i64) -> usize {
        let before = self.guildcard_bans.len() + self.ip_bans.len();
        self.guildcard_bans
            .retain(|b| b.end_time == FOREVER || b.end_time > now);
        self.ip_bans
            .retain(|b| b.end_time == FOREVER || b.end_time > now);
        before - (self.guildcard_bans.len() + self.ip_bans.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gc_ban(gc: u32, end: i64) -> GuildCardBan {
        GuildCardBan {
            banned_gc: gc,
            set_by: 1,
            start_time: 0,
            end_time: end,
            reason: "test".into(),
        }
    }

    #[test]
    fn forever_ban_never_expires() {
        let mut list = BanList::new();
        list.ban_guildcard(sample_gc_ban(42, FOREVER));
        assert!(list.is_guildcard_banned(42, i64::MAX / 2).is_some());
        assert_eq!(list.sweep(i64::MAX / 2), 0);
    }

    #[test]
    fn expired_ban_is_swept() {
        let mut list = BanList::new();
        list.ban_guildcard(sample_gc_ban(7, 100));
        assert!(list.is_guildcard_banned(7, 50).is_some());
        assert!(list.is_guildcard_banned(7, 150).is_none());
        assert_eq!(list.sweep(150), 1);
        assert!(list.is_guildcard_banned(7, 150).is_none());
    }

    #[test]
    fn rebanning_replaces_existing_entry() {
        let mut list = BanList::new();
        list.ban_guildcard(sample_gc_ban(7, 100));
        list.ban_guildcard(sample_gc_ban(7, FOREVER));
        assert_eq!(list.guildcard_bans.len(), 1);
        assert!(list.is_guildcard_banned(7, i64::MAX / 2).is_some());
    }

    #[test]
    fn lift_ban_removes_entry() {
        let mut list = BanList::new();
        list.ban_guildcard(sample_gc_ban(9, FOREVER));
        assert!(list.lift_guildcard_ban(9));
        assert!(list.is_guildcard_banned(9, 0).is_none());
        assert!(!list.lift_guildcard_ban(9));
    }

    #[test]
    fn ip_ban_matches_netmask() {
        let ban = IpBan {
            is_ipv6: false,
            address: [0xC0A80000, 0, 0, 0],
            netmask: [0xFFFF0000, 0, 0, 0],
            set_by: 1,
            start_time: 0,
            end_time: FOREVER,
            reason: "subnet".into(),
        };
        assert!(ban.matches("192.168.5.5".parse().unwrap()));
        assert!(!ban.matches("192.169.5.5".parse().unwrap()));
    }
}
