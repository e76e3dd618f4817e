//! Gateway packet type tags (`spec.md` §4.6). The original `shipgate.h`
//! defining the real `SHDR_TYPE_*` hex values was not present in the
//! retrieved source pack (only `src/shipgate.c`, which names them but
//! does not define them), so these are internal symbolic tags rather
//! than claimed-authentic wire values — same approach as
//! `block_subcommand::opcode`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketType {
    Ping = 0,
    Login = 1,
    LoginReply = 2,

    /// A forwarded legacy-variant client packet (DC/PC/BB carried as an
    /// opaque blob): three wire tags, one per carried variant family.
    ForwardDc = 10,
    ForwardPc = 11,
    ForwardBb = 12,

    CharDataRequest = 20,
    CharDataReply = 21,
    CharSaveRequest = 22,
    CharSaveReply = 23,
    CharBackupRequest = 24,

    UserLogin = 30,
    UserLoginReply = 31,
    BlockLogin = 32,
    BlockLogout = 33,
    BlockLoginError = 34,

    IpBanSet = 40,
    GcBanSet = 41,

    FriendAdd = 50,
    FriendDelete = 51,
    FriendAddReply = 52,
    FriendDeleteReply = 53,
    FriendLoginNotify = 54,
    FriendLogoutNotify = 55,
    FriendListRequest = 56,
    FriendListReply = 57,

    GuildCardSearchReply = 60,
    SimpleMail = 61,

    LobbyChange = 70,
    ClientCount = 71,
    ClientBurst = 72,
    Kick = 73,
    GlobalMessage = 74,

    UserOptionUpdate = 80,
    BbOptionRequest = 81,
    BbOptionReply = 82,
    BbOptionWrite = 83,

    ShipStatus = 90,
    CountPush = 91,

    QuestFlagGet = 100,
    QuestFlagSet = 101,
    QuestFlagDelete = 102,
    QuestFlagReply = 103,

    KillCountersSync = 110,
    ScriptDataEvent = 111,
    ScriptChunkPush = 112,

    ShipControl = 120,
    ShipControlReply = 121,
}

impl PacketType {
    pub fn from_u16(raw: u16) -> Option<Self> {
        use PacketType::*;
        let all = [
            Ping,
            Login,
            LoginReply,
            ForwardDc,
            ForwardPc,
            ForwardBb,
            CharDataRequest,
            CharDataReply,
            CharSaveRequest,
            CharSaveReply,
            CharBackupRequest,
            UserLogin,
            UserLoginReply,
            BlockLogin,
            BlockLogout,
            BlockLoginError,
            IpBanSet,
            GcBanSet,
            FriendAdd,
            FriendDelete,
            FriendAddReply,
            FriendDeleteReply,
            FriendLoginNotify,
            FriendLogoutNotify,
            FriendListRequest,
            FriendListReply,
            GuildCardSearchReply,
            SimpleMail,
            LobbyChange,
            ClientCount,
            ClientBurst,
            Kick,
            GlobalMessage,
            UserOptionUpdate,
            BbOptionRequest,
            BbOptionReply,
            BbOptionWrite,
            ShipStatus,
            CountPush,
            QuestFlagGet,
            QuestFlagSet,
            QuestFlagDelete,
            QuestFlagReply,
            KillCountersSync,
            ScriptDataEvent,
            ScriptChunkPush,
            ShipControl,
            ShipControlReply,
        ];
        all.into_iter().find(|p| *p as u16 == raw)
    }
}

/// Ship-control sub-actions carried in a `ShipControl` packet's body
/// (`spec.md` §4.6: "remote shutdown/restart with a minutes-until field,
/// plus version and uname reflectors").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipControlAction {
    Restart { minutes: u16 },
    Shutdown { minutes: u16 },
    Version,
    Uname,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u16_round_trips_every_variant() {
        assert_eq!(PacketType::from_u16(PacketType::Ping as u16), Some(PacketType::Ping));
        assert_eq!(
            PacketType::from_u16(PacketType::ShipControlReply as u16),
            Some(PacketType::ShipControlReply)
        );
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(PacketType::from_u16(0xFFFF), None);
    }
}
