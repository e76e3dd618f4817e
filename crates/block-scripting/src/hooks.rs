//! The fixed scripting hook surface (`spec.md` §9 "Scripting bridge").
//!
//! Unlike a general mod-loader, the core only ever fires one of these named
//! events; there is no discovery of arbitrary script-defined event names.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Startup,
    Shutdown,
    ClientShipLogin,
    ClientShipLogout,
    ClientBlockLogin,
    ClientBlockLogout,
    UnknownShipPacket,
    UnknownBlockPacket,
    UnknownEp3Packet,
    TeamCreate,
    TeamDestroy,
    TeamJoin,
    TeamLeave,
    EnemyHit,
    EnemyKill,
    BoxBreak,
    UnknownCommand,
    SData,
    UnknownMenu,
    BankAction,
    ChangeArea,
    QuestSyncRegister,
    QuestLoad,
    BeforeQuestLoad,
}

impl Hook {
    /// All hooks, in the order `spec.md` lists them.
    pub const ALL: [Hook; 24] = [
        Hook::Startup,
        Hook::Shutdown,
        Hook::ClientShipLogin,
        Hook::ClientShipLogout,
        Hook::ClientBlockLogin,
        Hook::ClientBlockLogout,
        Hook::UnknownShipPacket,
        Hook::UnknownBlockPacket,
        Hook::UnknownEp3Packet,
        Hook::TeamCreate,
        Hook::TeamDestroy,
        Hook::TeamJoin,
        Hook::TeamLeave,
        Hook::EnemyHit,
        Hook::EnemyKill,
        Hook::BoxBreak,
        Hook::UnknownCommand,
        Hook::SData,
        Hook::UnknownMenu,
        Hook::BankAction,
        Hook::ChangeArea,
        Hook::QuestSyncRegister,
        Hook::QuestLoad,
        Hook::BeforeQuestLoad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Hook::Startup => "Startup",
            Hook::Shutdown => "Shutdown",
            Hook::ClientShipLogin => "ClientShipLogin",
            Hook::ClientShipLogout => "ClientShipLogout",
            Hook::ClientBlockLogin => "ClientBlockLogin",
            Hook::ClientBlockLogout => "ClientBlockLogout",
            Hook::UnknownShipPacket => "UnknownShipPacket",
            Hook::UnknownBlockPacket => "UnknownBlockPacket",
            Hook::UnknownEp3Packet => "UnknownEp3Packet",
            Hook::TeamCreate => "TeamCreate",
            Hook::TeamDestroy => "TeamDestroy",
            Hook::TeamJoin => "TeamJoin",
            Hook::TeamLeave => "TeamLeave",
            Hook::EnemyHit => "EnemyHit",
            Hook::EnemyKill => "EnemyKill",
            Hook::BoxBreak => "BoxBreak",
            Hook::UnknownCommand => "UnknownCommand",
            Hook::SData => "SData",
            Hook::UnknownMenu => "UnknownMenu",
            Hook::BankAction => "BankAction",
            Hook::ChangeArea => "ChangeArea",
            Hook::QuestSyncRegister => "QuestSyncRegister",
            Hook::QuestLoad => "QuestLoad",
            Hook::BeforeQuestLoad => "BeforeQuestLoad",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_from_name() {
        for hook in Hook::ALL {
            assert_eq!(Hook::from_name(hook.name()), Some(hook));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Hook::from_name("NotAHook"), None);
    }
}
