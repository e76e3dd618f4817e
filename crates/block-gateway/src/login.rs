//! The gateway login handshake (`spec.md` §4.6): "the gateway sends a
//! login challenge (version-bearing); the ship replies with a
//! registration packet ...; the gateway responds with success or one of
//! several failure codes."

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginChallenge {
    pub gateway_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipRegistration {
    pub name: String,
    pub ipv4: std::net::Ipv4Addr,
    pub ipv6: Option<std::net::Ipv6Addr>,
    pub base_port: u16,
    pub client_count: u16,
    pub team_count: u16,
    pub menu_code: u16,
    pub privileges: u32,
    pub proto_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    BadProto,
    BadKey,
    BadMenu,
    InvalidMenu,
    InternalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    Failure(LoginFailure),
}

/// The ship's registration is rejected before it is ever sent to the
/// gateway when these locally-checkable preconditions fail, saving a
/// round trip for a response the gateway would reject anyway.
pub fn validate_registration(reg: &ShipRegistration, expected_proto_version: u32) -> Option<LoginFailure> {
    if reg.proto_version != expected_proto_version {
        return Some(LoginFailure::BadProto);
    }
    if reg.name.is_empty() || reg.name.len() > 64 {
        return Some(LoginFailure::InvalidMenu);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_proto_version_is_rejected_locally() {
        let reg = ShipRegistration {
            name: "Ship01".into(),
            ipv4: std::net::Ipv4Addr::new(127, 0, 0, 1),
            ipv6: None,
            base_port: 5000,
            client_count: 0,
            team_count: 0,
            menu_code: 0,
            privileges: 0,
            proto_version: 1,
        };
        assert_eq!(validate_registration(&reg, 2), Some(LoginFailure::BadProto));
    }

    #[test]
    fn valid_registration_passes_local_checks() {
        let reg = ShipRegistration {
            name: "Ship01".into(),
            ipv4: std::net::Ipv4Addr::new(127, 0, 0, 1),
            ipv6: None,
            base_port: 5000,
            client_count: 0,
            team_count: 0,
            menu_code: 0,
            privileges: 0,
            proto_version: 2,
        };
        assert_eq!(validate_registration(&reg, 2), None);
    }
}
