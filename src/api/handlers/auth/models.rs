//! Domain enums shared across the auth core.

/// Closed role set; stored as text names in the users table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Convert stored role names into the closed enum, dropping unknown names.
pub fn roles_from_names(names: &[String]) -> Vec<Role> {
    names.iter().filter_map(|name| Role::parse(name)).collect()
}

pub fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|role| role.as_str().to_string()).collect()
}

/// Business context of a verification code; codes are scoped per (email, scene).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scene {
    Register,
    ResetPassword,
}

impl Scene {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::ResetPassword => "reset_password",
        }
    }

    /// Missing or unknown scenes fall back to `register`, which is what
    /// existing clients rely on.
    #[must_use]
    pub fn from_request(scene: Option<&str>) -> Self {
        match scene.map(str::trim) {
            Some("reset_password") => Self::ResetPassword,
            _ => Self::Register,
        }
    }
}

/// Lifecycle state of a verification code record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeStatus {
    Pending,
    Consumed,
    Invalidated,
}

impl CodeStatus {
    pub(crate) const fn from_i16(value: i16) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Consumed,
            _ => Self::Invalidated,
        }
    }

    pub(crate) const fn as_i16(self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::Consumed => 1,
            Self::Invalidated => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_names() {
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("ROOT"), None);
        assert_eq!(Role::User.as_str(), "USER");
        assert_eq!(Role::Admin.as_str(), "ADMIN");
    }

    #[test]
    fn roles_from_names_drops_unknown() {
        let names = vec![
            "USER".to_string(),
            "ROOT".to_string(),
            "ADMIN".to_string(),
        ];
        assert_eq!(roles_from_names(&names), vec![Role::User, Role::Admin]);
    }

    #[test]
    fn role_names_preserve_order() {
        assert_eq!(
            role_names(&[Role::Admin, Role::User]),
            vec!["ADMIN".to_string(), "USER".to_string()]
        );
    }

    #[test]
    fn scene_from_request_defaults_to_register() {
        assert_eq!(Scene::from_request(None), Scene::Register);
        assert_eq!(Scene::from_request(Some("")), Scene::Register);
        assert_eq!(Scene::from_request(Some("register")), Scene::Register);
        assert_eq!(Scene::from_request(Some("unknown")), Scene::Register);
        assert_eq!(
            Scene::from_request(Some(" reset_password ")),
            Scene::ResetPassword
        );
    }

    #[test]
    fn code_status_round_trips() {
        for status in [
            CodeStatus::Pending,
            CodeStatus::Consumed,
            CodeStatus::Invalidated,
        ] {
            assert_eq!(CodeStatus::from_i16(status.as_i16()), status);
        }
        // Unknown values collapse to invalidated, never to pending.
        assert_eq!(CodeStatus::from_i16(9), CodeStatus::Invalidated);
    }
}
