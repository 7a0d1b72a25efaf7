use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    Passenger = 0,
    Driver = 1,
    Operator = 2,
    Admin = 3,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            Passenger => "passenger",
            Driver => "driver",
            Operator => "operator",
            Admin => "admin",
        }
    }

    #[inline]
    pub const fn from_id(id: i16) -> Option<Self> {
        use UserRole::*;
        match id {
            0 => Some(Passenger),
            1 => Some(Driver),
            2 => Some(Operator),
            3 => Some(Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_id() {
        assert_eq!(UserRole::from_id(0), Some(UserRole::Passenger));
        assert_eq!(UserRole::from_id(1), Some(UserRole::Driver));
        assert_eq!(UserRole::from_id(2), Some(UserRole::Operator));
        assert_eq!(UserRole::from_id(3), Some(UserRole::Admin));
        assert_eq!(UserRole::from_id(4), None);
    }

    #[test]
    fn test_user_role_display_matches_serde() {
        for role in [
            UserRole::Passenger,
            UserRole::Driver,
            UserRole::Operator,
            UserRole::Admin,
        ] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(UserRole::from_id(role.id()), Some(role));
        }
    }
}
