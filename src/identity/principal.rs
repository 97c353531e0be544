use serde::{Deserialize, Serialize};

/// Closed set of account roles. Every identity carries exactly one; the
/// claimed role at login must equal the stored one, and routing is a total
/// match over these variants so a new role cannot silently misroute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Organizer,
}

impl Role {
    /// Exact, case-sensitive parse of the wire form ("student", "admin",
    /// "organizer"). Anything else is outside the closed set.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            "organizer" => Some(Role::Organizer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Organizer => "organizer",
        }
    }

    /// Landing surface after a successful login. No fallthrough arm: adding
    /// a role without routing it is a compile error, not a misroute.
    pub fn destination(self) -> Destination {
        match self {
            Role::Student => Destination::StudentHome,
            Role::Admin | Role::Organizer => Destination::AdminHome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    StudentHome,
    AdminHome,
}

impl Destination {
    pub fn path(self) -> &'static str {
        match self {
            Destination::StudentHome => "/dashboard/student",
            Destination::AdminHome => "/dashboard/admin",
        }
    }
}

/// Session-facing projection of an identity: what the session manager binds
/// and what `/me` reports. Never carries the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub username: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_the_three_wire_forms_only() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("organizer"), Some(Role::Organizer));
        // case-sensitive, closed set
        assert_eq!(Role::parse("Student"), None);
        assert_eq!(Role::parse("management"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn destination_table_matches_roles() {
        assert_eq!(Role::Student.destination(), Destination::StudentHome);
        assert_eq!(Role::Admin.destination(), Destination::AdminHome);
        assert_eq!(Role::Organizer.destination(), Destination::AdminHome);
        assert_eq!(Destination::StudentHome.path(), "/dashboard/student");
        assert_eq!(Destination::AdminHome.path(), "/dashboard/admin");
    }
}
