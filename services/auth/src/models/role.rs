//! Role model and the privilege ranking between roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    SystemAdmin,
    RegistrarOfficer,
    TranscriptOfficer,
}

/// A role string outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every role, highest privilege first
    pub const ALL: [Role; 5] = [
        Role::SystemAdmin,
        Role::RegistrarOfficer,
        Role::TranscriptOfficer,
        Role::Teacher,
        Role::Student,
    ];

    /// Storage and wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::SystemAdmin => "system_admin",
            Role::RegistrarOfficer => "registrar_officer",
            Role::TranscriptOfficer => "transcript_officer",
        }
    }

    /// Position in the privilege order; larger is more privileged
    pub fn rank(self) -> u8 {
        match self {
            Role::SystemAdmin => 5,
            Role::RegistrarOfficer => 4,
            Role::TranscriptOfficer => 3,
            Role::Teacher => 2,
            Role::Student => 1,
        }
    }

    /// Landing page a freshly logged-in user is sent to
    pub fn home_path(self) -> &'static str {
        match self {
            Role::Student => "/portal/student",
            Role::Teacher => "/portal/teacher",
            Role::SystemAdmin => "/portal/admin",
            Role::RegistrarOfficer => "/portal/registrar",
            Role::TranscriptOfficer => "/portal/transcript",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
