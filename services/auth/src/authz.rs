//! Role checks for protected entry points
//!
//! Most pages gate on an exact role. The hierarchy check is available for
//! "at least this privileged" call sites but is not the default.

use crate::models::Role;

/// True iff `actual` ranks at or above `required`
pub fn satisfies(actual: Role, required: Role) -> bool {
    actual.rank() >= required.rank()
}

/// Role requirement attached to a protected entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Only this role
    Exactly(Role),
    /// This role or any more privileged one
    AtLeast(Role),
    /// Any role in the list
    AnyOf(&'static [Role]),
}

impl Requirement {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Requirement::Exactly(required) => role == *required,
            Requirement::AtLeast(required) => satisfies(role, *required),
            Requirement::AnyOf(roles) => roles.contains(&role),
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requirement::Exactly(role) => write!(f, "role {}", role),
            Requirement::AtLeast(role) => write!(f, "role at least {}", role),
            Requirement::AnyOf(roles) => {
                let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                write!(f, "one of [{}]", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_is_a_total_order() {
        for (i, higher) in Role::ALL.iter().enumerate() {
            assert!(satisfies(*higher, *higher));
            for lower in &Role::ALL[i + 1..] {
                assert!(satisfies(*higher, *lower), "{higher} should satisfy {lower}");
                assert!(!satisfies(*lower, *higher), "{lower} should not satisfy {higher}");
            }
        }
    }

    #[test]
    fn test_exact_match_ignores_rank() {
        let teacher_page = Requirement::Exactly(Role::Teacher);
        assert!(teacher_page.permits(Role::Teacher));
        assert!(!teacher_page.permits(Role::SystemAdmin));
        assert!(!teacher_page.permits(Role::Student));

        let registrar_page = Requirement::Exactly(Role::RegistrarOfficer);
        assert!(!registrar_page.permits(Role::Teacher));
    }

    #[test]
    fn test_at_least_and_any_of() {
        assert!(Requirement::AtLeast(Role::Teacher).permits(Role::TranscriptOfficer));
        assert!(!Requirement::AtLeast(Role::Teacher).permits(Role::Student));

        const OFFICERS: &[Role] = &[Role::RegistrarOfficer, Role::TranscriptOfficer];
        assert!(Requirement::AnyOf(OFFICERS).permits(Role::TranscriptOfficer));
        assert!(!Requirement::AnyOf(OFFICERS).permits(Role::SystemAdmin));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Requirement::Exactly(Role::Teacher).to_string(),
            "role teacher"
        );
        assert_eq!(
            Requirement::AnyOf(&[Role::Student, Role::Teacher]).to_string(),
            "one of [student, teacher]"
        );
    }
}
