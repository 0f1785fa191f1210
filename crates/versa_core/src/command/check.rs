//! Permission checks run before a command.

use crate::RunMode;
use std::collections::HashSet;
use versa_error::{CommandError, CommandErrorKind};

/// Predicate a command requires to pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Check {
    /// Author owns the bot application (or is an accepted team member).
    IsOwner,
    /// Invoked inside a guild, not a direct message.
    GuildOnly,
    /// Bot runs in test mode.
    TestOnly,
    /// Author is an owner or a user flagged as staff.
    BotStaffOnly,
}

/// What checks are evaluated against.
#[derive(Debug, Clone)]
pub struct CheckInput<'a> {
    /// Message author
    pub author_id: u64,
    /// Whether the message came from a guild
    pub in_guild: bool,
    /// Current run mode
    pub mode: RunMode,
    /// Application owners
    pub owners: &'a HashSet<u64>,
    /// Whether the author's record has the staff flag
    pub author_is_staff: bool,
}

impl Check {
    /// Whether `input` satisfies this check.
    pub fn passes(&self, input: &CheckInput<'_>) -> bool {
        match self {
            Check::IsOwner => input.owners.contains(&input.author_id),
            Check::GuildOnly => input.in_guild,
            Check::TestOnly => input.mode.is_test(),
            Check::BotStaffOnly => {
                input.author_is_staff || input.owners.contains(&input.author_id)
            }
        }
    }
}

/// Run `checks` in order, failing on the first that does not pass.
#[track_caller]
pub fn run_checks(command: &str, checks: &[Check], input: &CheckInput<'_>) -> Result<(), CommandError> {
    match checks.iter().find(|check| !check.passes(input)) {
        Some(check) => Err(CommandError::new(CommandErrorKind::CheckFailed {
            command: command.to_string(),
            check: check.to_string(),
        })),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(author_id: u64, owners: &HashSet<u64>) -> CheckInput<'_> {
        CheckInput {
            author_id,
            in_guild: true,
            mode: RunMode::Production,
            owners,
            author_is_staff: false,
        }
    }

    #[test]
    fn test_owner_check() {
        let owners = HashSet::from([1]);
        assert!(Check::IsOwner.passes(&input(1, &owners)));
        assert!(!Check::IsOwner.passes(&input(2, &owners)));
    }

    #[test]
    fn test_staff_includes_owners() {
        let owners = HashSet::from([1]);
        assert!(Check::BotStaffOnly.passes(&input(1, &owners)));

        let mut staff = input(2, &owners);
        assert!(!Check::BotStaffOnly.passes(&staff));
        staff.author_is_staff = true;
        assert!(Check::BotStaffOnly.passes(&staff));
    }

    #[test]
    fn test_guild_and_test_only() {
        let owners = HashSet::new();
        let mut dm = input(1, &owners);
        dm.in_guild = false;
        assert!(!Check::GuildOnly.passes(&dm));
        assert!(!Check::TestOnly.passes(&dm));
        dm.mode = RunMode::Test;
        assert!(Check::TestOnly.passes(&dm));
    }

    #[test]
    fn test_first_failing_check_is_reported() {
        let owners = HashSet::new();
        let err = run_checks(
            "set_prefixes",
            &[Check::GuildOnly, Check::IsOwner],
            &input(5, &owners),
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            CommandErrorKind::CheckFailed {
                command: "set_prefixes".to_string(),
                check: "is_owner".to_string(),
            }
        );
    }
}
