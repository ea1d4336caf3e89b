//! Seating connected agents and dealing out roles.
//!
//! A roster is the list of connections a session starts with. Roles are
//! dealt by expanding the quota into one role per seat, shuffling, and
//! pairing with the roster in order. Seat indices are assigned later by
//! [`Game::new`](crate::game::Game::new) in roster order, starting at 1.

use rand::Rng;
use rand::seq::SliceRandom;
use werewolf_types::{Role, Settings};

/// Errors raised while dealing roles.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// The roster does not have one connection per quota seat.
    #[error("roster has {actual} connections but the role quota seats {expected}")]
    SizeMismatch {
        /// Seats in the quota.
        expected: u32,
        /// Connections supplied.
        actual: usize,
    },
}

/// One connected agent waiting for a seat.
#[derive(Debug)]
pub struct RosterEntry<T> {
    /// The name the agent gave in its handshake.
    pub name: String,
    /// Team name derived from the agent name.
    pub team: String,
    /// The agent's connection.
    pub transport: T,
}

impl<T> RosterEntry<T> {
    /// Create an entry, deriving the team from the name.
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        let name = name.into();
        let team = team_name(&name).to_owned();
        Self {
            name,
            team,
            transport,
        }
    }
}

/// A roster entry with its dealt role.
#[derive(Debug)]
pub struct Assignment<T> {
    /// The connection.
    pub entry: RosterEntry<T>,
    /// The role it plays.
    pub role: Role,
}

/// The team an agent plays for: its name without trailing digits, so
/// `kanolab1` and `kanolab2` are the same team.
pub fn team_name(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Deal one role per entry according to the quota.
///
/// # Errors
///
/// Returns [`RosterError::SizeMismatch`] if the entry count differs from
/// the quota's seat count.
pub fn assign_roles<T, R: Rng + ?Sized>(
    entries: Vec<RosterEntry<T>>,
    settings: &Settings,
    rng: &mut R,
) -> Result<Vec<Assignment<T>>, RosterError> {
    let mut roles: Vec<Role> = settings
        .role_num_map
        .iter()
        .flat_map(|(role, count)| (0..*count).map(move |_| *role))
        .collect();
    if roles.len() != entries.len() {
        return Err(RosterError::SizeMismatch {
            expected: settings.agent_count(),
            actual: entries.len(),
        });
    }
    roles.shuffle(rng);

    Ok(entries
        .into_iter()
        .zip(roles)
        .map(|(entry, role)| Assignment { entry, role })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn team_strips_trailing_digits_only() {
        assert_eq!(team_name("kanolab12"), "kanolab");
        assert_eq!(team_name("team7a"), "team7a");
        assert_eq!(team_name("42"), "");
        assert_eq!(RosterEntry::new("wolfpack3", ()).team, "wolfpack");
    }

    #[test]
    fn roles_follow_the_quota() {
        let settings = GameConfig {
            agent_count: 13,
            ..GameConfig::default()
        }
        .to_settings()
        .unwrap();
        let entries = (0..13)
            .map(|i| RosterEntry::new(format!("team{i}"), ()))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let dealt = assign_roles(entries, &settings, &mut rng).unwrap();

        let mut counts: BTreeMap<Role, u32> = BTreeMap::new();
        for a in &dealt {
            *counts.entry(a.role).or_default() += 1;
        }
        assert_eq!(counts, settings.role_num_map);
        assert_eq!(dealt[0].entry.name, "team0");
    }

    #[test]
    fn wrong_roster_size_is_rejected() {
        let settings = GameConfig::default().to_settings().unwrap();
        let entries = vec![RosterEntry::new("solo", ())];
        let mut rng = StdRng::seed_from_u64(1);
        let err = assign_roles(entries, &settings, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            RosterError::SizeMismatch {
                expected: 5,
                actual: 1
            }
        ));
    }
}
