use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfessorId(pub i32);

impl Display for ProfessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Academic rank. Only [`Role::Ordinary`] counts towards the ordinary quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ordinary,
    Associate,
    Researcher,
    #[default]
    Unspecified,
}

impl Role {
    #[must_use]
    pub const fn is_ordinary(self) -> bool {
        matches!(self, Self::Ordinary)
    }

    /// Abbreviation used in the roster export. Unspecified roles have none.
    #[must_use]
    pub const fn abbreviation(self) -> Option<&'static str> {
        match self {
            Self::Ordinary => Some("PO"),
            Self::Associate => Some("PA"),
            Self::Researcher => Some("RIC"),
            Self::Unspecified => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::Associate => "associate",
            Self::Researcher => "researcher",
            Self::Unspecified => "unspecified",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Ordinary,
            Self::Associate,
            Self::Researcher,
            Self::Unspecified,
        ]
        .into_iter()
        .find(|role| role.as_str() == value)
    }
}

/// When a professor can sit in a commission.
///
/// `Split` is not a fixed availability: the roster export balances the
/// professor's own candidates between the two pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Morning,
    Afternoon,
    #[default]
    Always,
    Split,
}

impl Availability {
    #[must_use]
    pub const fn morning(self) -> bool {
        !matches!(self, Self::Afternoon)
    }

    #[must_use]
    pub const fn afternoon(self) -> bool {
        !matches!(self, Self::Morning)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Always => "always",
            Self::Split => "split",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Morning, Self::Afternoon, Self::Always, Self::Split]
            .into_iter()
            .find(|availability| availability.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: ProfessorId,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub availability: Availability,
}

impl Professor {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.surname, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_counts_as_both_pools() {
        assert!(Availability::Split.morning());
        assert!(Availability::Split.afternoon());
        assert!(Availability::Morning.morning());
        assert!(!Availability::Morning.afternoon());
        assert!(!Availability::Afternoon.morning());
    }

    #[test]
    fn roles_parse_from_their_names() {
        assert_eq!(Role::parse("ordinary"), Some(Role::Ordinary));
        assert_eq!(Role::parse("dean"), None);
        assert_eq!(Role::Unspecified.abbreviation(), None);
    }
}
