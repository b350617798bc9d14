//! Tournament registration domain: typed states, the eligibility rules and
//! the status state machine. Nothing in here touches the database; the
//! `snapshot` module loads the facts these functions decide on.

pub mod eligibility;
pub mod snapshot;
pub mod workflow;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A stored value that does not parse into its domain type. Surfaces as a
/// store error, never as a silently defaulted value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed {field}: {value:?}")]
pub struct MalformedRow {
    pub field: &'static str,
    pub value: String,
}

impl MalformedRow {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self { field, value: value.into() }
    }
}

impl From<MalformedRow> for clutch_shared::AppError {
    fn from(err: MalformedRow) -> Self {
        clutch_shared::AppError::internal(err.to_string())
    }
}

macro_rules! string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = MalformedRow;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(MalformedRow::new($field, other)),
                }
            }
        }
    };
}

string_enum!(TournamentStatus, "tournament status", {
    Upcoming => "upcoming",
    Ongoing => "ongoing",
    Completed => "completed",
});

string_enum!(TournamentType, "tournament type", {
    Solo => "solo",
    Team => "team",
});

string_enum!(RegistrationStatus, "registration status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

/// Who holds a registration. Exactly one of user or team, matching the
/// registration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Registrant {
    Solo(Uuid),
    Team(Uuid),
}

impl Registrant {
    pub fn registration_type(&self) -> TournamentType {
        match self {
            Registrant::Solo(_) => TournamentType::Solo,
            Registrant::Team(_) => TournamentType::Team,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Registrant::Solo(id) => Some(*id),
            Registrant::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            Registrant::Team(id) => Some(*id),
            Registrant::Solo(_) => None,
        }
    }

    /// Rebuild from the stored `(registration_type, user_id, team_id)` triple.
    pub fn from_columns(
        registration_type: &str,
        user_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> Result<Self, MalformedRow> {
        match (TournamentType::try_from(registration_type)?, user_id, team_id) {
            (TournamentType::Solo, Some(user), None) => Ok(Registrant::Solo(user)),
            (TournamentType::Team, None, Some(team)) => Ok(Registrant::Team(team)),
            _ => Err(MalformedRow::new("registrant", format!(
                "{registration_type} user={user_id:?} team={team_id:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_strictly() {
        assert_eq!(RegistrationStatus::try_from("approved"), Ok(RegistrationStatus::Approved));
        assert_eq!(TournamentStatus::try_from("upcoming"), Ok(TournamentStatus::Upcoming));

        let err = RegistrationStatus::try_from("Approved").unwrap_err();
        assert_eq!(err.field, "registration status");
        assert!(TournamentType::try_from("duo").is_err());
    }

    #[test]
    fn registrant_requires_exactly_one_side() {
        let user = Uuid::now_v7();
        let team = Uuid::now_v7();

        assert_eq!(
            Registrant::from_columns("solo", Some(user), None),
            Ok(Registrant::Solo(user))
        );
        assert_eq!(
            Registrant::from_columns("team", None, Some(team)),
            Ok(Registrant::Team(team))
        );
        assert!(Registrant::from_columns("solo", Some(user), Some(team)).is_err());
        assert!(Registrant::from_columns("team", Some(user), None).is_err());
        assert!(Registrant::from_columns("solo", None, None).is_err());
    }

    #[test]
    fn registrant_columns_match_type() {
        let team = Registrant::Team(Uuid::now_v7());
        assert_eq!(team.registration_type(), TournamentType::Team);
        assert!(team.user_id().is_none());
        assert!(team.team_id().is_some());
    }
}
