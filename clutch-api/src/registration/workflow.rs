use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use clutch_shared::errors::{AppError, ErrorCode};

use super::eligibility::{Eligibility, Offer, Reason};
use super::{Registrant, RegistrationStatus};

/// Status changes a registration can go through after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Approve,
    Reject,
    Withdraw,
}

impl Transition {
    pub fn target(self) -> RegistrationStatus {
        match self {
            Transition::Approve => RegistrationStatus::Approved,
            Transition::Reject => RegistrationStatus::Rejected,
            Transition::Withdraw => RegistrationStatus::Withdrawn,
        }
    }

    /// Statuses the transition may start from. Nothing re-enters `pending`.
    pub fn sources(self) -> &'static [RegistrationStatus] {
        match self {
            Transition::Approve | Transition::Reject => &[RegistrationStatus::Pending],
            Transition::Withdraw => &[RegistrationStatus::Pending, RegistrationStatus::Approved],
        }
    }

    pub fn source_strs(self) -> Vec<&'static str> {
        self.sources().iter().map(|s| s.as_str()).collect()
    }

    pub fn audit_action(self) -> &'static str {
        match self {
            Transition::Approve => "approve_registration",
            Transition::Reject => "reject_registration",
            Transition::Withdraw => "withdraw_registration",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {transition:?} a registration that is {from}")]
pub struct InvalidTransition {
    pub transition: Transition,
    pub from: RegistrationStatus,
}

pub fn apply(from: RegistrationStatus, transition: Transition) -> Result<RegistrationStatus, InvalidTransition> {
    if transition.sources().contains(&from) {
        Ok(transition.target())
    } else {
        Err(InvalidTransition { transition, from })
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::new(
            ErrorCode::InvalidTransition,
            format!("registration is already {}", err.from),
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{}", .0.message())]
    Ineligible(Reason),
    #[error("select one of your verified teams to register")]
    TeamSelectionRequired,
    #[error("team {0} is not one of your verified teams for this game")]
    TeamNotCandidate(Uuid),
    #[error("solo tournaments do not take a team")]
    UnexpectedTeam,
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        let message = err.to_string();
        match err {
            SubmitError::Ineligible(Reason::AlreadyRegistered { registration_id, status }) => {
                AppError::with_details(
                    ErrorCode::AlreadyRegistered,
                    message,
                    serde_json::json!({ "registration_id": registration_id, "status": status }),
                )
            }
            SubmitError::Ineligible(Reason::SignInRequired) => {
                AppError::new(ErrorCode::Unauthorized, message)
            }
            SubmitError::Ineligible(reason) => AppError::with_details(
                ErrorCode::NotEligible,
                message,
                serde_json::to_value(&reason).unwrap_or_default(),
            ),
            SubmitError::TeamSelectionRequired | SubmitError::TeamNotCandidate(_) => {
                AppError::new(ErrorCode::TeamSelectionRequired, message)
            }
            SubmitError::UnexpectedTeam => AppError::bad_request(message),
        }
    }
}

/// Decide who the new registration belongs to. Team tournaments need an
/// explicit pick among the verified candidates.
pub fn plan_submission(
    eligibility: &Eligibility,
    user_id: Uuid,
    requested_team: Option<Uuid>,
) -> Result<Registrant, SubmitError> {
    match eligibility {
        Eligibility::Ineligible(reason) => Err(SubmitError::Ineligible(reason.clone())),
        Eligibility::Eligible(Offer::Solo) => match requested_team {
            None => Ok(Registrant::Solo(user_id)),
            Some(_) => Err(SubmitError::UnexpectedTeam),
        },
        Eligibility::Eligible(Offer::Team { candidates }) => {
            let team_id = requested_team.ok_or(SubmitError::TeamSelectionRequired)?;
            if candidates.iter().any(|t| t.id == team_id) {
                Ok(Registrant::Team(team_id))
            } else {
                Err(SubmitError::TeamNotCandidate(team_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::eligibility::CaptainedTeam;
    use crate::registration::RegistrationStatus::*;

    #[test]
    fn approve_and_reject_only_from_pending() {
        assert_eq!(apply(Pending, Transition::Approve), Ok(Approved));
        assert_eq!(apply(Pending, Transition::Reject), Ok(Rejected));

        for from in [Approved, Rejected, Withdrawn] {
            assert!(apply(from, Transition::Approve).is_err());
            assert!(apply(from, Transition::Reject).is_err());
        }
    }

    #[test]
    fn second_approve_fails() {
        let approved = apply(Pending, Transition::Approve).unwrap();
        let err = apply(approved, Transition::Approve).unwrap_err();
        assert_eq!(err, InvalidTransition { transition: Transition::Approve, from: Approved });
        assert_eq!(AppError::from(err).code(), ErrorCode::InvalidTransition);
    }

    #[test]
    fn withdraw_from_pending_or_approved() {
        assert_eq!(apply(Pending, Transition::Withdraw), Ok(Withdrawn));
        assert_eq!(apply(Approved, Transition::Withdraw), Ok(Withdrawn));
        assert!(apply(Rejected, Transition::Withdraw).is_err());
        assert!(apply(Withdrawn, Transition::Withdraw).is_err());
    }

    #[test]
    fn no_transition_targets_pending() {
        for t in [Transition::Approve, Transition::Reject, Transition::Withdraw] {
            assert_ne!(t.target(), Pending);
        }
    }

    #[test]
    fn solo_submission_belongs_to_caller() {
        let user = Uuid::now_v7();
        let eligible = Eligibility::Eligible(Offer::Solo);
        assert_eq!(plan_submission(&eligible, user, None), Ok(Registrant::Solo(user)));
        assert_eq!(
            plan_submission(&eligible, user, Some(Uuid::now_v7())),
            Err(SubmitError::UnexpectedTeam)
        );
    }

    #[test]
    fn team_submission_needs_explicit_candidate() {
        let team = CaptainedTeam {
            id: Uuid::now_v7(),
            name: "Night Owls".into(),
            game: "Valorant".into(),
            is_verified: true,
        };
        let eligible = Eligibility::Eligible(Offer::Team { candidates: vec![team.clone()] });
        let user = Uuid::now_v7();

        assert_eq!(plan_submission(&eligible, user, None), Err(SubmitError::TeamSelectionRequired));
        let stranger = Uuid::now_v7();
        assert_eq!(
            plan_submission(&eligible, user, Some(stranger)),
            Err(SubmitError::TeamNotCandidate(stranger))
        );
        assert_eq!(plan_submission(&eligible, user, Some(team.id)), Ok(Registrant::Team(team.id)));
    }

    #[test]
    fn ineligible_submission_maps_to_status_codes() {
        let not_verified = plan_submission(
            &Eligibility::Ineligible(Reason::NotVerified),
            Uuid::now_v7(),
            None,
        )
        .unwrap_err();
        assert_eq!(AppError::from(not_verified).code(), ErrorCode::NotEligible);

        let existing = SubmitError::Ineligible(Reason::AlreadyRegistered {
            registration_id: Uuid::now_v7(),
            status: Pending,
        });
        assert_eq!(AppError::from(existing).code(), ErrorCode::AlreadyRegistered);
    }
}
