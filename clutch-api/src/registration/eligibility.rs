use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Registrant, RegistrationStatus, TournamentStatus, TournamentType};

#[derive(Debug, Clone)]
pub struct TournamentFacts {
    pub id: Uuid,
    pub game: String,
    pub kind: TournamentType,
    pub status: TournamentStatus,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
}

/// A team the caller captains, with its derived verification flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptainedTeam {
    pub id: Uuid,
    pub name: String,
    pub game: String,
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingRegistration {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub registrant: Registrant,
}

/// Everything the rules look at, loaded up front.
#[derive(Debug, Clone)]
pub struct EligibilityInput {
    pub user_id: Option<Uuid>,
    pub profile_verified: bool,
    pub tournament: TournamentFacts,
    /// All teams the caller captains, any game.
    pub captained_teams: Vec<CaptainedTeam>,
    /// Registrations on this tournament held by the caller or any team they captain.
    pub existing: Vec<ExistingRegistration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "registration_type", rename_all = "lowercase")]
pub enum Offer {
    Solo,
    Team { candidates: Vec<CaptainedTeam> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Reason {
    SignInRequired,
    NotVerified,
    RegistrationClosed,
    WindowNotOpen { opens_at: DateTime<Utc> },
    WindowClosed { closed_at: DateTime<Utc> },
    AlreadyRegistered { registration_id: Uuid, status: RegistrationStatus },
    NoTeamForGame { game: String },
    TeamNotVerified,
}

impl Reason {
    pub fn message(&self) -> String {
        match self {
            Reason::SignInRequired => "Sign in to register for this tournament".into(),
            Reason::NotVerified => "Your account must be verified before registering".into(),
            Reason::RegistrationClosed => "Registration is closed for this tournament".into(),
            Reason::WindowNotOpen { opens_at } => format!("Registration is not yet open (opens {opens_at})"),
            Reason::WindowClosed { .. } => "Registration period has ended".into(),
            Reason::AlreadyRegistered { status, .. } => format!("Already registered (status: {status})"),
            Reason::NoTeamForGame { game } => format!("Create a verified team for {game} to register"),
            Reason::TeamNotVerified => "Your team must be verified before registering".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible(Offer),
    Ineligible(Reason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }
}

/// Apply the registration rules in order; the first failing rule decides.
pub fn evaluate(input: &EligibilityInput, now: DateTime<Utc>) -> Eligibility {
    use Eligibility::Ineligible;

    if input.user_id.is_none() {
        return Ineligible(Reason::SignInRequired);
    }
    if !input.profile_verified {
        return Ineligible(Reason::NotVerified);
    }

    let tournament = &input.tournament;
    if tournament.status != TournamentStatus::Upcoming {
        return Ineligible(Reason::RegistrationClosed);
    }

    // The window only applies when both bounds are set.
    if let (Some(start), Some(end)) = (tournament.registration_start, tournament.registration_end) {
        if now < start {
            return Ineligible(Reason::WindowNotOpen { opens_at: start });
        }
        if now > end {
            return Ineligible(Reason::WindowClosed { closed_at: end });
        }
    }

    // Any prior registration blocks, including rejected and withdrawn ones.
    if let Some(existing) = input.existing.first() {
        return Ineligible(Reason::AlreadyRegistered {
            registration_id: existing.id,
            status: existing.status,
        });
    }

    match tournament.kind {
        TournamentType::Solo => Eligibility::Eligible(Offer::Solo),
        TournamentType::Team => team_offer(&input.captained_teams, &tournament.game),
    }
}

fn team_offer(captained: &[CaptainedTeam], game: &str) -> Eligibility {
    let for_game: Vec<&CaptainedTeam> = captained.iter().filter(|t| t.game == game).collect();
    if for_game.is_empty() {
        return Eligibility::Ineligible(Reason::NoTeamForGame { game: game.to_string() });
    }

    let candidates: Vec<CaptainedTeam> = for_game
        .into_iter()
        .filter(|t| t.is_verified)
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Eligibility::Ineligible(Reason::TeamNotVerified);
    }

    Eligibility::Eligible(Offer::Team { candidates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tournament(kind: TournamentType) -> TournamentFacts {
        TournamentFacts {
            id: Uuid::now_v7(),
            game: "Valorant".into(),
            kind,
            status: TournamentStatus::Upcoming,
            registration_start: None,
            registration_end: None,
        }
    }

    fn verified_user(kind: TournamentType) -> EligibilityInput {
        EligibilityInput {
            user_id: Some(Uuid::now_v7()),
            profile_verified: true,
            tournament: tournament(kind),
            captained_teams: vec![],
            existing: vec![],
        }
    }

    fn team(game: &str, is_verified: bool) -> CaptainedTeam {
        CaptainedTeam {
            id: Uuid::now_v7(),
            name: "Night Owls".into(),
            game: game.into(),
            is_verified,
        }
    }

    #[test]
    fn anonymous_must_sign_in() {
        let mut input = verified_user(TournamentType::Solo);
        input.user_id = None;
        input.profile_verified = false;
        assert_eq!(evaluate(&input, Utc::now()), Eligibility::Ineligible(Reason::SignInRequired));
    }

    #[test]
    fn unverified_user_is_blocked() {
        let mut input = verified_user(TournamentType::Solo);
        input.profile_verified = false;
        assert_eq!(evaluate(&input, Utc::now()), Eligibility::Ineligible(Reason::NotVerified));
    }

    #[test]
    fn verified_solo_user_is_eligible() {
        let input = verified_user(TournamentType::Solo);
        assert_eq!(evaluate(&input, Utc::now()), Eligibility::Eligible(Offer::Solo));
    }

    #[test]
    fn only_upcoming_tournaments_accept_registrations() {
        for status in [TournamentStatus::Ongoing, TournamentStatus::Completed] {
            let mut input = verified_user(TournamentType::Solo);
            input.tournament.status = status;
            assert_eq!(
                evaluate(&input, Utc::now()),
                Eligibility::Ineligible(Reason::RegistrationClosed)
            );
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        let mut input = verified_user(TournamentType::Solo);
        input.tournament.registration_start = Some(now);
        input.tournament.registration_end = Some(now + Duration::days(1));
        assert!(evaluate(&input, now).is_eligible());
        assert!(evaluate(&input, now + Duration::days(1)).is_eligible());

        assert_eq!(
            evaluate(&input, now - Duration::seconds(1)),
            Eligibility::Ineligible(Reason::WindowNotOpen { opens_at: now })
        );
        assert!(matches!(
            evaluate(&input, now + Duration::days(2)),
            Eligibility::Ineligible(Reason::WindowClosed { .. })
        ));
    }

    #[test]
    fn half_open_window_is_ignored() {
        let now = Utc::now();
        let mut input = verified_user(TournamentType::Solo);
        input.tournament.registration_end = Some(now - Duration::days(3));
        assert!(evaluate(&input, now).is_eligible());
    }

    #[test]
    fn existing_registration_blocks_with_its_status() {
        for status in [RegistrationStatus::Pending, RegistrationStatus::Rejected] {
            let mut input = verified_user(TournamentType::Solo);
            let id = Uuid::now_v7();
            input.existing.push(ExistingRegistration {
                id,
                status,
                registrant: Registrant::Solo(input.user_id.unwrap()),
            });
            assert_eq!(
                evaluate(&input, Utc::now()),
                Eligibility::Ineligible(Reason::AlreadyRegistered { registration_id: id, status })
            );
        }
    }

    #[test]
    fn team_tournament_without_team_for_game() {
        let mut input = verified_user(TournamentType::Team);
        input.captained_teams.push(team("Dota 2", true));
        assert_eq!(
            evaluate(&input, Utc::now()),
            Eligibility::Ineligible(Reason::NoTeamForGame { game: "Valorant".into() })
        );
    }

    #[test]
    fn unverified_team_then_verified() {
        let mut input = verified_user(TournamentType::Team);
        input.captained_teams.push(team("Valorant", false));
        assert_eq!(evaluate(&input, Utc::now()), Eligibility::Ineligible(Reason::TeamNotVerified));

        input.captained_teams[0].is_verified = true;
        match evaluate(&input, Utc::now()) {
            Eligibility::Eligible(Offer::Team { candidates }) => {
                assert_eq!(candidates, vec![input.captained_teams[0].clone()]);
            }
            other => panic!("expected team offer, got {other:?}"),
        }
    }

    #[test]
    fn every_verified_team_for_the_game_is_a_candidate() {
        let mut input = verified_user(TournamentType::Team);
        input.captained_teams = vec![
            team("Valorant", true),
            team("Valorant", false),
            team("Valorant", true),
            team("CS:GO", true),
        ];
        match evaluate(&input, Utc::now()) {
            Eligibility::Eligible(Offer::Team { candidates }) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates.iter().all(|t| t.is_verified && t.game == "Valorant"));
            }
            other => panic!("expected team offer, got {other:?}"),
        }
    }

    #[test]
    fn first_failing_rule_wins() {
        let mut input = verified_user(TournamentType::Team);
        input.profile_verified = false;
        input.tournament.status = TournamentStatus::Completed;
        assert_eq!(evaluate(&input, Utc::now()), Eligibility::Ineligible(Reason::NotVerified));
    }

    #[test]
    fn reason_serializes_with_tag() {
        let json = serde_json::to_value(Reason::TeamNotVerified).unwrap();
        assert_eq!(json["reason"], "team_not_verified");
    }
}
