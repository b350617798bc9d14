use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::db::{self, DbPool};
use crate::models::{NewRegistration, Registration};
use crate::registration::eligibility::{self, Eligibility};
use crate::registration::workflow::{self, InvalidTransition, Transition};
use crate::registration::{snapshot, Registrant, RegistrationStatus};
use crate::schema::{teams_competitive, tournament_registrations, users};
use crate::services::audit;

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy)]
pub enum Actor {
    Staff(Uuid),
    Registrant(Uuid),
}

pub async fn check(pool: &DbPool, tournament_id: Uuid, user_id: Option<Uuid>) -> AppResult<Eligibility> {
    let (_, input) = snapshot::load(pool, tournament_id, user_id).await?;
    let outcome = eligibility::evaluate(&input, Utc::now());
    tracing::debug!(
        tournament_id = %input.tournament.id,
        user_id = ?user_id,
        eligible = matches!(outcome, Eligibility::Eligible(_)),
        "eligibility evaluated"
    );
    Ok(outcome)
}

/// Create a `pending` registration if the caller is eligible right now.
pub async fn submit(
    pool: &DbPool,
    tournament_id: Uuid,
    user_id: Uuid,
    team_id: Option<Uuid>,
) -> AppResult<Registration> {
    let outcome = check(pool, tournament_id, Some(user_id)).await?;
    let registrant = workflow::plan_submission(&outcome, user_id, team_id)?;

    let registration = db::run(pool, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| insert_pending(conn, tournament_id, user_id, registrant))
    })
    .await?;

    metrics::counter!(
        "registrations_submitted_total",
        "registration_type" => registrant.registration_type().as_str()
    )
    .increment(1);
    tracing::info!(
        registration_id = %registration.id,
        %tournament_id,
        %user_id,
        registration_type = %registration.registration_type,
        "registration submitted"
    );
    Ok(registration)
}

/// Insert under a row lock on the submitting user. Concurrent submissions
/// by the same caller queue on the lock, and each re-reads the caller's
/// registrations on this tournament before writing, so a captain cannot
/// land two entries through different teams.
fn insert_pending(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    user_id: Uuid,
    registrant: Registrant,
) -> AppResult<Registration> {
    users::table
        .find(user_id)
        .select(users::id)
        .for_update()
        .first::<Uuid>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(existing) = snapshot::existing_registrations(conn, tournament_id, user_id)?.first() {
        return Err(already_registered(existing.status));
    }

    diesel::insert_into(tournament_registrations::table)
        .values(&NewRegistration::pending(tournament_id, registrant))
        .returning(Registration::as_returning())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                already_registered(RegistrationStatus::Pending)
            }
            other => AppError::Database(other),
        })
}

fn already_registered(status: RegistrationStatus) -> AppError {
    AppError::new(
        ErrorCode::AlreadyRegistered,
        format!("Already registered for this tournament (status: {status})"),
    )
}

/// Move a registration along the state machine. The write is a single
/// conditional update, so two racing transitions cannot both succeed.
pub async fn transition(
    pool: &DbPool,
    registration_id: Uuid,
    transition: Transition,
    actor: Actor,
) -> AppResult<Registration> {
    let updated = db::run(pool, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let current = find(conn, registration_id)?;

            if let Actor::Registrant(user_id) = actor {
                ensure_registrant(conn, &current, user_id)?;
            }
            workflow::apply(current.status()?, transition)?;

            let updated = diesel::update(
                tournament_registrations::table
                    .find(registration_id)
                    .filter(tournament_registrations::status.eq_any(transition.source_strs())),
            )
            .set((
                tournament_registrations::status.eq(transition.target().as_str()),
                tournament_registrations::updated_at.eq(Utc::now()),
            ))
            .returning(Registration::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(updated) = updated else {
                let from = find(conn, registration_id)?.status()?;
                return Err(InvalidTransition { transition, from }.into());
            };

            if let Actor::Staff(admin_id) = actor {
                audit::record(
                    conn,
                    admin_id,
                    transition.audit_action(),
                    Some(registration_id),
                    serde_json::json!({
                        "tournament_id": updated.tournament_id,
                        "from": current.status,
                        "to": updated.status,
                    }),
                )?;
            }
            Ok(updated)
        })
    })
    .await?;

    metrics::counter!("registration_transitions_total", "to" => transition.target().as_str()).increment(1);
    tracing::info!(
        %registration_id,
        tournament_id = %updated.tournament_id,
        status = %updated.status,
        "registration transitioned"
    );
    Ok(updated)
}

pub async fn delete(pool: &DbPool, registration_id: Uuid, admin_id: Uuid) -> AppResult<()> {
    db::run(pool, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let removed = diesel::delete(tournament_registrations::table.find(registration_id))
                .returning(Registration::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;

            audit::record(
                conn,
                admin_id,
                "delete_registration",
                Some(registration_id),
                serde_json::json!({
                    "tournament_id": removed.tournament_id,
                    "status": removed.status,
                }),
            )
        })
    })
    .await?;

    tracing::info!(%registration_id, %admin_id, "registration deleted");
    Ok(())
}

fn find(conn: &mut PgConnection, registration_id: Uuid) -> AppResult<Registration> {
    tournament_registrations::table
        .find(registration_id)
        .select(Registration::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(not_found)
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::RegistrationNotFound, "Registration not found")
}

/// Solo registrations belong to their user, team registrations to the
/// team's current captain.
fn ensure_registrant(conn: &mut PgConnection, registration: &Registration, user_id: Uuid) -> AppResult<()> {
    let owns = match registration.registrant()? {
        Registrant::Solo(owner) => owner == user_id,
        Registrant::Team(team_id) => {
            let captain: Option<Uuid> = teams_competitive::table
                .find(team_id)
                .select(teams_competitive::captain_id)
                .first(conn)
                .optional()?;
            captain == Some(user_id)
        }
    };

    if owns {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorCode::NotRegistrant,
            "Only the registrant can withdraw this registration",
        ))
    }
}

/// Registrations visible to `user_id`: their solo entries plus those of
/// teams they captain.
pub async fn list_for_user(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Registration>> {
    db::run(pool, move |conn| {
        let captained = teams_competitive::table
            .filter(teams_competitive::captain_id.eq(user_id))
            .select(teams_competitive::id.nullable());

        let rows = tournament_registrations::table
            .filter(
                tournament_registrations::user_id
                    .eq(user_id)
                    .or(tournament_registrations::team_id.eq_any(captained)),
            )
            .order(tournament_registrations::created_at.desc())
            .select(Registration::as_select())
            .load(conn)?;
        Ok(rows)
    })
    .await
}

pub fn parse_status_filter(status: Option<&str>) -> AppResult<Option<RegistrationStatus>> {
    status
        .map(|s| {
            RegistrationStatus::try_from(s)
                .map_err(|_| AppError::bad_request(format!("unknown registration status: {s}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_registered_names_the_blocking_status() {
        let err = already_registered(RegistrationStatus::Rejected);
        assert_eq!(err.code(), ErrorCode::AlreadyRegistered);
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn status_filter_is_typed() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("pending")).unwrap(),
            Some(RegistrationStatus::Pending)
        );
        assert_eq!(
            parse_status_filter(Some("done")).unwrap_err().code(),
            ErrorCode::BadRequest
        );
    }
}
