//! Access gate for protected pages and the admin console.
//!
//! Every decision re-reads the caller's roles. A lookup that fails or does
//! not answer within the configured bound is treated exactly like a user
//! without the role.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use diesel::prelude::*;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::{AuthUser, Role};

use crate::db::{self, DbPool};
use crate::schema::user_roles;
use crate::AppState;

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles_for(&self, user_id: Uuid) -> AppResult<Vec<Role>>;
}

pub struct PgRoleStore {
    db: DbPool,
}

impl PgRoleStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn roles_for(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        db::run(&self.db, move |conn| {
            let labels: Vec<String> = user_roles::table
                .filter(user_roles::user_id.eq(user_id))
                .select(user_roles::role)
                .load(conn)?;
            labels
                .iter()
                .map(|l| Role::from_str(l).map_err(AppError::internal))
                .collect()
        })
        .await
    }
}

/// The role a page requires of its viewer. Roles do not imply each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability(pub Role);

impl Capability {
    pub const ADMIN: Capability = Capability(Role::Admin);

    pub fn satisfied_by(&self, roles: &[Role]) -> bool {
        roles.contains(&self.0)
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_str(s)
            .map(Capability)
            .map_err(|_| AppError::bad_request(format!("unknown capability: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Auth,
    Home,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Auth => "/auth",
            RedirectTarget::Home => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    Redirect(RedirectTarget),
}

impl Serialize for GateDecision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        match self {
            GateDecision::Admit => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("decision", "admit")?;
                map.end()
            }
            GateDecision::Redirect(target) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("decision", "redirect")?;
                map.serialize_entry("location", target.path())?;
                map.end()
            }
        }
    }
}

/// What a page shows while its guard runs. `Checking` is neither a grant
/// nor a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Settled(GateDecision),
}

#[derive(Clone)]
pub struct AccessGate {
    roles: Arc<dyn RoleStore>,
    timeout: Duration,
}

impl AccessGate {
    pub fn new(roles: Arc<dyn RoleStore>, timeout: Duration) -> Self {
        Self { roles, timeout }
    }

    pub fn roles(&self) -> &dyn RoleStore {
        self.roles.as_ref()
    }

    /// Decide for `user` against `capability`. Never mutates anything and
    /// never retries.
    pub async fn evaluate(&self, user: Option<Uuid>, capability: Capability) -> GateDecision {
        let Some(user_id) = user else {
            return GateDecision::Redirect(RedirectTarget::Auth);
        };

        let (decision, outcome) = match tokio::time::timeout(self.timeout, self.roles.roles_for(user_id)).await {
            Ok(Ok(roles)) if capability.satisfied_by(&roles) => (GateDecision::Admit, "admit"),
            Ok(Ok(_)) => (GateDecision::Redirect(RedirectTarget::Home), "missing_role"),
            Ok(Err(e)) => {
                tracing::warn!(%user_id, error = %e, "role lookup failed, denying");
                (GateDecision::Redirect(RedirectTarget::Home), "lookup_error")
            }
            Err(_) => {
                tracing::warn!(%user_id, timeout_ms = self.timeout.as_millis() as u64, "role lookup timed out, denying");
                (GateDecision::Redirect(RedirectTarget::Home), "timeout")
            }
        };
        metrics::counter!("access_gate_decisions_total", "outcome" => outcome).increment(1);
        decision
    }

    /// Start a check owned by a page. Dropping or cancelling the guard
    /// abandons the check before it can publish.
    pub fn guard(&self, user: Option<Uuid>, capability: Capability) -> PageGuard {
        let (tx, rx) = watch::channel(GateState::Checking);
        let cancel = CancellationToken::new();
        let gate = self.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("page guard cancelled before settling");
                }
                decision = gate.evaluate(user, capability) => {
                    if !token.is_cancelled() {
                        let _ = tx.send(GateState::Settled(decision));
                    }
                }
            }
        });

        PageGuard { state: rx, cancel }
    }
}

pub struct PageGuard {
    state: watch::Receiver<GateState>,
    cancel: CancellationToken,
}

impl PageGuard {
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Wait for the decision. `None` if the guard was torn down first.
    pub async fn settled(&self) -> Option<GateDecision> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| matches!(s, GateState::Settled(_)))
            .await
            .ok()
            .map(|s| *s)?;
        match state {
            GateState::Settled(decision) if !self.cancel.is_cancelled() => Some(decision),
            _ => None,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Caller holding the admin role, checked through the gate on every
/// request. No token is 401, a valid token without the role is 403.
pub struct StaffUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match state.gate.evaluate(Some(user.id), Capability::ADMIN).await {
            GateDecision::Admit => Ok(Self(user)),
            GateDecision::Redirect(RedirectTarget::Auth) => {
                Err(AppError::new(ErrorCode::Unauthorized, "sign in required"))
            }
            GateDecision::Redirect(RedirectTarget::Home) => {
                Err(AppError::new(ErrorCode::Forbidden, "admin access required"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRoles(Vec<Role>);

    #[async_trait]
    impl RoleStore for FixedRoles {
        async fn roles_for(&self, _user_id: Uuid) -> AppResult<Vec<Role>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRoles;

    #[async_trait]
    impl RoleStore for FailingRoles {
        async fn roles_for(&self, _user_id: Uuid) -> AppResult<Vec<Role>> {
            Err(AppError::internal("connection refused"))
        }
    }

    /// Never answers.
    struct HangingRoles;

    #[async_trait]
    impl RoleStore for HangingRoles {
        async fn roles_for(&self, _user_id: Uuid) -> AppResult<Vec<Role>> {
            std::future::pending().await
        }
    }

    struct CountingRoles(AtomicUsize);

    #[async_trait]
    impl RoleStore for CountingRoles {
        async fn roles_for(&self, _user_id: Uuid) -> AppResult<Vec<Role>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Role::User])
        }
    }

    fn gate(store: impl RoleStore + 'static) -> AccessGate {
        AccessGate::new(Arc::new(store), Duration::from_secs(5))
    }

    const HOME: GateDecision = GateDecision::Redirect(RedirectTarget::Home);
    const AUTH: GateDecision = GateDecision::Redirect(RedirectTarget::Auth);

    #[tokio::test]
    async fn anonymous_goes_to_auth() {
        let gate = gate(FixedRoles(vec![Role::Admin]));
        assert_eq!(gate.evaluate(None, Capability::ADMIN).await, AUTH);
    }

    #[tokio::test]
    async fn admin_is_admitted() {
        let gate = gate(FixedRoles(vec![Role::User, Role::Admin]));
        assert_eq!(gate.evaluate(Some(Uuid::now_v7()), Capability::ADMIN).await, GateDecision::Admit);
    }

    #[tokio::test]
    async fn moderator_is_not_admin() {
        let gate = gate(FixedRoles(vec![Role::Moderator]));
        let user = Some(Uuid::now_v7());
        assert_eq!(gate.evaluate(user, Capability::ADMIN).await, HOME);
        assert_eq!(gate.evaluate(user, Capability(Role::Moderator)).await, GateDecision::Admit);
    }

    #[tokio::test]
    async fn lookup_error_fails_closed() {
        let gate = gate(FailingRoles);
        assert_eq!(gate.evaluate(Some(Uuid::now_v7()), Capability::ADMIN).await, HOME);
    }

    #[tokio::test]
    async fn repeated_checks_agree_and_refetch() {
        let store = Arc::new(CountingRoles(AtomicUsize::new(0)));
        let gate = AccessGate::new(store.clone(), Duration::from_secs(5));
        let user = Some(Uuid::now_v7());

        let first = gate.evaluate(user, Capability::ADMIN).await;
        let second = gate.evaluate(user, Capability::ADMIN).await;
        assert_eq!(first, HOME);
        assert_eq!(first, second);
        assert_eq!(store.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_lookup_times_out_to_home() {
        let gate = gate(HangingRoles);
        let started = tokio::time::Instant::now();
        let decision = gate.evaluate(Some(Uuid::now_v7()), Capability::ADMIN).await;

        assert_eq!(decision, HOME);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn guard_reports_checking_until_settled() {
        let gate = gate(HangingRoles);
        let guard = gate.guard(Some(Uuid::now_v7()), Capability::ADMIN);
        assert_eq!(guard.state(), GateState::Checking);

        assert_eq!(guard.settled().await, Some(HOME));
        assert_eq!(guard.state(), GateState::Settled(HOME));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_guard_never_settles() {
        let gate = gate(HangingRoles);
        let guard = gate.guard(Some(Uuid::now_v7()), Capability::ADMIN);
        guard.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(guard.state(), GateState::Checking);
        assert_eq!(guard.settled().await, None);
    }

    #[test]
    fn capability_parsing() {
        assert_eq!("admin".parse::<Capability>().unwrap(), Capability::ADMIN);
        assert_eq!("moderator".parse::<Capability>().unwrap(), Capability(Role::Moderator));
        assert_eq!("user".parse::<Capability>().unwrap(), Capability(Role::User));
        assert!("owner".parse::<Capability>().is_err());
    }

    #[test]
    fn decision_json_shape() {
        assert_eq!(
            serde_json::to_value(GateDecision::Admit).unwrap(),
            serde_json::json!({ "decision": "admit" })
        );
        assert_eq!(
            serde_json::to_value(AUTH).unwrap(),
            serde_json::json!({ "decision": "redirect", "location": "/auth" })
        );
    }
}
