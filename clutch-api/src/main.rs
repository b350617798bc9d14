use axum::routing::{delete, get, post, put};
use axum::Router;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod gate;
mod models;
mod registration;
mod routes;
mod schema;
mod services;

use clutch_shared::middleware::{metrics_middleware, JwtSecret};
use config::AppConfig;
use db::DbPool;
use gate::{AccessGate, PgRoleStore};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub gate: AccessGate,
    pub metrics: PrometheusHandle,
}

impl JwtSecret for AppState {
    fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clutch_shared::middleware::init_tracing("clutch-api");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = clutch_shared::middleware::init_metrics("clutch-api")?;

    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let db = Pool::builder().max_size(config.db_pool_size).build(manager)?;

    let gate = AccessGate::new(
        Arc::new(PgRoleStore::new(db.clone())),
        config.role_check_timeout(),
    );

    let state = Arc::new(AppState { db, config, gate, metrics });

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "clutch-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/tournaments", post(routes::admin::tournaments::create_tournament))
        .route(
            "/tournaments/:id",
            put(routes::admin::tournaments::update_tournament)
                .delete(routes::admin::tournaments::delete_tournament),
        )
        .route("/registrations", get(routes::admin::registrations::list_registrations))
        .route("/registrations/:id", delete(routes::admin::registrations::delete_registration))
        .route("/registrations/:id/status", put(routes::admin::registrations::update_status))
        .route("/teams", post(routes::admin::roster::create_team))
        .route(
            "/teams/:id",
            put(routes::admin::roster::update_team).delete(routes::admin::roster::delete_team),
        )
        .route("/players", post(routes::admin::roster::create_player))
        .route(
            "/players/:id",
            put(routes::admin::roster::update_player).delete(routes::admin::roster::delete_player),
        )
        .route("/partners", post(routes::admin::partners::create_partner))
        .route(
            "/partners/:id",
            put(routes::admin::partners::update_partner).delete(routes::admin::partners::delete_partner),
        )
        .route("/recruitment", get(routes::admin::recruitment::list_applications))
        .route("/recruitment/:id", delete(routes::admin::recruitment::delete_application))
        .route("/recruitment/:id/status", put(routes::admin::recruitment::update_application))
        .route("/verifications", get(routes::admin::verifications::list_profiles))
        .route("/verifications/:user_id", put(routes::admin::verifications::set_verification))
        .route("/users", get(routes::admin::users::list_users))
        .route("/users/:id", delete(routes::admin::users::delete_user))
        .route("/users/:id/roles", post(routes::admin::users::add_role))
        .route("/users/:id/roles/:role", delete(routes::admin::users::remove_role))
        .route("/audit-log", get(routes::admin::audit_log::list_actions));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Site
        .route("/api/tournaments", get(routes::tournaments::list_tournaments))
        .route("/api/tournaments/:id", get(routes::tournaments::get_tournament))
        .route("/api/tournaments/:id/eligibility", get(routes::tournaments::get_eligibility))
        .route("/api/tournaments/:id/registrations", post(routes::tournaments::submit_registration))
        .route("/api/registrations/mine", get(routes::registrations::my_registrations))
        .route("/api/registrations/:id/withdraw", post(routes::registrations::withdraw))
        .route("/api/teams", get(routes::roster::list_teams))
        .route("/api/teams/:id", get(routes::roster::get_team))
        .route("/api/players/:id", get(routes::roster::get_player))
        .route("/api/partners", get(routes::partners::list_partners))
        .route("/api/recruitment", post(routes::submissions::apply))
        .route("/api/contact", post(routes::submissions::contact))
        .route("/api/access/:capability", get(routes::access::check_access))
        .route(
            "/api/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        // Captain area
        .route(
            "/api/my-teams",
            get(routes::my_teams::list_my_teams).post(routes::my_teams::create_team),
        )
        .route("/api/my-teams/:id/members", get(routes::my_teams::list_members))
        .route("/api/my-teams/:id/members/:member_id", delete(routes::my_teams::remove_member))
        .route("/api/my-teams/:id/invitations", post(routes::my_teams::invite_member))
        .route("/api/invitations", get(routes::invitations::list_invitations))
        .route("/api/invitations/:id/respond", post(routes::invitations::respond))
        .nest("/api/admin", admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use clutch_shared::errors::AppResult;
    use clutch_shared::middleware::encode_token;
    use clutch_shared::types::auth::{Claims, Role};
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FixedRoles(Vec<Role>);

    #[async_trait::async_trait]
    impl gate::RoleStore for FixedRoles {
        async fn roles_for(&self, _user_id: Uuid) -> AppResult<Vec<Role>> {
            Ok(self.0.clone())
        }
    }

    /// State whose pool never connects; only routes that stop at the gate
    /// are exercised.
    fn state(roles: Vec<Role>) -> Arc<AppState> {
        let config = AppConfig::default();
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost:1/unused");
        let db = Pool::builder().min_idle(Some(0)).build_unchecked(manager);
        let gate = AccessGate::new(Arc::new(FixedRoles(roles)), Duration::from_secs(1));
        let metrics = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        Arc::new(AppState { db, config, gate, metrics })
    }

    fn bearer(state: &AppState) -> String {
        let claims = Claims::new(Uuid::now_v7(), "player@clutch.gg", 3600);
        let token = encode_token(&claims, &state.config.jwt_secret).unwrap();
        format!("Bearer {token}")
    }

    async fn call(state: Arc<AppState>, uri: &str, auth: Option<String>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(auth) = auth {
            request = request.header("Authorization", auth);
        }
        send(state, request.body(Body::empty()).unwrap()).await
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn anonymous_page_check_redirects_to_auth() {
        let (status, json) = call(state(vec![Role::Admin]), "/api/access/admin", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], serde_json::json!({ "decision": "redirect", "location": "/auth" }));
    }

    #[tokio::test]
    async fn admin_page_check_admits() {
        let state = state(vec![Role::User, Role::Admin]);
        let auth = bearer(&state);
        let (_, json) = call(state, "/api/access/admin", Some(auth)).await;
        assert_eq!(json["data"]["decision"], "admit");
    }

    #[tokio::test]
    async fn unknown_capability_is_bad_request() {
        let (status, json) = call(state(vec![]), "/api/access/owner", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn console_requires_a_token() {
        let (status, json) = call(state(vec![Role::Admin]), "/api/admin/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "E1005");
    }

    #[tokio::test]
    async fn console_rejects_non_admins_before_touching_the_store() {
        let state = state(vec![Role::Moderator]);
        let auth = bearer(&state);
        let (status, json) = call(state, "/api/admin/audit-log", Some(auth)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "E0005");
    }

    #[tokio::test]
    async fn registration_with_malformed_team_id_is_rejected_before_the_store() {
        let state = state(vec![Role::User]);
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/tournaments/{}/registrations", Uuid::now_v7()))
            .header("Authorization", bearer(&state))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"team_id":"not-a-uuid"}"#))
            .unwrap();

        let (status, json) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "E0002");
        assert!(json["error"]["details"]["body"].is_array());
    }
}
