use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use clutch_shared::errors::AppResult;

use crate::models::NewAdminAction;
use crate::schema::admin_actions;

/// Append one row to the console's audit trail. Call it inside the same
/// transaction as the mutation it describes.
pub fn record(
    conn: &mut PgConnection,
    admin_id: Uuid,
    action: &str,
    target_id: Option<Uuid>,
    details: serde_json::Value,
) -> AppResult<()> {
    diesel::insert_into(admin_actions::table)
        .values(&NewAdminAction {
            admin_id,
            action,
            target_id,
            details: Some(details),
        })
        .execute(conn)?;

    tracing::info!(%admin_id, action, target_id = ?target_id, "admin action recorded");
    Ok(())
}
