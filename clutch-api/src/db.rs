use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use clutch_shared::errors::{AppError, AppResult};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Check out a connection and run `f` on the blocking pool, so Diesel's
/// synchronous calls never stall the runtime's worker threads.
pub async fn run<F, T>(pool: &DbPool, f: F) -> AppResult<T>
where
    F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| AppError::internal(format!("db task failed: {e}")))?
}
