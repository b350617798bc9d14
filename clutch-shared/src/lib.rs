pub mod types;
pub mod errors;
pub mod middleware;
pub mod validation;

pub use types::*;
pub use errors::{AppError, ErrorCode, AppResult};
