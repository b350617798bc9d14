//! Admin console. Every handler takes a `StaffUser`, so the access gate
//! runs on each request, and every mutation writes an `admin_actions` row.

pub mod audit_log;
pub mod partners;
pub mod recruitment;
pub mod registrations;
pub mod roster;
pub mod tournaments;
pub mod users;
pub mod verifications;
