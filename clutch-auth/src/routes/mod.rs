pub mod health;
pub mod login;
pub mod me;
pub mod register;
