pub mod audit;
pub mod registration_service;
pub mod team_verification;
