pub mod access;
pub mod admin;
pub mod health;
pub mod invitations;
pub mod my_teams;
pub mod partners;
pub mod profile;
pub mod registrations;
pub mod roster;
pub mod submissions;
pub mod tournaments;
