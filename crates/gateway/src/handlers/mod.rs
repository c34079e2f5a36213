//! Request handlers

pub mod health;
pub mod outline;
pub mod reports;
