//! API handlers module

pub mod auth;
pub mod chat;
pub mod contacts;
pub mod eligibility;
pub mod health;
pub mod notices;
pub mod sources;
