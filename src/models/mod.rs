pub mod admin;
pub mod auth;
pub mod common;
pub mod ledger;
pub mod user;
