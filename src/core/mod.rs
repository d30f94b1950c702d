//! Configuration, shared data types, and caller authorization

pub mod auth;
pub mod config;
pub mod models;
