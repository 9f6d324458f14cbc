//! Command implementations.

pub mod auth;
pub mod config;
pub mod init;
pub mod run;
pub mod tools;
