//! Pages only available to admins.

pub mod access;
pub mod config;
pub mod export;
pub mod table;
