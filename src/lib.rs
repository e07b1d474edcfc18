use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod app_config;
pub mod auth;
pub mod config;
pub mod feedback;
pub mod form;
pub mod schema;
pub mod settings;
pub mod state;
pub mod template;
pub mod util_resp;
pub mod widgets;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
