//! Persists the [`FormSchema`] as two JSON documents in the settings table.

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::de::DeserializeOwned;

use crate::{
    feedback::form_schema::{
        Field, FormSchema, SchemaEditError, Section, default_fields,
        default_sections,
    },
    settings::Setting,
};

pub const SECTIONS_KEY: &str = "feedback_sections";
pub const FIELDS_KEY: &str = "feedback_fields";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("`{0}` has not been saved yet")]
    NotFound(&'static str),
    #[error("`{name}` does not hold a valid document: {source}")]
    Parse {
        name: &'static str,
        source: serde_json::Error,
    },
    #[error("could not serialize `{name}`: {source}")]
    Serialize {
        name: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] SchemaEditError),
    #[error("could not write the form configuration: {0}")]
    Store(#[from] diesel::result::Error),
}

/// A set of settings writes which should be applied together.
pub trait ConfigTransaction {
    fn stage(&mut self, key: &'static str, value: String, description: &'static str);

    fn commit(self) -> Result<(), ConfigError>;
}

/// Applies the staged writes inside one SQLite transaction (a savepoint when
/// the connection is already inside the request transaction), so either every
/// document changes or none does.
pub struct SqliteConfigTransaction<'c, C> {
    conn: &'c mut C,
    staged: Vec<(&'static str, String, &'static str)>,
}

impl<'c, C> SqliteConfigTransaction<'c, C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    pub fn new(conn: &'c mut C) -> Self {
        Self {
            conn,
            staged: Vec::new(),
        }
    }
}

impl<C> ConfigTransaction for SqliteConfigTransaction<'_, C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    fn stage(&mut self, key: &'static str, value: String, description: &'static str) {
        self.staged.push((key, value, description));
    }

    fn commit(self) -> Result<(), ConfigError> {
        let staged = self.staged;
        self.conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                for (key, value, description) in &staged {
                    Setting::upsert(key, value, Some(*description), conn)?;
                }
                Ok(())
            })
            .map_err(|e| {
                tracing::error!(
                    "form configuration save rolled back, neither document written: {e}"
                );
                ConfigError::Store(e)
            })
    }
}

pub fn load_raw(
    name: &'static str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<String, ConfigError> {
    match Setting::fetch(name, conn)? {
        Some(setting) => Ok(setting.value),
        None => Err(ConfigError::NotFound(name)),
    }
}

pub fn parse_document<T: DeserializeOwned>(
    name: &'static str,
    raw: &str,
) -> Result<Vec<T>, ConfigError> {
    serde_json::from_str(raw).map_err(|source| ConfigError::Parse { name, source })
}

fn load_document<T: DeserializeOwned>(
    name: &'static str,
    fallback: fn() -> Vec<T>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<T>> {
    let parsed = load_raw(name, conn).and_then(|raw| parse_document(name, &raw));
    match parsed {
        Ok(items) => Ok(items),
        Err(ConfigError::Store(e)) => Err(e),
        Err(ConfigError::NotFound(_)) => {
            tracing::debug!("`{name}` not configured, using the default");
            Ok(fallback())
        }
        Err(e) => {
            tracing::warn!("{e}; using the default instead");
            Ok(fallback())
        }
    }
}

/// Loads the saved form. A missing or unreadable document is replaced by the
/// built-in default; only database failures are returned.
pub fn load_schema(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<FormSchema> {
    let sections: Vec<Section> = load_document(SECTIONS_KEY, default_sections, conn)?;
    let fields: Vec<Field> = load_document(FIELDS_KEY, default_fields, conn)?;

    let mut schema = FormSchema { sections, fields };
    if schema.enforce_invariants() {
        tracing::warn!(
            "stored form configuration had the overall section disabled, optional or missing"
        );
    }
    Ok(schema)
}

/// Saves both documents through `tx`. The display order of every item is
/// first re-derived from its position in the lists. Returns the schema as it
/// was written.
pub fn save_schema(
    schema: &FormSchema,
    mut tx: impl ConfigTransaction,
) -> Result<FormSchema, ConfigError> {
    let mut schema = schema.clone();
    schema.enforce_invariants();
    schema.check_unique_keys()?;
    schema.reassign_display_order();

    let sections = serde_json::to_string(&schema.sections).map_err(|source| {
        ConfigError::Serialize {
            name: SECTIONS_KEY,
            source,
        }
    })?;
    let fields = serde_json::to_string(&schema.fields).map_err(|source| {
        ConfigError::Serialize {
            name: FIELDS_KEY,
            source,
        }
    })?;

    tx.stage(SECTIONS_KEY, sections, "Feedback form sections");
    tx.stage(FIELDS_KEY, fields, "Feedback form personal detail fields");
    tx.commit()?;

    tracing::info!(
        sections = schema.sections.len(),
        fields = schema.fields.len(),
        "saved feedback form configuration"
    );
    Ok(schema)
}
