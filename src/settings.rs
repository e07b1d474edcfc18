//! The generic key/value settings table.
//!
//! Several unrelated features share this table and are separated only by
//! their keys. Absence of a row is distinct from a row whose value is the
//! empty string.

use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};

use crate::schema::settings;

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = settings, primary_key(key))]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl Setting {
    pub fn fetch(
        key: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Setting>> {
        settings::table
            .find(key)
            .select(Setting::as_select())
            .first(conn)
            .optional()
    }

    /// Inserts the entry, or replaces the value (and description) of an
    /// existing entry with the same key.
    pub fn upsert(
        key: &str,
        value: &str,
        description: Option<&str>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<()> {
        let now = Utc::now().naive_utc();
        diesel::insert_into(settings::table)
            .values(Setting {
                key: key.to_string(),
                value: value.to_string(),
                description: description.map(str::to_string),
                updated_at: now,
            })
            .on_conflict(settings::key)
            .do_update()
            .set((
                settings::value.eq(value),
                settings::description.eq(description),
                settings::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::{Setting, test_support::memory_conn};

    #[test]
    fn missing_and_empty_are_distinct() {
        let mut conn = memory_conn();

        assert!(Setting::fetch("results_password", &mut conn).unwrap().is_none());

        Setting::upsert("results_password", "", None, &mut conn).unwrap();
        let stored = Setting::fetch("results_password", &mut conn).unwrap().unwrap();
        assert_eq!(stored.value, "");
    }

    #[test]
    fn upsert_replaces_by_key_only() {
        let mut conn = memory_conn();

        Setting::upsert("live_stream_url", "https://a", Some("stream"), &mut conn)
            .unwrap();
        Setting::upsert("results_password", "abc", None, &mut conn).unwrap();
        Setting::upsert("live_stream_url", "https://b", Some("stream"), &mut conn)
            .unwrap();

        let stream = Setting::fetch("live_stream_url", &mut conn).unwrap().unwrap();
        assert_eq!(stream.value, "https://b");
        assert_eq!(stream.description.as_deref(), Some("stream"));
        let code = Setting::fetch("results_password", &mut conn).unwrap().unwrap();
        assert_eq!(code.value, "abc");
    }
}
