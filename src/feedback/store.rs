//! Append-only storage of [`Feedback`] records.
//!
//! Anyone may append. Reading the table back in bulk requires a
//! [`ReadGrant`], which can only be obtained by being signed in as an admin
//! or by passing the results access gate.

use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use uuid::Uuid;

use crate::{
    auth::User,
    feedback::{Feedback, validate::NewFeedback},
    schema::feedback,
};

/// Proof that the holder may read every stored record.
#[derive(Debug)]
pub struct ReadGrant {
    _sealed: (),
}

impl ReadGrant {
    pub fn for_admin<const TX: bool>(_user: &User<TX>) -> Self {
        ReadGrant { _sealed: () }
    }

    /// Issued by the access gate after the shared code has been checked.
    pub(super) fn for_access_code() -> Self {
        ReadGrant { _sealed: () }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        ReadGrant { _sealed: () }
    }
}

/// The store's own message is what the submitter gets to see.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("{0}")]
    Database(#[from] diesel::result::Error),
    #[error("could not encode the custom answers: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Somewhere a validated submission can be written to.
pub trait FeedbackSink {
    fn append(&mut self, record: NewFeedback) -> Result<Feedback, PersistenceError>;
}

pub struct FeedbackStore<'c, C> {
    conn: &'c mut C,
}

impl<'c, C> FeedbackStore<'c, C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    pub fn new(conn: &'c mut C) -> Self {
        Self { conn }
    }

    /// Every record, newest first.
    pub fn load_all(&mut self, _grant: &ReadGrant) -> QueryResult<Vec<Feedback>> {
        feedback::table
            .order_by((feedback::created_at.desc(), feedback::id.desc()))
            .select(Feedback::as_select())
            .load(&mut *self.conn)
    }

    pub fn fetch(
        &mut self,
        id: &str,
        _grant: &ReadGrant,
    ) -> QueryResult<Option<Feedback>> {
        feedback::table
            .find(id)
            .select(Feedback::as_select())
            .first(&mut *self.conn)
            .optional()
    }

    /// Irreversibly removes a record. Returns whether it existed.
    pub fn delete<const TX: bool>(
        &mut self,
        id: &str,
        user: &User<TX>,
    ) -> QueryResult<bool> {
        let n = diesel::delete(feedback::table.find(id)).execute(&mut *self.conn)?;
        if n > 0 {
            tracing::info!("feedback {id} deleted by {}", user.username);
        }
        Ok(n > 0)
    }
}

impl<C> FeedbackSink for FeedbackStore<'_, C>
where
    C: LoadConnection<Backend = Sqlite>,
{
    fn append(&mut self, record: NewFeedback) -> Result<Feedback, PersistenceError> {
        let custom_data = record
            .custom_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let row = Feedback {
            id: Uuid::now_v7().to_string(),
            created_at: Utc::now().naive_utc(),
            name: record.name,
            phone: record.phone,
            email: record.email,
            overall_rating: record.overall_rating,
            overall_comments: record.overall_comments,
            sessions_rating: record.sessions_rating,
            sessions_comments: record.sessions_comments,
            media_rating: record.media_rating,
            media_comments: record.media_comments,
            volunteers_rating: record.volunteers_rating,
            volunteers_comments: record.volunteers_comments,
            venue_rating: record.venue_rating,
            venue_comments: record.venue_comments,
            suggestions: record.suggestions,
            custom_data,
        };

        self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(feedback::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{feedback::CustomData, settings::test_support::memory_conn};

    fn submission(overall: i64) -> NewFeedback {
        NewFeedback {
            name: Some("Sunil".into()),
            phone: Some("0712345678".into()),
            email: None,
            overall_rating: overall,
            overall_comments: Some("Great".into()),
            sessions_rating: None,
            sessions_comments: None,
            media_rating: Some(2),
            media_comments: None,
            volunteers_rating: None,
            volunteers_comments: None,
            venue_rating: None,
            venue_comments: None,
            suggestions: None,
            custom_data: None,
        }
    }

    fn admin() -> User<true> {
        User {
            id: "u1".into(),
            email: "admin@example.com".into(),
            username: "admin".into(),
            password_hash: String::new(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn append_assigns_id_and_reads_back_newest_first() {
        let mut conn = memory_conn();
        let mut store = FeedbackStore::new(&mut conn);

        let first = store.append(submission(4)).unwrap();
        let mut with_custom = submission(5);
        let mut custom = CustomData::default();
        custom.fields.insert("field_x".into(), "".into());
        with_custom.custom_data = Some(custom.clone());
        let second = store.append(with_custom).unwrap();

        assert_ne!(first.id, second.id);

        let grant = ReadGrant::for_tests();
        let all = store.load_all(&grant).unwrap();
        let ids: Vec<&str> = all.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, [second.id.as_str(), first.id.as_str()]);
        assert_eq!(all[0].custom_data(), Some(custom));
        assert_eq!(all[1].custom_data, None);
        assert_eq!(all[1].media_rating, Some(2));
    }

    #[test]
    fn out_of_range_overall_is_refused_by_the_table() {
        let mut conn = memory_conn();
        let mut store = FeedbackStore::new(&mut conn);
        let err = store.append(submission(0)).unwrap_err();
        assert!(matches!(err, PersistenceError::Database(_)));
        // the message is the database's own
        assert!(err.to_string().contains("CHECK"));
        assert!(store.load_all(&ReadGrant::for_tests()).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_only_the_given_record() {
        let mut conn = memory_conn();
        let mut store = FeedbackStore::new(&mut conn);
        let a = store.append(submission(3)).unwrap();
        let b = store.append(submission(1)).unwrap();

        assert!(store.delete(&a.id, &admin()).unwrap());
        assert!(!store.delete(&a.id, &admin()).unwrap());

        let grant = ReadGrant::for_tests();
        assert!(store.fetch(&a.id, &grant).unwrap().is_none());
        let kept = store.fetch(&b.id, &grant).unwrap().unwrap();
        assert_eq!(kept.id, b.id);
        assert_eq!(kept.overall_rating, 1);
    }
}
