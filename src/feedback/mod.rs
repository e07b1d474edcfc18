pub mod access;
pub mod aggregate;
pub mod config_store;
pub mod export;
pub mod form_schema;
pub mod manage;
pub mod public;
pub mod render;
pub mod store;
pub mod submission;
pub mod validate;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    feedback::form_schema::{KnownField, KnownSection},
    schema::feedback,
};

/// One attendee's response. Records are only ever inserted or deleted.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, PartialEq,
)]
#[diesel(table_name = feedback)]
pub struct Feedback {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub overall_rating: i64,
    pub overall_comments: Option<String>,
    pub sessions_rating: Option<i64>,
    pub sessions_comments: Option<String>,
    pub media_rating: Option<i64>,
    pub media_comments: Option<String>,
    pub volunteers_rating: Option<i64>,
    pub volunteers_comments: Option<String>,
    pub venue_rating: Option<i64>,
    pub venue_comments: Option<String>,
    pub suggestions: Option<String>,
    /// JSON encoded [`CustomData`]; absent when the form had no custom
    /// sections or fields enabled.
    pub custom_data: Option<String>,
}

/// The extension bucket: answers to sections and fields which do not have a
/// column of their own. Entries keep the order in which they were asked.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CustomData {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sections: IndexMap<String, CustomSectionAnswer>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, String>,
}

impl CustomData {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.fields.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CustomSectionAnswer {
    pub rating: Option<i64>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl Feedback {
    pub fn rating(&self, section: KnownSection) -> Option<i64> {
        match section {
            KnownSection::Overall => Some(self.overall_rating),
            KnownSection::Sessions => self.sessions_rating,
            KnownSection::Media => self.media_rating,
            KnownSection::Volunteers => self.volunteers_rating,
            KnownSection::Venue => self.venue_rating,
        }
    }

    pub fn comments(&self, section: KnownSection) -> Option<&str> {
        match section {
            KnownSection::Overall => self.overall_comments.as_deref(),
            KnownSection::Sessions => self.sessions_comments.as_deref(),
            KnownSection::Media => self.media_comments.as_deref(),
            KnownSection::Volunteers => self.volunteers_comments.as_deref(),
            KnownSection::Venue => self.venue_comments.as_deref(),
        }
    }

    pub fn field(&self, field: KnownField) -> Option<&str> {
        match field {
            KnownField::Name => self.name.as_deref(),
            KnownField::Phone => self.phone.as_deref(),
            KnownField::Email => self.email.as_deref(),
        }
    }

    /// Decodes the extension bucket. A value which does not decode is logged
    /// and treated as absent, so one bad record never breaks a listing.
    pub fn custom_data(&self) -> Option<CustomData> {
        let raw = self.custom_data.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(
                    "feedback {} has unreadable custom data: {e}",
                    self.id
                );
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{
        CustomData, CustomSectionAnswer,
        test_support::{record, with_custom},
    };

    #[test]
    fn custom_data_decodes_and_tolerates_garbage() {
        let mut custom = CustomData::default();
        custom.fields.insert("field_b".into(), "x".into());
        custom.fields.insert("field_a".into(), "".into());
        custom.sections.insert(
            "custom_1".into(),
            CustomSectionAnswer {
                rating: None,
                comments: Some("ok".into()),
            },
        );

        let decoded = with_custom(record("1", 4), custom.clone())
            .custom_data()
            .unwrap();
        assert_eq!(decoded, custom);
        // insertion order survives the round trip
        let keys: Vec<&str> = decoded.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["field_b", "field_a"]);

        let mut broken = record("2", 4);
        broken.custom_data = Some("[1, 2".into());
        assert_eq!(broken.custom_data(), None);
        assert_eq!(record("3", 4).custom_data(), None);
    }

    #[test]
    fn empty_maps_are_not_serialized() {
        let mut custom = CustomData::default();
        custom.fields.insert("field_a".into(), "v".into());
        assert_eq!(
            serde_json::to_string(&custom).unwrap(),
            r#"{"fields":{"field_a":"v"}}"#
        );
    }
}
