//! Decides whether a filled-in form may be stored, and splits the answers
//! between the fixed columns and the extension bucket.
//!
//! [`validate`] is a pure function of the submitted [`FormState`] and the
//! [`FormSchema`] the form was rendered from; nothing is written here.

use std::collections::HashMap;

use serde::Deserialize;

use crate::feedback::{
    CustomData, CustomSectionAnswer,
    form_schema::{
        Field, FieldKey, FieldType, FormSchema, KnownField, KnownSection,
        Section, SectionKey,
    },
};

/// The raw answers posted by the form, keyed by section and field key.
/// A rating of 0 means "not rated".
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FormState {
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub sections: HashMap<String, SectionAnswer>,
    #[serde(default)]
    pub suggestions: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SectionAnswer {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comments: String,
}

impl FormState {
    /// Parses an `application/x-www-form-urlencoded` body with nested keys,
    /// e.g. `sections[venue][rating]=4`.
    pub fn from_form_body(body: &[u8]) -> Result<Self, serde_qs::Error> {
        crate::form::parse_nested(body)
    }

    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn rating(&self, key: &str) -> i64 {
        self.sections.get(key).map(|a| a.rating).unwrap_or(0)
    }

    pub fn comments(&self, key: &str) -> &str {
        self.sections
            .get(key)
            .map(|a| a.comments.as_str())
            .unwrap_or("")
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in \"{label}\".")]
    MissingField { key: String, label: String },
    #[error("Please give a rating for \"{label}\".")]
    MissingRating { key: String, label: String },
    #[error("\"{value}\" is not one of the choices for \"{label}\".")]
    UnknownOption {
        key: String,
        label: String,
        value: String,
    },
    #[error("The rating for \"{label}\" must be between 1 and 5.")]
    RatingOutOfRange {
        key: String,
        label: String,
        rating: i64,
    },
    #[error("The comment for \"{label}\" must be at most {max} characters long.")]
    CommentTooLong { key: String, label: String, max: u32 },
}

impl ValidationError {
    /// The key of the section or field the error refers to.
    pub fn key(&self) -> &str {
        match self {
            ValidationError::MissingField { key, .. }
            | ValidationError::MissingRating { key, .. }
            | ValidationError::UnknownOption { key, .. }
            | ValidationError::RatingOutOfRange { key, .. }
            | ValidationError::CommentTooLong { key, .. } => key,
        }
    }
}

/// A validated submission, ready to be stored. The identifier and creation
/// time are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
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
    pub custom_data: Option<CustomData>,
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn missing_field(field: &Field) -> ValidationError {
    ValidationError::MissingField {
        key: field.key.to_string(),
        label: field.label.clone(),
    }
}

fn missing_rating(section: &Section) -> ValidationError {
    ValidationError::MissingRating {
        key: section.key.to_string(),
        label: section.label.clone(),
    }
}

fn check_required(
    state: &FormState,
    fields: &[&Field],
    sections: &[&Section],
) -> Result<(), ValidationError> {
    if let Some(field) = fields
        .iter()
        .find(|f| f.required && state.field(f.key.as_str()).trim().is_empty())
    {
        return Err(missing_field(field));
    }

    if let Some(section) = sections
        .iter()
        .find(|s| s.required && state.rating(s.key.as_str()) == 0)
    {
        return Err(missing_rating(section));
    }

    Ok(())
}

fn check_bounds(
    state: &FormState,
    fields: &[&Field],
    sections: &[&Section],
) -> Result<(), ValidationError> {
    for field in fields.iter().filter(|f| f.kind == FieldType::Select) {
        let value = state.field(field.key.as_str()).trim();
        if !value.is_empty() && !field.options.iter().any(|o| o == value) {
            return Err(ValidationError::UnknownOption {
                key: field.key.to_string(),
                label: field.label.clone(),
                value: value.to_string(),
            });
        }
    }

    for section in sections {
        let key = section.key.as_str();
        let rating = state.rating(key);
        if !(0..=5).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange {
                key: key.to_string(),
                label: section.label.clone(),
                rating,
            });
        }
        if state.comments(key).chars().count() > section.max_comment_length as usize {
            return Err(ValidationError::CommentTooLong {
                key: key.to_string(),
                label: section.label.clone(),
                max: section.max_comment_length,
            });
        }
    }

    Ok(())
}

/// Checks `state` against the enabled part of `schema` and partitions the
/// answers. The first problem found is returned; required fields are checked
/// before required sections. Disabled items are ignored entirely.
pub fn validate(
    state: &FormState,
    schema: &FormSchema,
) -> Result<NewFeedback, ValidationError> {
    let fields = schema.enabled_fields();
    let sections = schema.enabled_sections();

    check_required(state, &fields, &sections)?;
    check_bounds(state, &fields, &sections)?;

    let mut out = NewFeedback {
        name: None,
        phone: None,
        email: None,
        overall_rating: 0,
        overall_comments: None,
        sessions_rating: None,
        sessions_comments: None,
        media_rating: None,
        media_comments: None,
        volunteers_rating: None,
        volunteers_comments: None,
        venue_rating: None,
        venue_comments: None,
        suggestions: non_empty(&state.suggestions),
        custom_data: None,
    };
    let mut custom = CustomData::default();
    let mut has_custom = false;
    let mut overall = None;

    for field in &fields {
        let value = state.field(field.key.as_str());
        match &field.key {
            FieldKey::Known(known) => {
                let slot = match known {
                    KnownField::Name => &mut out.name,
                    KnownField::Phone => &mut out.phone,
                    KnownField::Email => &mut out.email,
                };
                *slot = non_empty(value);
            }
            FieldKey::Custom(key) => {
                has_custom = true;
                custom.fields.insert(key.clone(), value.trim().to_string());
            }
        }
    }

    for section in &sections {
        let key = section.key.as_str();
        let rating = Some(state.rating(key)).filter(|r| *r != 0);
        let comments = non_empty(state.comments(key));
        match &section.key {
            SectionKey::Known(KnownSection::Overall) => {
                overall = rating;
                out.overall_comments = comments;
            }
            SectionKey::Known(known) => {
                let (rating_slot, comments_slot) = match known {
                    KnownSection::Sessions => {
                        (&mut out.sessions_rating, &mut out.sessions_comments)
                    }
                    KnownSection::Media => {
                        (&mut out.media_rating, &mut out.media_comments)
                    }
                    KnownSection::Volunteers => (
                        &mut out.volunteers_rating,
                        &mut out.volunteers_comments,
                    ),
                    KnownSection::Venue => {
                        (&mut out.venue_rating, &mut out.venue_comments)
                    }
                    KnownSection::Overall => unreachable!("matched above"),
                };
                *rating_slot = rating;
                *comments_slot = comments;
            }
            SectionKey::Custom(key) => {
                has_custom = true;
                custom
                    .sections
                    .insert(key.clone(), CustomSectionAnswer { rating, comments });
            }
        }
    }

    // The overall rating is the one column which may never be empty.
    out.overall_rating = match overall {
        Some(rating) => rating,
        None => {
            let label = schema
                .section(KnownSection::Overall.key())
                .map(|s| s.label.clone())
                .unwrap_or_else(|| KnownSection::Overall.default_label().to_string());
            return Err(ValidationError::MissingRating {
                key: KnownSection::Overall.key().to_string(),
                label,
            });
        }
    };
    out.custom_data = has_custom.then_some(custom);

    Ok(out)
}
