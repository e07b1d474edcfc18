//! The configurable shape of the feedback form.
//!
//! A form consists of rateable [`Section`]s and personal-detail [`Field`]s.
//! Five section keys and three field keys are "default" keys: their answers
//! are stored in dedicated columns of the `feedback` table. Every other key
//! is a custom key, and its answers go to the record's `custom_data` bucket.
//! [`SectionKey`] and [`FieldKey`] make that distinction at the type level,
//! and are the only place in the crate which knows the default keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_COMMENT_LENGTH: u32 = 500;

fn default_max_comment_length() -> u32 {
    DEFAULT_MAX_COMMENT_LENGTH
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownSection {
    Overall,
    Sessions,
    Media,
    Volunteers,
    Venue,
}

impl KnownSection {
    pub const ALL: [KnownSection; 5] = [
        KnownSection::Overall,
        KnownSection::Sessions,
        KnownSection::Media,
        KnownSection::Volunteers,
        KnownSection::Venue,
    ];

    pub fn key(self) -> &'static str {
        match self {
            KnownSection::Overall => "overall",
            KnownSection::Sessions => "sessions",
            KnownSection::Media => "media",
            KnownSection::Volunteers => "volunteers",
            KnownSection::Venue => "venue",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.key() == key)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn default_label(self) -> &'static str {
        match self {
            KnownSection::Overall => "Overall Experience",
            KnownSection::Sessions => "Sessions & Speakers",
            KnownSection::Media => "Media Coverage",
            KnownSection::Volunteers => "Volunteers",
            KnownSection::Venue => "Venue & Facilities",
        }
    }

    fn default_label_localized(self) -> &'static str {
        match self {
            KnownSection::Overall => "සමස්ත අත්දැකීම",
            KnownSection::Sessions => "සැසි සහ දේශකයන්",
            KnownSection::Media => "මාධ්‍ය ආවරණය",
            KnownSection::Volunteers => "ස්වේච්ඡා සේවකයන්",
            KnownSection::Venue => "ස්ථානය සහ පහසුකම්",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownField {
    Name,
    Phone,
    Email,
}

impl KnownField {
    pub const ALL: [KnownField; 3] =
        [KnownField::Name, KnownField::Phone, KnownField::Email];

    pub fn key(self) -> &'static str {
        match self {
            KnownField::Name => "name",
            KnownField::Phone => "phone",
            KnownField::Email => "email",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.key() == key)
    }

    pub fn default_label(self) -> &'static str {
        match self {
            KnownField::Name => "Name",
            KnownField::Phone => "Phone",
            KnownField::Email => "Email",
        }
    }

    fn default_label_localized(self) -> &'static str {
        match self {
            KnownField::Name => "නම",
            KnownField::Phone => "දුරකථන අංකය",
            KnownField::Email => "විද්‍යුත් තැපෑල",
        }
    }
}

/// The key of a section: either one of the five default sections, or a
/// custom key whose answers live in the extension bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionKey {
    Known(KnownSection),
    Custom(String),
}

impl SectionKey {
    pub fn new_custom() -> Self {
        SectionKey::Custom(format!("custom_{}", Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            SectionKey::Known(known) => known.key(),
            SectionKey::Custom(key) => key,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, SectionKey::Known(_))
    }
}

impl From<String> for SectionKey {
    fn from(key: String) -> Self {
        match KnownSection::from_key(&key) {
            Some(known) => SectionKey::Known(known),
            None => SectionKey::Custom(key),
        }
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        match key {
            SectionKey::Known(known) => known.key().to_string(),
            SectionKey::Custom(key) => key,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The key of a field: one of the three default fields, or a custom key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKey {
    Known(KnownField),
    Custom(String),
}

impl FieldKey {
    pub fn new_custom() -> Self {
        FieldKey::Custom(format!("field_{}", Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKey::Known(known) => known.key(),
            FieldKey::Custom(key) => key,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, FieldKey::Known(_))
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        match KnownField::from_key(&key) {
            Some(known) => FieldKey::Known(known),
            None => FieldKey::Custom(key),
        }
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        match key {
            FieldKey::Known(known) => known.key().to_string(),
            FieldKey::Custom(key) => key,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Section,
    Field,
}

pub fn is_default_key(key: &str, kind: KeyKind) -> bool {
    match kind {
        KeyKind::Section => KnownSection::from_key(key).is_some(),
        KeyKind::Field => KnownField::from_key(key).is_some(),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub key: SectionKey,
    pub label: String,
    #[serde(default)]
    pub label_localized: String,
    pub enabled: bool,
    /// Only meaningful when the section is enabled.
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: u32,
    #[serde(default)]
    pub display_order: i64,
}

impl Section {
    fn default_for(known: KnownSection, display_order: i64) -> Self {
        Section {
            key: SectionKey::Known(known),
            label: known.default_label().to_string(),
            label_localized: known.default_label_localized().to_string(),
            enabled: true,
            required: known == KnownSection::Overall,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            display_order,
        }
    }

    pub fn is_overall(&self) -> bool {
        self.key == SectionKey::Known(KnownSection::Overall)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Tel,
    Email,
    Select,
}

impl FieldType {
    pub const ALL: [FieldType; 4] =
        [FieldType::Text, FieldType::Tel, FieldType::Email, FieldType::Select];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Tel => "tel",
            FieldType::Email => "email",
            FieldType::Select => "select",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub key: FieldKey,
    pub label: String,
    #[serde(default)]
    pub label_localized: String,
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Only used by [`FieldType::Select`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub display_order: i64,
}

impl Field {
    fn default_for(known: KnownField, display_order: i64) -> Self {
        Field {
            key: FieldKey::Known(known),
            label: known.default_label().to_string(),
            label_localized: known.default_label_localized().to_string(),
            enabled: true,
            required: matches!(known, KnownField::Name | KnownField::Phone),
            kind: match known {
                KnownField::Name => FieldType::Text,
                KnownField::Phone => FieldType::Tel,
                KnownField::Email => FieldType::Email,
            },
            options: Vec::new(),
            display_order,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SchemaEditError {
    #[error("the overall section is mandatory and cannot be removed")]
    OverallIsMandatory,
    #[error("there is no item at position {0}")]
    OutOfRange(usize),
    #[error("the key `{0}` is used more than once")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    pub sections: Vec<Section>,
    pub fields: Vec<Field>,
}

impl Default for FormSchema {
    fn default() -> Self {
        FormSchema {
            sections: default_sections(),
            fields: default_fields(),
        }
    }
}

pub fn default_sections() -> Vec<Section> {
    KnownSection::ALL
        .into_iter()
        .enumerate()
        .map(|(i, known)| Section::default_for(known, i as i64))
        .collect()
}

pub fn default_fields() -> Vec<Field> {
    KnownField::ALL
        .into_iter()
        .enumerate()
        .map(|(i, known)| Field::default_for(known, i as i64))
        .collect()
}

impl FormSchema {
    /// The sections which appear on the form, in display order. Sections
    /// sharing a `display_order` keep their relative position.
    pub fn enabled_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> =
            self.sections.iter().filter(|s| s.enabled).collect();
        sections.sort_by_key(|s| s.display_order);
        sections
    }

    pub fn enabled_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> =
            self.fields.iter().filter(|f| f.enabled).collect();
        fields.sort_by_key(|f| f.display_order);
        fields
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key.as_str() == key)
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key.as_str() == key)
    }

    /// The label of the section with this key, or the key itself when the
    /// section has since been deleted.
    pub fn section_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.section(key).map(|s| s.label.as_str()).unwrap_or(key)
    }

    pub fn field_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.field(key).map(|f| f.label.as_str()).unwrap_or(key)
    }

    /// Reorders both lists by `display_order` (stably), which is the order
    /// the editor presents them in.
    pub fn sorted(mut self) -> Self {
        self.sections.sort_by_key(|s| s.display_order);
        self.fields.sort_by_key(|f| f.display_order);
        self
    }

    /// Makes `display_order` match the current position in each list.
    pub fn reassign_display_order(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.display_order = i as i64;
        }
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.display_order = i as i64;
        }
    }

    /// The overall section is always present, enabled and required. Returns
    /// whether anything had to be changed.
    pub fn enforce_invariants(&mut self) -> bool {
        match self.sections.iter_mut().find(|s| s.is_overall()) {
            Some(overall) => {
                let changed = !overall.enabled || !overall.required;
                overall.enabled = true;
                overall.required = true;
                changed
            }
            None => {
                let first = self
                    .sections
                    .iter()
                    .map(|s| s.display_order)
                    .min()
                    .unwrap_or(0);
                self.sections.insert(
                    0,
                    Section::default_for(KnownSection::Overall, first - 1),
                );
                true
            }
        }
    }

    pub fn check_unique_keys(&self) -> Result<(), SchemaEditError> {
        for (i, section) in self.sections.iter().enumerate() {
            if self.sections[..i].iter().any(|s| s.key == section.key) {
                return Err(SchemaEditError::DuplicateKey(
                    section.key.to_string(),
                ));
            }
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.key == field.key) {
                return Err(SchemaEditError::DuplicateKey(field.key.to_string()));
            }
        }
        Ok(())
    }

    pub fn add_section(&mut self) -> &Section {
        let display_order = self.sections.len() as i64;
        self.sections.push(Section {
            key: SectionKey::new_custom(),
            label: "New section".to_string(),
            label_localized: String::new(),
            enabled: true,
            required: false,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            display_order,
        });
        &self.sections[self.sections.len() - 1]
    }

    pub fn add_field(&mut self) -> &Field {
        let display_order = self.fields.len() as i64;
        self.fields.push(Field {
            key: FieldKey::new_custom(),
            label: "New field".to_string(),
            label_localized: String::new(),
            enabled: true,
            required: false,
            kind: FieldType::Text,
            options: Vec::new(),
            display_order,
        });
        &self.fields[self.fields.len() - 1]
    }

    pub fn move_section(
        &mut self,
        index: usize,
        direction: Direction,
    ) -> Result<(), SchemaEditError> {
        move_item(&mut self.sections, index, direction)
    }

    pub fn move_field(
        &mut self,
        index: usize,
        direction: Direction,
    ) -> Result<(), SchemaEditError> {
        move_item(&mut self.fields, index, direction)
    }

    /// Removes a section from the form. Already submitted feedback keeps
    /// whatever was answered for it.
    pub fn remove_section(
        &mut self,
        index: usize,
    ) -> Result<Section, SchemaEditError> {
        match self.sections.get(index) {
            None => Err(SchemaEditError::OutOfRange(index)),
            Some(section) if section.is_overall() => {
                Err(SchemaEditError::OverallIsMandatory)
            }
            Some(_) => Ok(self.sections.remove(index)),
        }
    }

    pub fn remove_field(
        &mut self,
        index: usize,
    ) -> Result<Field, SchemaEditError> {
        if index >= self.fields.len() {
            return Err(SchemaEditError::OutOfRange(index));
        }
        Ok(self.fields.remove(index))
    }
}

fn move_item<T>(
    items: &mut [T],
    index: usize,
    direction: Direction,
) -> Result<(), SchemaEditError> {
    if index >= items.len() {
        return Err(SchemaEditError::OutOfRange(index));
    }
    match direction {
        Direction::Up if index > 0 => items.swap(index, index - 1),
        Direction::Down if index + 1 < items.len() => {
            items.swap(index, index + 1)
        }
        // already at the edge
        _ => {}
    }
    Ok(())
}
