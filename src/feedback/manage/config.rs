//! The form editor.
//!
//! The whole draft travels with every post (`sections[2][label]=...`), so
//! adding, moving and deleting items never touches the database. Only the
//! save button writes the draft back through [`save_schema`].

use std::{str::FromStr, sync::Arc};

use axum::extract::State;
use hypertext::{Rendered, prelude::*};
use serde::Deserialize;

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::{
        config_store::{ConfigError, SqliteConfigTransaction, load_schema, save_schema},
        form_schema::{
            Direction, Field, FieldKey, FieldType, FormSchema, SchemaEditError,
            Section, SectionKey,
        },
    },
    form::QsForm,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, bad_request, success},
    widgets::alert::{ErrorAlert, SuccessAlert},
};

#[derive(Deserialize, Debug, Default)]
pub struct DraftForm {
    #[serde(default)]
    sections: Vec<DraftSection>,
    #[serde(default)]
    fields: Vec<DraftField>,
    #[serde(default)]
    op: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DraftSection {
    key: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    label_localized: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    max_comment_length: String,
}

#[derive(Deserialize, Debug)]
pub struct DraftField {
    key: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    label_localized: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    kind: String,
    /// One option per line.
    #[serde(default)]
    options: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DraftError {
    #[error("\"{0}\" is not a valid maximum comment length")]
    InvalidLength(String),
    #[error("\"{0}\" is not a field type")]
    InvalidKind(String),
    #[error("unknown editor action \"{0}\"")]
    UnknownOp(String),
}

impl DraftForm {
    /// Rebuilds the schema from the posted draft. Positions in the posted
    /// lists become the display order.
    fn to_schema(&self) -> Result<FormSchema, DraftError> {
        let sections = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, draft)| {
                let max = draft.max_comment_length.trim();
                let max_comment_length = if max.is_empty() {
                    0
                } else {
                    max.parse::<u32>()
                        .map_err(|_| DraftError::InvalidLength(max.to_string()))?
                };
                Ok(Section {
                    key: SectionKey::from(draft.key.clone()),
                    label: draft.label.trim().to_string(),
                    label_localized: draft.label_localized.trim().to_string(),
                    enabled: draft.enabled,
                    required: draft.required,
                    max_comment_length,
                    display_order: i as i64,
                })
            })
            .collect::<Result<Vec<_>, DraftError>>()?;

        let fields = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, draft)| {
                let kind = FieldType::parse(&draft.kind)
                    .ok_or_else(|| DraftError::InvalidKind(draft.kind.clone()))?;
                Ok(Field {
                    key: FieldKey::from(draft.key.clone()),
                    label: draft.label.trim().to_string(),
                    label_localized: draft.label_localized.trim().to_string(),
                    enabled: draft.enabled,
                    required: draft.required,
                    kind,
                    options: draft
                        .options
                        .lines()
                        .map(str::trim)
                        .filter(|option| !option.is_empty())
                        .map(str::to_string)
                        .collect(),
                    display_order: i as i64,
                })
            })
            .collect::<Result<Vec<_>, DraftError>>()?;

        Ok(FormSchema { sections, fields })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Target {
    Section,
    Field,
}

/// One press of an editor button, e.g. `section:up:2` or `field:add`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DraftOp {
    Add(Target),
    Move(Target, usize, Direction),
    Delete(Target, usize),
    Save,
}

impl FromStr for DraftOp {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DraftError::UnknownOp(s.to_string());
        if s == "save" {
            return Ok(DraftOp::Save);
        }

        let mut parts = s.split(':');
        let target = match parts.next() {
            Some("section") => Target::Section,
            Some("field") => Target::Field,
            _ => return Err(unknown()),
        };
        let action = parts.next().ok_or_else(unknown)?;
        let index = parts.next().map(str::parse::<usize>);
        if parts.next().is_some() {
            return Err(unknown());
        }

        match (action, index) {
            ("add", None) => Ok(DraftOp::Add(target)),
            ("up", Some(Ok(i))) => Ok(DraftOp::Move(target, i, Direction::Up)),
            ("down", Some(Ok(i))) => Ok(DraftOp::Move(target, i, Direction::Down)),
            ("delete", Some(Ok(i))) => Ok(DraftOp::Delete(target, i)),
            _ => Err(unknown()),
        }
    }
}

impl DraftOp {
    fn apply(self, schema: &mut FormSchema) -> Result<(), SchemaEditError> {
        match self {
            DraftOp::Add(Target::Section) => {
                schema.add_section();
            }
            DraftOp::Add(Target::Field) => {
                schema.add_field();
            }
            DraftOp::Move(Target::Section, i, direction) => {
                schema.move_section(i, direction)?
            }
            DraftOp::Move(Target::Field, i, direction) => {
                schema.move_field(i, direction)?
            }
            DraftOp::Delete(Target::Section, i) => {
                schema.remove_section(i)?;
            }
            DraftOp::Delete(Target::Field, i) => {
                schema.remove_field(i)?;
            }
            DraftOp::Save => {}
        }
        schema.reassign_display_order();
        Ok(())
    }
}

enum Notice {
    None,
    Unsaved,
    Saved,
    Error(String),
}

struct FormConfigRenderer<'a> {
    schema: &'a FormSchema,
    notice: Notice,
}

struct SectionRow<'a> {
    i: usize,
    last: usize,
    section: &'a Section,
}

impl Renderable for SectionRow<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let i = self.i;
        let section = self.section;
        let name = |attr: &str| format!("sections[{i}][{attr}]");

        maud! {
            tr {
                td {
                    input type="hidden" name=(name("key")) value=(section.key.as_str());
                    code class="small" { (section.key.as_str()) }
                }
                td {
                    input type="text" class="form-control form-control-sm" name=(name("label")) value=(section.label);
                }
                td {
                    input type="text" class="form-control form-control-sm" name=(name("label_localized")) value=(section.label_localized);
                }
                td {
                    @if section.is_overall() {
                        input type="hidden" name=(name("enabled")) value="true";
                        input type="checkbox" class="form-check-input" checked disabled;
                    } @else {
                        input type="checkbox" class="form-check-input" name=(name("enabled")) value="true" checked[section.enabled];
                    }
                }
                td {
                    @if section.is_overall() {
                        input type="hidden" name=(name("required")) value="true";
                        input type="checkbox" class="form-check-input" checked disabled;
                    } @else {
                        input type="checkbox" class="form-check-input" name=(name("required")) value="true" checked[section.required];
                    }
                }
                td {
                    input type="number" min="0" class="form-control form-control-sm" name=(name("max_comment_length")) value=(section.max_comment_length.to_string());
                }
                td {
                    div class="btn-group" role="group" {
                        @if i > 0 {
                            button type="submit" name="op" value=(format!("section:up:{i}")) class="btn btn-sm btn-outline-secondary" { "Up" }
                        }
                        @if i < self.last {
                            button type="submit" name="op" value=(format!("section:down:{i}")) class="btn btn-sm btn-outline-secondary" { "Down" }
                        }
                        @if !section.is_overall() {
                            button type="submit" name="op" value=(format!("section:delete:{i}")) class="btn btn-sm btn-outline-danger" { "Delete" }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

struct FieldRow<'a> {
    i: usize,
    last: usize,
    field: &'a Field,
}

impl Renderable for FieldRow<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let i = self.i;
        let field = self.field;
        let name = |attr: &str| format!("fields[{i}][{attr}]");

        maud! {
            tr {
                td {
                    input type="hidden" name=(name("key")) value=(field.key.as_str());
                    code class="small" { (field.key.as_str()) }
                }
                td {
                    input type="text" class="form-control form-control-sm" name=(name("label")) value=(field.label);
                }
                td {
                    input type="text" class="form-control form-control-sm" name=(name("label_localized")) value=(field.label_localized);
                }
                td {
                    input type="checkbox" class="form-check-input" name=(name("enabled")) value="true" checked[field.enabled];
                }
                td {
                    input type="checkbox" class="form-check-input" name=(name("required")) value="true" checked[field.required];
                }
                td {
                    select class="form-select form-select-sm" name=(name("kind")) {
                        @for kind in FieldType::ALL {
                            option value=(kind.as_str()) selected[kind == field.kind] { (kind.as_str()) }
                        }
                    }
                    textarea class="form-control form-control-sm mt-1" rows="2" placeholder="Options, one per line" name=(name("options")) {
                        (field.options.join("\n"))
                    }
                }
                td {
                    div class="btn-group" role="group" {
                        @if i > 0 {
                            button type="submit" name="op" value=(format!("field:up:{i}")) class="btn btn-sm btn-outline-secondary" { "Up" }
                        }
                        @if i < self.last {
                            button type="submit" name="op" value=(format!("field:down:{i}")) class="btn btn-sm btn-outline-secondary" { "Down" }
                        }
                        button type="submit" name="op" value=(format!("field:delete:{i}")) class="btn btn-sm btn-outline-danger" { "Delete" }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

impl Renderable for FormConfigRenderer<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let sections_last = self.schema.sections.len().saturating_sub(1);
        let fields_last = self.schema.fields.len().saturating_sub(1);

        maud! {
            div class="d-flex justify-content-between flex-wrap flex-md-nowrap align-items-center pt-3 pb-2 mb-3 border-bottom" {
                h1 class="h2" { "Feedback form" }
                a class="btn btn-sm btn-outline-secondary" href="/feedback" { "View form" }
            }

            @match &self.notice {
                Notice::None => {}
                Notice::Unsaved => {
                    div class="alert alert-warning" role="status" {
                        "This draft has unsaved changes."
                    }
                }
                Notice::Saved => {
                    SuccessAlert msg=("The form has been saved.");
                }
                Notice::Error(msg) => {
                    ErrorAlert msg=(msg);
                }
            }

            form method="post" action="/admin/feedback/form" {
                h2 class="h4" { "Rating sections" }
                div class="table-responsive" {
                    table class="table table-sm align-middle" {
                        thead {
                            tr {
                                th scope="col" { "Key" }
                                th scope="col" { "Label" }
                                th scope="col" { "Localized label" }
                                th scope="col" { "Enabled" }
                                th scope="col" { "Required" }
                                th scope="col" { "Max comment length" }
                                th scope="col" { "Actions" }
                            }
                        }
                        tbody {
                            @for (i, section) in self.schema.sections.iter().enumerate() {
                                SectionRow i=(i) last=(sections_last) section=(section);
                            }
                        }
                    }
                }
                button type="submit" name="op" value="section:add" class="btn btn-sm btn-outline-primary mb-4" { "Add section" }

                h2 class="h4" { "Personal details" }
                div class="table-responsive" {
                    table class="table table-sm align-middle" {
                        thead {
                            tr {
                                th scope="col" { "Key" }
                                th scope="col" { "Label" }
                                th scope="col" { "Localized label" }
                                th scope="col" { "Enabled" }
                                th scope="col" { "Required" }
                                th scope="col" { "Type" }
                                th scope="col" { "Actions" }
                            }
                        }
                        tbody {
                            @for (i, field) in self.schema.fields.iter().enumerate() {
                                FieldRow i=(i) last=(fields_last) field=(field);
                            }
                        }
                    }
                }
                button type="submit" name="op" value="field:add" class="btn btn-sm btn-outline-primary mb-4" { "Add field" }

                div class="border-top pt-3" {
                    button type="submit" name="op" value="save" class="btn btn-primary" { "Save form" }
                }
            }
        }
        .render_to(buffer);
    }
}

fn editor_page<const TX: bool>(
    user: User<TX>,
    config: &AppConfig,
    schema: &FormSchema,
    notice: Notice,
) -> Rendered<String> {
    Page::new()
        .user(user)
        .site_name(&config.site_name)
        .title("Feedback form")
        .body(FormConfigRenderer { schema, notice })
        .render()
}

pub async fn form_config_page(
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let schema = load_schema(&mut *conn)?.sorted();
    success(editor_page(user, &config, &schema, Notice::None))
}

pub async fn do_edit_form_config(
    user: User<true>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<true>,
    QsForm(draft): QsForm<DraftForm>,
) -> StandardResponse {
    let mut schema = match draft.to_schema() {
        Ok(schema) => schema,
        Err(e) => {
            // nothing usable was posted, so start again from what is saved
            let saved = load_schema(&mut *conn)?.sorted();
            return bad_request(editor_page(
                user,
                &config,
                &saved,
                Notice::Error(e.to_string()),
            ));
        }
    };

    let op = match draft.op.as_deref().unwrap_or("save").parse::<DraftOp>() {
        Ok(op) => op,
        Err(e) => {
            return bad_request(editor_page(
                user,
                &config,
                &schema,
                Notice::Error(e.to_string()),
            ));
        }
    };

    if op != DraftOp::Save {
        return match op.apply(&mut schema) {
            Ok(()) => success(editor_page(user, &config, &schema, Notice::Unsaved)),
            Err(e) => bad_request(editor_page(
                user,
                &config,
                &schema,
                Notice::Error(e.to_string()),
            )),
        };
    }

    match save_schema(&schema, SqliteConfigTransaction::new(&mut *conn)) {
        Ok(saved) => {
            tracing::info!("{} saved the feedback form", user.username);
            success(editor_page(user, &config, &saved, Notice::Saved))
        }
        Err(ConfigError::Invalid(e)) => bad_request(editor_page(
            user,
            &config,
            &schema,
            Notice::Error(e.to_string()),
        )),
        Err(e) => Err(FailureResponse::ServerError(Some(editor_page(
            user,
            &config,
            &schema,
            Notice::Error(format!("{e}. The draft below has not been saved.")),
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        feedback::form_schema::{KnownField, KnownSection},
        form::parse_nested,
    };

    fn draft(body: &str) -> DraftForm {
        parse_nested(body.as_bytes()).unwrap()
    }

    #[test]
    fn ops_parse() {
        assert_eq!("save".parse::<DraftOp>(), Ok(DraftOp::Save));
        assert_eq!(
            "section:add".parse::<DraftOp>(),
            Ok(DraftOp::Add(Target::Section))
        );
        assert_eq!(
            "field:down:3".parse::<DraftOp>(),
            Ok(DraftOp::Move(Target::Field, 3, Direction::Down))
        );
        assert_eq!(
            "section:delete:0".parse::<DraftOp>(),
            Ok(DraftOp::Delete(Target::Section, 0))
        );
        for bad in ["", "section", "section:up", "field:add:1", "row:add", "field:up:x", "field:up:1:2"] {
            assert!(bad.parse::<DraftOp>().is_err(), "{bad} should be refused");
        }
    }

    #[test]
    fn posted_draft_becomes_schema_in_posted_order() {
        let form = draft(
            "sections%5B0%5D%5Bkey%5D=venue&sections%5B0%5D%5Blabel%5D=Venue+%26+food\
             &sections%5B0%5D%5Benabled%5D=true&sections%5B0%5D%5Bmax_comment_length%5D=80\
             &sections%5B1%5D%5Bkey%5D=overall&sections%5B1%5D%5Blabel%5D=Overall\
             &sections%5B1%5D%5Benabled%5D=true&sections%5B1%5D%5Brequired%5D=true\
             &sections%5B1%5D%5Bmax_comment_length%5D=\
             &fields%5B0%5D%5Bkey%5D=field_abc&fields%5B0%5D%5Blabel%5D=Track\
             &fields%5B0%5D%5Bkind%5D=select&fields%5B0%5D%5Boptions%5D=Web%0D%0A%0D%0A+Systems+\
             &op=save",
        );
        assert_eq!(form.op.as_deref(), Some("save"));

        let schema = form.to_schema().unwrap();
        assert_eq!(schema.sections.len(), 2);
        assert_eq!(schema.sections[0].key, SectionKey::Known(KnownSection::Venue));
        assert_eq!(schema.sections[0].label, "Venue & food");
        assert_eq!(schema.sections[0].max_comment_length, 80);
        assert!(!schema.sections[0].required);
        assert_eq!(schema.sections[1].display_order, 1);
        assert_eq!(schema.sections[1].max_comment_length, 0);

        let track = &schema.fields[0];
        assert_eq!(track.key, FieldKey::Custom("field_abc".to_string()));
        assert!(!track.enabled);
        assert_eq!(track.kind, FieldType::Select);
        assert_eq!(track.options, vec!["Web".to_string(), "Systems".to_string()]);
    }

    #[test]
    fn bad_drafts_are_reported() {
        let form = draft(
            "sections%5B0%5D%5Bkey%5D=overall&sections%5B0%5D%5Bmax_comment_length%5D=lots",
        );
        assert_eq!(
            form.to_schema(),
            Err(DraftError::InvalidLength("lots".to_string()))
        );

        let form = draft("fields%5B0%5D%5Bkey%5D=name&fields%5B0%5D%5Bkind%5D=date");
        assert_eq!(form.to_schema(), Err(DraftError::InvalidKind("date".to_string())));
    }

    #[test]
    fn ops_edit_the_draft_only() {
        let mut schema = FormSchema::default();

        DraftOp::Add(Target::Field).apply(&mut schema).unwrap();
        assert_eq!(schema.fields.len(), KnownField::ALL.len() + 1);

        DraftOp::Move(Target::Section, 4, Direction::Up)
            .apply(&mut schema)
            .unwrap();
        assert_eq!(schema.sections[3].key, SectionKey::Known(KnownSection::Venue));
        assert_eq!(schema.sections[3].display_order, 3);

        assert_eq!(
            DraftOp::Delete(Target::Section, 0).apply(&mut schema),
            Err(SchemaEditError::OverallIsMandatory)
        );
        assert_eq!(
            DraftOp::Delete(Target::Field, 9).apply(&mut schema),
            Err(SchemaEditError::OutOfRange(9))
        );
    }

    #[test]
    fn editor_keeps_overall_enabled_and_required() {
        let schema = FormSchema::default();
        let html = FormConfigRenderer {
            schema: &schema,
            notice: Notice::Unsaved,
        }
        .render()
        .into_inner();

        assert!(html.contains(r#"name="sections[0][required]" value="true""#));
        assert!(html.contains(r#"value="section:delete:1""#));
        assert!(!html.contains(r#"value="section:delete:0""#));
        assert!(html.contains("unsaved changes"));
    }
}
