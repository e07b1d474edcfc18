//! The attendee-facing feedback form.

use hypertext::prelude::*;

use crate::{
    feedback::{
        form_schema::{Field, FieldType, FormSchema, Section},
        validate::FormState,
    },
    widgets::alert::ErrorAlert,
};

/// Renders the enabled part of a schema as an HTML form, filled in with
/// `state`. Required items are marked, but nothing stops the browser from
/// submitting; the check happens on the server when the form is posted.
pub struct FormRenderer<'a> {
    pub schema: &'a FormSchema,
    pub state: &'a FormState,
    pub error: Option<String>,
}

pub fn field_name(key: &str) -> String {
    format!("fields[{key}]")
}

pub fn rating_name(key: &str) -> String {
    format!("sections[{key}][rating]")
}

pub fn comments_name(key: &str) -> String {
    format!("sections[{key}][comments]")
}

/// Label text in both locales, with a marker on required items.
struct LabelText<'a> {
    label: &'a str,
    label_localized: &'a str,
    required: bool,
}

impl Renderable for LabelText<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            (self.label)
            @if self.required {
                span class="text-danger ms-1" title="required" { "*" }
            }
            @if !self.label_localized.is_empty() {
                small class="text-muted ms-2" { (self.label_localized) }
            }
        }
        .render_to(buffer);
    }
}

struct FieldInput<'a> {
    field: &'a Field,
    value: &'a str,
}

impl Renderable for FieldInput<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let field = self.field;
        let id = format!("field-{}", field.key);
        let name = field_name(field.key.as_str());

        maud! {
            div class="mb-3" {
                label class="form-label fw-semibold" for=(id) {
                    LabelText
                        label=(field.label.as_str())
                        label_localized=(field.label_localized.as_str())
                        required=(field.required);
                }
                @match field.kind {
                    FieldType::Select => {
                        select class="form-select" id=(id) name=(name) {
                            option value="" selected[self.value.is_empty()] { "Choose..." }
                            @for option in &field.options {
                                option value=(option) selected[self.value == option] {
                                    (option)
                                }
                            }
                        }
                    }
                    kind => {
                        input
                            type=(kind.as_str())
                            class="form-control"
                            id=(id)
                            name=(name)
                            value=(self.value);
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

struct SectionInput<'a> {
    section: &'a Section,
    rating: i64,
    comments: &'a str,
}

impl Renderable for SectionInput<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let section = self.section;
        let key = section.key.as_str();
        let rating_name = rating_name(key);

        maud! {
            fieldset class="mb-4 p-3 border rounded" {
                legend class="fs-6 fw-semibold" {
                    LabelText
                        label=(section.label.as_str())
                        label_localized=(section.label_localized.as_str())
                        required=(section.required);
                }
                div class="mb-2" {
                    @for n in 1..=5i64 {
                        @let id = format!("rating-{key}-{n}");
                        div class="form-check form-check-inline" {
                            input
                                class="form-check-input"
                                type="radio"
                                id=(id)
                                name=(rating_name)
                                value=(n.to_string())
                                checked[self.rating == n];
                            label class="form-check-label" for=(id) { (n.to_string()) }
                        }
                    }
                }
                @if section.max_comment_length > 0 {
                    textarea
                        class="form-control"
                        name=(comments_name(key))
                        rows="2"
                        maxlength=(section.max_comment_length.to_string())
                        placeholder="Comments (optional)" {
                        (self.comments)
                    }
                    div class="form-text" {
                        (format!("Up to {} characters.", section.max_comment_length))
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

impl Renderable for FormRenderer<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let fields = self.schema.enabled_fields();
        let sections = self.schema.enabled_sections();

        maud! {
            h1 class="mb-4" { "Feedback" }
            @if let Some(error) = &self.error {
                ErrorAlert msg=(error);
            }
            form
                method="post"
                action="/feedback"
                onsubmit="this.querySelector('button[type=submit]').disabled = true;" {
                @if !fields.is_empty() {
                    h2 class="h5" { "About you" }
                    @for field in &fields {
                        FieldInput field=(*field) value=(self.state.field(field.key.as_str()));
                    }
                }
                h2 class="h5 mt-4" { "Your ratings" }
                p class="text-muted" { "1 is poor and 5 is excellent." }
                @for section in &sections {
                    SectionInput
                        section=(*section)
                        rating=(self.state.rating(section.key.as_str()))
                        comments=(self.state.comments(section.key.as_str()));
                }
                div class="mb-3" {
                    label class="form-label fw-semibold" for="suggestions" { "Suggestions" }
                    textarea class="form-control" id="suggestions" name="suggestions" rows="3" {
                        (self.state.suggestions)
                    }
                }
                button type="submit" class="btn btn-primary" { "Submit feedback" }
            }
        }
        .render_to(buffer);
    }
}

pub struct ThankYou;

impl Renderable for ThankYou {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="text-center py-5" {
                h1 { "Thank you!" }
                p class="lead" { "Your feedback has been recorded." }
                a class="btn btn-outline-primary" href="/" { "Back to the home page" }
            }
        }
        .render_to(buffer);
    }
}
