use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use hypertext::prelude::*;

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::{
        CustomData, Feedback,
        aggregate::compute_averages,
        config_store::load_schema,
        export::DATE_FORMAT,
        form_schema::{FormSchema, KnownField, KnownSection},
        store::{FeedbackStore, ReadGrant},
    },
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, err_not_found, see_other_ok, success},
    widgets::stat_card::StatCard,
};

pub async fn feedback_dashboard_page(
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let grant = ReadGrant::for_admin(&user);
    let records = FeedbackStore::new(&mut *conn).load_all(&grant)?;
    let schema = load_schema(&mut *conn)?;

    success(
        Page::new()
            .user(user)
            .site_name(&config.site_name)
            .title("Feedback")
            .body(FeedbackTableRenderer {
                records: &records,
                schema: &schema,
            })
            .render(),
    )
}

struct FeedbackTableRenderer<'a> {
    records: &'a [Feedback],
    schema: &'a FormSchema,
}

impl Renderable for FeedbackTableRenderer<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let averages = compute_averages(self.records);

        maud! {
            div class="d-flex justify-content-between flex-wrap flex-md-nowrap align-items-center pt-3 pb-2 mb-3 border-bottom" {
                h1 class="h2" { "Feedback" }
                div class="btn-group" role="group" {
                    a class="btn btn-sm btn-outline-secondary" href="/admin/feedback/export.csv" { "Export CSV" }
                    a class="btn btn-sm btn-outline-secondary" href="/admin/feedback/export.pdf" { "Export PDF" }
                }
            }

            StatCard
                averages=(&averages)
                responses=(self.records.len())
                schema=(self.schema);

            @if self.records.is_empty() {
                p class="text-muted" { "No feedback has been submitted yet." }
            } @else {
                div class="table-responsive" {
                    table class="table table-striped table-sm" {
                        thead {
                            tr {
                                th scope="col" { "Submitted" }
                                th scope="col" { (self.schema.field_label(KnownField::Name.key())) }
                                @for section in KnownSection::ALL {
                                    th scope="col" { (self.schema.section_label(section.key())) }
                                }
                                th scope="col" { "Actions" }
                            }
                        }
                        tbody {
                            @for record in self.records {
                                tr {
                                    td { (record.created_at.format(DATE_FORMAT).to_string()) }
                                    td { (record.field(KnownField::Name).unwrap_or("-")) }
                                    @for section in KnownSection::ALL {
                                        td {
                                            (record.rating(section).map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()))
                                        }
                                    }
                                    td {
                                        div class="btn-group" role="group" {
                                            a
                                                href=(format!("/admin/feedback/{}", record.id))
                                                class="btn btn-sm btn-outline-primary"
                                            {
                                                "View"
                                            }
                                            form method="post" action=(format!("/admin/feedback/{}/delete", record.id)) class="d-inline" {
                                                button type="submit" class="btn btn-sm btn-outline-danger" onclick="return confirm('Delete this response? This cannot be undone.')" { "Delete" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn view_feedback_page(
    Path(id): Path<String>,
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let grant = ReadGrant::for_admin(&user);
    let Some(record) = FeedbackStore::new(&mut *conn).fetch(&id, &grant)? else {
        return err_not_found();
    };
    let schema = load_schema(&mut *conn)?;
    let custom = record.custom_data().unwrap_or_default();

    success(
        Page::new()
            .user(user)
            .site_name(&config.site_name)
            .title("Response")
            .body(FeedbackDetailRenderer {
                record: &record,
                custom: &custom,
                schema: &schema,
            })
            .render(),
    )
}

struct FeedbackDetailRenderer<'a> {
    record: &'a Feedback,
    custom: &'a CustomData,
    schema: &'a FormSchema,
}

impl Renderable for FeedbackDetailRenderer<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let record = self.record;

        maud! {
            div class="d-flex justify-content-between flex-wrap align-items-center pt-3 pb-2 mb-3 border-bottom" {
                h1 class="h2" { "Response" }
                div class="btn-group" role="group" {
                    a class="btn btn-sm btn-outline-secondary" href=(format!("/admin/feedback/{}/export.pdf", record.id)) { "Export PDF" }
                    form method="post" action=(format!("/admin/feedback/{}/delete", record.id)) class="d-inline" {
                        button type="submit" class="btn btn-sm btn-outline-danger" onclick="return confirm('Delete this response? This cannot be undone.')" { "Delete" }
                    }
                }
            }
            p class="text-muted" { "Submitted " (record.created_at.format(DATE_FORMAT).to_string()) }

            dl class="row" {
                @for field in KnownField::ALL {
                    dt class="col-sm-3" { (self.schema.field_label(field.key())) }
                    dd class="col-sm-9" { (record.field(field).unwrap_or("-")) }
                }
                @for (key, value) in &self.custom.fields {
                    dt class="col-sm-3" { (self.schema.field_label(key)) }
                    dd class="col-sm-9" { (if value.is_empty() { "-" } else { value.as_str() }) }
                }
            }

            h2 class="h4 mt-4" { "Ratings" }
            table class="table table-sm" {
                thead {
                    tr {
                        th scope="col" { "Section" }
                        th scope="col" { "Rating" }
                        th scope="col" { "Comments" }
                    }
                }
                tbody {
                    @for section in KnownSection::ALL {
                        tr {
                            td { (self.schema.section_label(section.key())) }
                            td { (record.rating(section).map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())) }
                            td { (record.comments(section).unwrap_or("")) }
                        }
                    }
                    @for (key, answer) in &self.custom.sections {
                        tr {
                            td { (self.schema.section_label(key)) }
                            td { (answer.rating.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())) }
                            td { (answer.comments.as_deref().unwrap_or("")) }
                        }
                    }
                }
            }

            h2 class="h4 mt-4" { "Suggestions" }
            p { (record.suggestions.as_deref().unwrap_or("-")) }

            a class="btn btn-outline-primary" href="/admin/feedback" { "Back to all responses" }
        }
        .render_to(buffer);
    }
}

pub async fn do_delete_feedback(
    Path(id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    if FeedbackStore::new(&mut *conn).delete(&id, &user)? {
        see_other_ok(Redirect::to("/admin/feedback"))
    } else {
        err_not_found()
    }
}
