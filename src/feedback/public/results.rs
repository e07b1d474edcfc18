use std::sync::Arc;

use axum::extract::State;
use hypertext::{Rendered, prelude::*};
use serde::Deserialize;

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::{
        Feedback,
        access::{GateError, authorize},
        aggregate::compute_averages,
        config_store::load_schema,
        export::DATE_FORMAT,
        form_schema::{FormSchema, KnownSection},
    },
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, forbidden, success},
    widgets::{alert::ErrorAlert, stat_card::StatCard},
};

struct CodeForm<'a> {
    error: Option<&'a str>,
}

impl Renderable for CodeForm<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="mx-auto" style="max-width: 28rem;" {
                h1 class="h3 mb-3" { "Feedback results" }
                @if let Some(error) = self.error {
                    ErrorAlert msg=(error);
                }
                form method="post" action="/results" {
                    div class="mb-3" {
                        label for="code" class="form-label" { "Access code" }
                        input type="password" class="form-control" id="code" name="code";
                    }
                    button type="submit" class="btn btn-primary" { "View results" }
                }
            }
        }
        .render_to(buffer);
    }
}

/// The results as shown to code holders. Contact details are never shown.
struct PublicResults<'a> {
    records: &'a [Feedback],
    schema: &'a FormSchema,
}

impl Renderable for PublicResults<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let averages = compute_averages(self.records);

        maud! {
            h1 class="mb-4" { "Feedback results" }
            StatCard
                averages=(&averages)
                responses=(self.records.len())
                schema=(self.schema);
            div class="table-responsive" {
                table class="table table-striped table-sm" {
                    thead {
                        tr {
                            th scope="col" { "Date" }
                            @for section in KnownSection::ALL {
                                th scope="col" { (self.schema.section_label(section.key())) }
                            }
                            th scope="col" { "Comments" }
                        }
                    }
                    tbody {
                        @for record in self.records {
                            tr {
                                td { (record.created_at.format(DATE_FORMAT).to_string()) }
                                @for section in KnownSection::ALL {
                                    td {
                                        (record.rating(section).map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()))
                                    }
                                }
                                td { (record.comments(KnownSection::Overall).unwrap_or("")) }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn code_page(
    user: Option<User<false>>,
    config: &AppConfig,
    error: Option<&str>,
) -> Rendered<String> {
    Page::new()
        .user_opt(user)
        .site_name(&config.site_name)
        .title("Results")
        .body(CodeForm { error })
        .render()
}

pub async fn results_page(
    user: Option<User<false>>,
    State(config): State<Arc<AppConfig>>,
) -> StandardResponse {
    success(code_page(user, &config, None))
}

#[derive(Deserialize)]
pub struct CodeSubmission {
    #[serde(default)]
    code: String,
}

pub async fn do_view_results(
    user: Option<User<false>>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<CodeSubmission>,
) -> StandardResponse {
    let records = match authorize(&form.code, &mut *conn) {
        Ok(records) => records,
        Err(GateError::Denied(denied)) => {
            return forbidden(code_page(user, &config, Some(&denied.to_string())));
        }
        Err(GateError::Store(e)) => return Err(FailureResponse::from(e)),
    };
    let schema = load_schema(&mut *conn)?;

    success(
        Page::new()
            .user_opt(user)
            .site_name(&config.site_name)
            .title("Results")
            .body(PublicResults {
                records: &records,
                schema: &schema,
            })
            .render(),
    )
}
