use std::sync::Arc;

use axum::extract::State;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::access::RESULTS_PASSWORD_KEY,
    settings::Setting,
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::alert::SuccessAlert,
};

struct AccessCodeRenderer<'a> {
    current: &'a str,
    saved: bool,
}

impl Renderable for AccessCodeRenderer<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="pt-3 pb-2 mb-3 border-bottom" {
                h1 class="h2" { "Results access code" }
            }
            @if self.saved {
                SuccessAlert msg=("The access code has been saved.");
            }
            p {
                "Anyone with this code can see the averages and the submitted ratings and comments on "
                a href="/results" { "the results page" }
                ". Contact details are never shown there. Leave it empty to turn the results page off."
            }
            form method="post" action="/admin/feedback/access" {
                div class="mb-3" {
                    label for="code" class="form-label" { "Access code" }
                    input type="text" class="form-control" id="code" name="code" value=(self.current);
                }
                button type="submit" class="btn btn-primary" { "Save" }
            }
        }
        .render_to(buffer);
    }
}

pub async fn access_code_page(
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let current = Setting::fetch(RESULTS_PASSWORD_KEY, &mut *conn)?
        .map(|setting| setting.value)
        .unwrap_or_default();

    success(
        Page::new()
            .user(user)
            .site_name(&config.site_name)
            .title("Access code")
            .body(AccessCodeRenderer {
                current: &current,
                saved: false,
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct AccessCodeForm {
    #[serde(default)]
    code: String,
}

pub async fn do_set_access_code(
    user: User<true>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<true>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<AccessCodeForm>,
) -> StandardResponse {
    Setting::upsert(
        RESULTS_PASSWORD_KEY,
        &form.code,
        Some("Access code for the public results page"),
        &mut *conn,
    )?;
    if form.code.is_empty() {
        tracing::info!("{} disabled the public results page", user.username);
    } else {
        tracing::info!("{} changed the results access code", user.username);
    }

    success(
        Page::new()
            .user(user)
            .site_name(&config.site_name)
            .title("Access code")
            .body(AccessCodeRenderer {
                current: &form.code,
                saved: true,
            })
            .render(),
    )
}
