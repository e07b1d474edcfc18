use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use hypertext::prelude::*;
use tower_http::trace::TraceLayer;

use crate::{
    app_config::AppConfig,
    auth::{
        User,
        login::{do_login, do_logout, login_page},
    },
    feedback::{
        manage::{
            access::{access_code_page, do_set_access_code},
            config::{do_edit_form_config, form_config_page},
            export::{export_csv, export_pdf, export_single_pdf},
            table::{do_delete_feedback, feedback_dashboard_page, view_feedback_page},
        },
        public::{
            results::{do_view_results, results_page},
            submit::{do_submit_feedback, feedback_page},
        },
    },
    state::{AppState, DbPool, commit_transactions},
    template::Page,
    util_resp::{StandardResponse, success},
};

pub async fn home(
    user: Option<User<false>>,
    State(config): State<Arc<AppConfig>>,
) -> StandardResponse {
    success(
        Page::new()
            .user_opt(user)
            .site_name(&config.site_name)
            .body(maud! {
                div class="text-center py-5" {
                    h1 class="mb-4" { (config.site_name) }
                    p class="lead" { "Tell us how the event went." }
                    div class="d-flex justify-content-center gap-2" {
                        a class="btn btn-primary btn-lg" href="/feedback" { "Give feedback" }
                        a class="btn btn-outline-secondary btn-lg" href="/results" { "See the results" }
                    }
                }
            })
            .render(),
    )
}

/// The key which encrypts the login cookie. Without a usable secret a random
/// one is generated, so sessions do not survive a restart.
pub fn session_key(config: &AppConfig) -> Key {
    match config.secret_key.as_deref().map(|s| Key::try_from(s.as_bytes())) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            tracing::warn!("the configured secret key is unusable ({e}); generating one");
            Key::generate()
        }
        None => {
            tracing::warn!("no secret key configured; generating one");
            Key::generate()
        }
    }
}

pub fn create_app(pool: DbPool, config: AppConfig) -> Router {
    let state = AppState {
        pool,
        key: session_key(&config),
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(do_login))
        .route("/logout", post(do_logout))
        .route("/feedback", get(feedback_page).post(do_submit_feedback))
        .route("/results", get(results_page).post(do_view_results))
        .route("/admin/feedback", get(feedback_dashboard_page))
        .route("/admin/feedback/export.csv", get(export_csv))
        .route("/admin/feedback/export.pdf", get(export_pdf))
        .route(
            "/admin/feedback/form",
            get(form_config_page).post(do_edit_form_config),
        )
        .route(
            "/admin/feedback/access",
            get(access_code_page).post(do_set_access_code),
        )
        .route("/admin/feedback/:id", get(view_feedback_page))
        .route("/admin/feedback/:id/delete", post(do_delete_feedback))
        .route("/admin/feedback/:id/export.pdf", get(export_single_pdf))
        .layer(middleware::from_fn(commit_transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
