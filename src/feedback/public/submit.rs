use std::sync::Arc;

use axum::extract::State;
use hypertext::{Rendered, prelude::*};

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::{
        config_store::load_schema,
        form_schema::FormSchema,
        render::{FormRenderer, ThankYou},
        store::FeedbackStore,
        submission::{SubmitError, submit},
        validate::FormState,
    },
    form::QsForm,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, bad_request, success},
};

fn form_page<const TX: bool>(
    user: Option<User<TX>>,
    config: &AppConfig,
    schema: &FormSchema,
    state: &FormState,
    error: Option<String>,
) -> Rendered<String> {
    Page::new()
        .user_opt(user)
        .site_name(&config.site_name)
        .title("Feedback")
        .body(FormRenderer {
            schema,
            state,
            error,
        })
        .render()
}

pub async fn feedback_page(
    user: Option<User<false>>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let schema = load_schema(&mut *conn)?;
    success(form_page(user, &config, &schema, &FormState::default(), None))
}

pub async fn do_submit_feedback(
    user: Option<User<true>>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<true>,
    QsForm(state): QsForm<FormState>,
) -> StandardResponse {
    let schema = load_schema(&mut *conn)?;

    let mut store = FeedbackStore::new(&mut *conn);
    match submit(&state, &schema, &mut store) {
        Ok(_) => success(
            Page::new()
                .user_opt(user)
                .site_name(&config.site_name)
                .title("Thank you")
                .body(ThankYou)
                .render(),
        ),
        Err(SubmitError::Rejected(e)) => {
            bad_request(form_page(user, &config, &schema, &state, Some(e.to_string())))
        }
        Err(SubmitError::Failed(e)) => Err(FailureResponse::ServerError(Some(
            form_page(
                user,
                &config,
                &schema,
                &state,
                Some(format!("{e}. Your answers have been kept, please try again.")),
            ),
        ))),
    }
}
