use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use hypertext::{Rendered, prelude::*};
use serde::Deserialize;
use url::Url;

use crate::{
    app_config::AppConfig,
    auth::{User, clear_login_cookie, set_login_cookie},
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, see_other_ok, success},
    widgets::alert::ErrorAlert,
};

#[derive(Deserialize, Default)]
pub struct LoginQuery {
    next: Option<String>,
}

struct LoginForm<'a> {
    next: Option<&'a str>,
    error: Option<&'a str>,
}

impl Renderable for LoginForm<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="mx-auto" style="max-width: 28rem;" {
                h1 class="h3 mb-3" { "Admin login" }
                @if let Some(error) = self.error {
                    ErrorAlert msg=(error);
                }
                form method="post" action="/login" {
                    @if let Some(next) = self.next {
                        input type="hidden" name="next" value=(next);
                    }
                    div class="mb-3" {
                        label for="id" class="form-label" { "Username or email" }
                        input type="text" class="form-control" id="id" name="id";
                    }
                    div class="mb-3" {
                        label for="password" class="form-label" { "Password" }
                        input type="password" class="form-control" id="password" name="password";
                    }
                    button type="submit" class="btn btn-primary" { "Log in" }
                }
            }
        }
        .render_to(buffer);
    }
}

fn login_form_page(
    config: &AppConfig,
    next: Option<&str>,
    error: Option<&str>,
) -> Rendered<String> {
    Page::<_, false>::new()
        .site_name(&config.site_name)
        .title("Login")
        .body(LoginForm { next, error })
        .render()
}

pub async fn login_page(
    user: Option<User<false>>,
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<LoginQuery>,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to(&local_path(query.next.as_deref())));
    }

    success(login_form_page(&config, query.next.as_deref(), None))
}

#[derive(Deserialize)]
pub struct LoginSubmission {
    id: String,
    password: String,
    next: Option<String>,
}

pub async fn do_login(
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
    jar: PrivateCookieJar,
    axum_extra::extract::Form(form): axum_extra::extract::Form<LoginSubmission>,
) -> Result<(PrivateCookieJar, Redirect), FailureResponse> {
    let user = User::<false>::find_by_login(&form.id, &mut *conn)?;

    let Some(user) = user.filter(|u| u.verify_password(&form.password)) else {
        tracing::info!("failed login attempt for {}", form.id);
        // the same message whether the account exists or not
        return Err(FailureResponse::BadRequest(login_form_page(
            &config,
            form.next.as_deref(),
            Some("Incorrect username or password."),
        )));
    };

    tracing::info!("{} logged in", user.username);
    let jar = set_login_cookie(user.id, jar);
    Ok((jar, Redirect::to(&local_path(form.next.as_deref()))))
}

pub async fn do_logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (clear_login_cookie(jar), Redirect::to("/"))
}

/// Only paths on this site are followed after logging in.
fn local_path(next: Option<&str>) -> String {
    let Some(next) = next else {
        return "/".to_string();
    };
    Url::parse("http://localhost/")
        .and_then(|base| base.join(next))
        .ok()
        .filter(|url| url.host_str() == Some("localhost"))
        .map(|url| url.path().to_string())
        .unwrap_or_else(|| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::local_path;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(local_path(None), "/");
        assert_eq!(local_path(Some("/admin/feedback")), "/admin/feedback");
        assert_eq!(local_path(Some("https://evil.example/phish")), "/");
        assert_eq!(local_path(Some("//evil.example/phish")), "/");
    }
}
