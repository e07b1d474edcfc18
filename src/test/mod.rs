//! End-to-end tests which drive the whole router against an in-memory
//! database, the same way a browser would.

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    response::Response,
};
use tower::ServiceExt;

use crate::{
    app_config::AppConfig,
    auth::create_admin,
    config::create_app,
    state::{DbPool, make_pool, run_migrations},
};

// This is a macro rather than a function so that the panic points at the
// call site.
macro_rules! assert_res_ok {
    ($response:expr) => {
        assert!(
            $response.status().is_success()
                || $response.status().is_redirection(),
            "response status = {:?}, str = {}",
            $response.status(),
            $crate::test::body_string($response).await
        );
    };
}
pub(crate) use assert_res_ok;

mod admin_flow;
mod feedback_flow;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

pub fn test_app() -> (Router, DbPool) {
    let pool = make_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();
    let config = AppConfig {
        database_url: ":memory:".to_string(),
        secret_key: Some("0".repeat(64)),
        ..Default::default()
    };
    (create_app(pool.clone(), config), pool)
}

pub async fn send(app: &Router, request: Request) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form<K: AsRef<str>, V: AsRef<str>>(
    uri: &str,
    pairs: &[(K, V)],
    cookie: Option<&str>,
) -> Request {
    let pairs: Vec<(&str, &str)> =
        pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_urlencoded::to_string(&pairs).unwrap()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(response: Response) -> String {
    String::from_utf8_lossy(&body_bytes(response).await).to_string()
}

pub fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

/// Creates the admin account and returns the session cookie to send back.
pub async fn login_as_admin(app: &Router, pool: &DbPool) -> String {
    {
        let mut conn = pool.get().unwrap();
        create_admin(ADMIN_USERNAME, "admin@example.com", ADMIN_PASSWORD, &mut conn)
            .unwrap();
    }

    let response = send(
        app,
        post_form(
            "/login",
            &[("id", ADMIN_USERNAME), ("password", ADMIN_PASSWORD)],
            None,
        ),
    )
    .await;
    assert!(response.status().is_redirection());

    response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// A complete, valid submission for the default form.
pub fn valid_submission<'a>(name: &'a str, phone: &'a str, overall: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("fields[name]", name),
        ("fields[phone]", phone),
        ("fields[email]", ""),
        ("sections[overall][rating]", overall),
        ("sections[overall][comments]", "Great event"),
        ("sections[venue][rating]", "4"),
        ("sections[venue][comments]", ""),
        ("suggestions", ""),
    ]
}
