//! Admin accounts and the login session.
//!
//! There is no public registration: accounts are created from the command
//! line with `conclave create-admin`.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use chrono::{Days, NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    schema::users,
    state::{DbPool, ThreadSafeConn},
};

pub mod login;

pub const LOGIN_COOKIE: &str = "conclave_session";

const SESSION_DAYS: u64 = 7;

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct User<const TX: bool> {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

impl<const TX: bool> User<TX> {
    pub fn validate_username(username: &str) -> bool {
        (username.chars().count() > 3)
            && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn validate_password(password: &str) -> bool {
        password.len() > 6
    }

    pub fn verify_password(&self, password: &str) -> bool {
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!("user {} has a malformed password hash: {e}", self.id);
                false
            }
        }
    }

    /// Looks a user up by either their email address or their username.
    pub fn find_by_login(
        login: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Self>> {
        users::table
            .filter(users::email.eq(login).or(users::username.eq(login)))
            .first::<User<TX>>(conn)
            .optional()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CreateAdminError {
    #[error("usernames must be at least 4 letters, digits or underscores")]
    InvalidUsername,
    #[error("passwords must be longer than 6 characters")]
    InvalidPassword,
    #[error("a user with that username or email already exists")]
    Exists,
    #[error("could not hash the password: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] diesel::result::Error),
}

pub fn hash_password(password: &str) -> Result<String, CreateAdminError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CreateAdminError::Hash(e.to_string()))
}

/// Inserts a new admin account and returns its id.
pub fn create_admin(
    username: &str,
    email: &str,
    password: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<String, CreateAdminError> {
    if !User::<false>::validate_username(username) {
        return Err(CreateAdminError::InvalidUsername);
    }
    if !User::<false>::validate_password(password) {
        return Err(CreateAdminError::InvalidPassword);
    }
    if User::<false>::find_by_login(username, conn)?.is_some()
        || User::<false>::find_by_login(email, conn)?.is_some()
    {
        return Err(CreateAdminError::Exists);
    }

    let id = Uuid::now_v7().to_string();
    diesel::insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::email.eq(email),
            users::username.eq(username),
            users::password_hash.eq(hash_password(password)?),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    tracing::info!("created admin account {username}");
    Ok(id)
}

#[derive(Debug)]
pub enum AuthError {
    NoDatabase,
    /// Not signed in; carries the path to come back to after logging in.
    Unauthorized { next: String },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NoDatabase => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
            }
            AuthError::Unauthorized { next } => {
                let target = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("next", &next)
                    .finish();
                Redirect::to(&format!("/login?{target}")).into_response()
            }
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: String,
    expiry: NaiveDateTime,
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for User<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let next = parts.uri.path().to_string();
        let unauthorized = || AuthError::Unauthorized { next: next.clone() };

        let jar: PrivateCookieJar<Key> =
            PrivateCookieJar::from_request_parts(parts, state)
                .await
                .map_err(|_| unauthorized())?;

        let Some(login_cookie) = jar.get(LOGIN_COOKIE) else {
            return Err(unauthorized());
        };

        let login = match serde_json::from_str::<LoginSession>(login_cookie.value()) {
            Ok(t) if Utc::now().naive_utc() < t.expiry => t,
            _ => return Err(unauthorized()),
        };

        let conn_wrapper = ThreadSafeConn::<TX>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::NoDatabase)?;
        let mut conn = conn_wrapper.inner.lock().await;

        let user = users::table
            .filter(users::id.eq(login.id))
            .first::<User<TX>>(&mut *conn)
            .optional()
            .map_err(|e| {
                tracing::error!("could not load the session's user: {e}");
                AuthError::NoDatabase
            })?;

        user.ok_or_else(unauthorized)
    }
}

pub fn set_login_cookie(id: String, jar: PrivateCookieJar) -> PrivateCookieJar {
    let expiry = Utc::now()
        .naive_utc()
        .checked_add_days(Days::new(SESSION_DAYS))
        .unwrap_or(NaiveDateTime::MAX);
    let session = LoginSession { id, expiry };
    match serde_json::to_string(&session) {
        Ok(value) => {
            let mut cookie = Cookie::new(LOGIN_COOKIE, value);
            cookie.set_path("/");
            cookie.set_http_only(true);
            jar.add(cookie)
        }
        Err(e) => {
            tracing::error!("could not encode login session: {e}");
            jar
        }
    }
}

pub fn clear_login_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(LOGIN_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::test_support::memory_conn;

    #[test]
    fn created_admins_can_be_found_and_verified() {
        let mut conn = memory_conn();
        let id = create_admin("organiser", "org@example.com", "hunter22", &mut conn)
            .unwrap();

        let by_name = User::<false>::find_by_login("organiser", &mut conn)
            .unwrap()
            .unwrap();
        let by_email = User::<false>::find_by_login("org@example.com", &mut conn)
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_email.id, id);
        assert!(by_name.verify_password("hunter22"));
        assert!(!by_name.verify_password("hunter23"));
    }

    #[test]
    fn bad_accounts_are_refused() {
        let mut conn = memory_conn();
        assert!(matches!(
            create_admin("ab", "a@example.com", "hunter22", &mut conn),
            Err(CreateAdminError::InvalidUsername)
        ));
        assert!(matches!(
            create_admin("organiser", "a@example.com", "short", &mut conn),
            Err(CreateAdminError::InvalidPassword)
        ));
        create_admin("organiser", "a@example.com", "hunter22", &mut conn).unwrap();
        assert!(matches!(
            create_admin("organiser", "b@example.com", "hunter22", &mut conn),
            Err(CreateAdminError::Exists)
        ));
    }
}
