//! Extraction of urlencoded form bodies with nested keys, such as
//! `sections[0][label]=Venue`, which the plain `Form` extractor cannot
//! deserialize.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use hypertext::prelude::*;
use serde::de::DeserializeOwned;

use crate::util_resp::FailureResponse;

/// Browsers percent-encode the brackets, so the parser runs in non-strict
/// mode.
pub fn parse_nested<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_qs::Error> {
    serde_qs::Config::new(5, false).deserialize_bytes(body)
}

pub struct QsForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for QsForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = FailureResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!("could not read form body: {e}");
            FailureResponse::BadRequest(
                maud! { "Error: the form could not be read." }.render(),
            )
        })?;

        parse_nested(&bytes).map(QsForm).map_err(|e| {
            tracing::debug!("malformed form body: {e}");
            FailureResponse::BadRequest(
                maud! { "Error: the submitted form was malformed." }.render(),
            )
        })
    }
}
