use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use hypertext::Rendered;

pub fn see_other_ok(r: Redirect) -> StandardResponse {
    Ok(SuccessResponse::SeeOther(Box::new(r)))
}

pub fn err_not_found() -> StandardResponse {
    Err(FailureResponse::NotFound(()))
}

pub fn bad_request(html: Rendered<String>) -> StandardResponse {
    Err(FailureResponse::BadRequest(html))
}

pub fn forbidden(html: Rendered<String>) -> StandardResponse {
    Err(FailureResponse::Forbidden(html))
}

pub fn success(html: Rendered<String>) -> StandardResponse {
    Ok(SuccessResponse::Success(html))
}

pub fn download(
    content_type: &'static str,
    filename: String,
    bytes: Vec<u8>,
) -> StandardResponse {
    Ok(SuccessResponse::Download {
        content_type,
        filename,
        bytes,
    })
}

pub type StandardResponse = Result<SuccessResponse, FailureResponse>;

pub enum SuccessResponse {
    Success(Rendered<String>),
    SeeOther(Box<Redirect>),
    Download {
        content_type: &'static str,
        filename: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(Rendered<String>),
    NotFound(()),
    Forbidden(Rendered<String>),
    ServerError(Option<Rendered<String>>),
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        match self {
            SuccessResponse::Success(html) => {
                Html(html.into_inner()).into_response()
            }
            SuccessResponse::SeeOther(redirect) => redirect.into_response(),
            SuccessResponse::Download {
                content_type,
                filename,
                bytes,
            } => (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response(),
        }
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        match self {
            FailureResponse::BadRequest(html) => {
                (StatusCode::BAD_REQUEST, Html(html.into_inner()))
                    .into_response()
            }
            FailureResponse::NotFound(()) => {
                (StatusCode::NOT_FOUND, "Not found").into_response()
            }
            FailureResponse::Forbidden(html) => {
                (StatusCode::FORBIDDEN, Html(html.into_inner())).into_response()
            }
            FailureResponse::ServerError(Some(html)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Html(html.into_inner()))
                    .into_response()
            }
            FailureResponse::ServerError(None) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .into_response()
            }
        }
    }
}

impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        tracing::error!("database error: {e}");
        FailureResponse::ServerError(None)
    }
}
