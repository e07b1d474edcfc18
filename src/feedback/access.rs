//! The shared access code that lets anonymous visitors see the results.

use diesel::{connection::LoadConnection, sqlite::Sqlite};

use crate::{
    feedback::{
        Feedback,
        store::{FeedbackStore, ReadGrant},
    },
    settings::Setting,
};

pub const RESULTS_PASSWORD_KEY: &str = "results_password";

/// Why the gate stayed shut. The messages deliberately do not reveal whether
/// a code has been configured at all.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Public results are disabled.")]
    Disabled,
    #[error("Invalid access code.")]
    InvalidCode,
}

#[derive(thiserror::Error, Debug)]
pub enum GateError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] diesel::result::Error),
}

/// Compares the supplied code with the stored one. An empty stored code
/// closes the gate; it never means "no code needed". The comparison is exact
/// and case-sensitive.
pub fn check_code(stored: Option<&str>, supplied: &str) -> Result<(), AccessDenied> {
    let stored = stored.unwrap_or("");
    if stored.is_empty() && supplied.is_empty() {
        Err(AccessDenied::Disabled)
    } else if stored != supplied {
        Err(AccessDenied::InvalidCode)
    } else {
        Ok(())
    }
}

/// Checks `supplied` and, if it matches, returns every record newest first.
/// Nothing is read from the feedback table unless the check passes.
pub fn authorize(
    supplied: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<Feedback>, GateError> {
    let stored = Setting::fetch(RESULTS_PASSWORD_KEY, conn)?;

    if let Err(denied) = check_code(stored.as_ref().map(|s| s.value.as_str()), supplied)
    {
        tracing::info!(reason = ?denied, "results access denied");
        return Err(denied.into());
    }

    let grant = ReadGrant::for_access_code();
    Ok(FeedbackStore::new(conn).load_all(&grant)?)
}
