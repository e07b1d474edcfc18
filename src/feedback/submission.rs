use crate::feedback::{
    Feedback,
    form_schema::FormSchema,
    store::{FeedbackSink, PersistenceError},
    validate::{FormState, ValidationError, validate},
};

#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error(transparent)]
    Failed(#[from] PersistenceError),
}

/// Validates `state` against `schema` and, only if it passes, writes the
/// partitioned record to `sink`. The form state is never consumed, so the
/// caller can show it again after either kind of failure.
pub fn submit(
    state: &FormState,
    schema: &FormSchema,
    sink: &mut impl FeedbackSink,
) -> Result<Feedback, SubmitError> {
    let record = validate(state, schema).inspect_err(|e| {
        tracing::debug!("submission rejected at `{}`", e.key());
    })?;

    let stored = sink.append(record).inspect_err(|e| {
        tracing::warn!("could not store feedback: {e}");
    })?;

    tracing::info!(id = %stored.id, "feedback submitted");
    Ok(stored)
}
