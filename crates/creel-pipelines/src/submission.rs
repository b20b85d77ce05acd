//! Validating job input and creating the job that will run it.

use std::future::Future;
use std::sync::Arc;

use creel_browser::BrowserSession;
use creel_core::JobKind;
use creel_jobs::{JobStore, Task};

use crate::error::{PipelineError, Result};

/// Input to one pipeline kind.
pub trait JobParams {
    /// Job kind these parameters run as.
    const KIND: JobKind;

    /// Reject malformed input before any job exists.
    fn validate(&self) -> Result<()>;
}

/// Validate `params` and create an in-progress job for them.
///
/// Invalid input creates no job.
pub async fn submit<P: JobParams>(store: Arc<dyn JobStore>, params: &P) -> Result<Task> {
    params.validate()?;
    let job = store.create(P::KIND).await?;
    tracing::info!("Created {} job {}", P::KIND, job.id);
    Ok(Task::new(store, job.id))
}

/// Shorthand for a validation failure.
pub(crate) fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::Validation(message.into())
}

/// Launch the browser, run `work`, and close the browser whatever happened.
pub(crate) async fn with_browser<T, Fut>(session: &BrowserSession, work: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    session.launch().await?;
    let outcome = work.await;
    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }
    outcome
}
