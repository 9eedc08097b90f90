//! Caller-side result of an admitted job.

use super::job::JobId;
use crate::classify::{ErrorInfo, ErrorKind};
use crate::document::DocumentType;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

/// Bytes produced for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub job_id: JobId,
    pub document_type: DocumentType,
    pub bytes: Vec<u8>,
    /// True when the bytes are plain-text fallback output.
    pub degraded: bool,
    /// The classified failure behind a degraded document.
    pub error: Option<ErrorInfo>,
}

/// Why a job produced no document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerateError {
    /// The job failed and fallback output was not produced.
    #[error("Job {job_id} failed: {info}")]
    Rejected { job_id: JobId, info: ErrorInfo },

    /// The service shut down before the job completed.
    #[error("Generation service is shut down")]
    ShutDown,
}

impl GenerateError {
    /// Classified failure, if the job actually ran.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Rejected { info, .. } => Some(info),
            Self::ShutDown => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.info().map(|info| info.kind)
    }
}

/// Final outcome delivered to the caller.
pub type JobOutcome = Result<RenderedDocument, GenerateError>;

/// Pending result of an admitted job.
///
/// Await it to get the outcome. Dropping the ticket does not remove the job;
/// it still runs and its result is discarded.
#[derive(Debug)]
pub struct JobTicket {
    job_id: JobId,
    receiver: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    pub(crate) fn new(job_id: JobId, receiver: oneshot::Receiver<JobOutcome>) -> Self {
        Self { job_id, receiver }
    }

    /// A ticket that is already resolved.
    pub(crate) fn resolved(job_id: JobId, outcome: JobOutcome) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(outcome);
        Self::new(job_id, receiver)
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl Future for JobTicket {
    type Output = JobOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the executor went away without answering.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(GenerateError::ShutDown)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolved_ticket() {
        let ticket = JobTicket::resolved(JobId::new("job-r"), Err(GenerateError::ShutDown));
        assert_eq!(ticket.job_id().as_str(), "job-r");
        assert_eq!(ticket.await, Err(GenerateError::ShutDown));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_shut_down() {
        let (sender, receiver) = oneshot::channel();
        let ticket = JobTicket::new(JobId::new("job-d"), receiver);
        drop(sender);
        assert_eq!(ticket.await, Err(GenerateError::ShutDown));
    }

    #[tokio::test]
    async fn test_ticket_delivers_document() {
        let (sender, receiver) = oneshot::channel();
        let ticket = JobTicket::new(JobId::new("job-ok"), receiver);
        sender
            .send(Ok(RenderedDocument {
                job_id: JobId::new("job-ok"),
                document_type: DocumentType::Report,
                bytes: b"%PDF".to_vec(),
                degraded: false,
                error: None,
            }))
            .unwrap();

        let document = ticket.await.unwrap();
        assert_eq!(document.bytes, b"%PDF");
    }

    #[test]
    fn test_generate_error_info() {
        let err = GenerateError::Rejected {
            job_id: JobId::new("job-x"),
            info: ErrorInfo::new(ErrorKind::Validation, "missing field"),
        };
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert_eq!(
            err.to_string(),
            "Job job-x failed: validation: missing field"
        );
        assert_eq!(GenerateError::ShutDown.kind(), None);
    }
}
