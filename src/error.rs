use std::time::Duration;
use thiserror::Error;

/// Failure to turn an attachment or field into multipart bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The attachment carried no bytes at all.
    #[error("attachment '{filename}' is empty")]
    EmptyAttachment { filename: String },

    /// A header value (field name, filename, MIME type) would break the part framing.
    #[error("invalid {what} '{value}': must not contain CR, LF or '\"'")]
    InvalidHeaderValue { what: &'static str, value: String },

    /// An image source could not be read.
    #[error("failed to read image #{index}: {message}")]
    Unreadable { index: usize, message: String },

    /// An image source was readable but is not a supported image.
    #[error("image #{index} is not a supported image (expected JPEG, PNG or HEIC)")]
    UnsupportedImage { index: usize },
}

/// Failure of the create-job request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// No attachments were supplied; nothing was sent.
    #[error("no photos selected")]
    BadInput,

    /// The server answered with a non-2xx status.
    #[error("server rejected the upload (HTTP {status}): {body}")]
    ServerRejected { status: u16, body: String },

    /// The 2xx body was not `{job_id, status}` JSON.
    #[error("malformed job response: {0}")]
    MalformedResponse(String),

    /// Network-layer failure (timeout, DNS, connection reset).
    #[error("upload failed: {0}")]
    Transport(String),

    /// The workflow was cancelled while the request was in flight.
    #[error("upload cancelled")]
    Cancelled,
}

/// Failure while waiting for a job to finish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// A status request came back non-2xx. Polling stops at the first one.
    #[error("server rejected status request (HTTP {status}): {body}")]
    ServerRejected { status: u16, body: String },

    /// No terminal status was reported before the deadline.
    #[error("job did not finish within {}s", .waited.as_secs())]
    Timeout { waited: Duration },

    /// Network-layer failure or a request exceeding its own timeout.
    #[error("status request failed: {0}")]
    Transport(String),

    /// The server reported an explicit failure status (only under
    /// [`TerminalPolicy::DoneOrFailed`](crate::poll::TerminalPolicy::DoneOrFailed)).
    #[error("job failed with status '{status}'")]
    JobFailed { status: String },

    /// The status URL could not be built from the base URL.
    #[error("invalid status URL: {0}")]
    InvalidUrl(String),

    /// The workflow was cancelled while polling.
    #[error("polling cancelled")]
    Cancelled,
}

/// Any failure of a recipe workflow. Carried by [`ClientState::Failed`](crate::state::ClientState::Failed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// Invalid configuration detected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl WorkflowError {
    /// Whether this failure came from the caller supplying no photos.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, WorkflowError::Submission(SubmissionError::BadInput))
    }

    /// Whether this failure was a cancellation rather than a real error.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkflowError::Submission(SubmissionError::Cancelled)
                | WorkflowError::Poll(PollError::Cancelled)
        )
    }
}

impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        WorkflowError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
