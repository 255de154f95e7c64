//! # Recipe Jobs
//!
//! Client for an asynchronous recipe-extraction job queue: photos of a recipe
//! go up as a multipart upload, the server hands back a job id, and the
//! client polls that job until it is done or a deadline passes.
//!
//! Everything the user should see is reduced to one forward-only
//! [`ClientState`]: `Idle → Uploading → Polling → Succeeded | Failed`.
//!
//! ## Core Concepts
//!
//! - **[`ClientCtx`]** — shared context (HTTP client, backend, base URL,
//!   intervals and timeouts). Build once, share across workflows.
//! - **[`RecipeWorkflow`]** — one upload: encode, submit, poll. Publishes its
//!   state on a `watch` channel and to an optional [`StateObserver`].
//! - **[`multipart::encode`]** — pure `multipart/form-data` body builder.
//! - **[`JobSubmissionClient`]** / **[`JobPoller`]** — the two HTTP steps,
//!   usable on their own.
//! - **[`Backend`]** — the HTTP seam. [`HttpBackend`] for real servers,
//!   [`MockBackend`] for tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use recipe_jobs::{ClientCtx, ClientState, ImageSource, RecipeWorkflow};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ClientCtx::builder("http://127.0.0.1:8000").build()?;
//!
//!     let photos = vec![ImageSource::Path(PathBuf::from("card.jpg"))];
//!     match RecipeWorkflow::new(&ctx).run_sources("Pad thai", photos).await {
//!         ClientState::Succeeded { payload, .. } => println!("{}", payload.unwrap_or_default()),
//!         ClientState::Failed(reason) => eprintln!("{}", reason),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Nothing here retries on its own. Submitting again after a failure may
//! create a second job on the server.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod ctx;
pub mod error;
pub mod loader;
pub mod multipart;
pub mod poll;
pub mod state;
pub mod submit;
pub mod types;
pub mod workflow;

pub use backend::{Backend, HttpBackend, MockBackend, MockReply};
pub use cancel::CancelFlag;
pub use config::ClientConfig;
pub use ctx::{ClientCtx, ClientCtxBuilder};
pub use error::{EncodingError, PollError, Result, SubmissionError, WorkflowError};
pub use loader::{load_attachments, ImageSource, LoadReport};
pub use multipart::{Attachment, MultipartRequest};
pub use poll::{JobPoller, TerminalPolicy};
pub use state::{ClientState, FnStateObserver, StateObserver};
pub use submit::JobSubmissionClient;
pub use types::{JobId, JobStatus, StatusKind};
pub use workflow::RecipeWorkflow;
