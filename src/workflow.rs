//! Encode → submit → poll, as one forward-only state machine.
//!
//! [`RecipeWorkflow::run`] consumes the workflow: a finished instance cannot
//! be restarted, and retrying means building a new one (and accepting that
//! the server may end up with a duplicate job).
//!
//! # Example
//!
//! ```no_run
//! use recipe_jobs::{Attachment, ClientCtx, ClientState, RecipeWorkflow};
//!
//! # async fn demo(photo: Vec<u8>) -> recipe_jobs::Result<()> {
//! let ctx = ClientCtx::builder("http://127.0.0.1:8000").build()?;
//! let workflow = RecipeWorkflow::new(&ctx);
//! let mut states = workflow.subscribe();
//!
//! tokio::spawn(async move {
//!     while states.changed().await.is_ok() {
//!         println!("{}", states.borrow().label());
//!     }
//! });
//!
//! match workflow.run("Grandma's curry", vec![Attachment::jpeg(0, photo)]).await {
//!     ClientState::Succeeded { payload, .. } => println!("{:?}", payload),
//!     ClientState::Failed(reason) => eprintln!("{}", reason),
//!     _ => unreachable!("run always ends in a terminal state"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::cancel::CancelFlag;
use crate::ctx::ClientCtx;
use crate::error::{SubmissionError, WorkflowError};
use crate::loader::{load_attachments, ImageSource};
use crate::multipart::{self, Attachment};
use crate::state::{notify, ClientState, StateObserver};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

/// Multipart field carrying the caller's free text.
pub const RECIPE_NAME_FIELD: &str = "recipe_name";

/// One recipe upload, from photos to finished job.
pub struct RecipeWorkflow {
    ctx: ClientCtx,
    state: watch::Sender<ClientState>,
    cancel: CancelFlag,
    observer: Option<Arc<dyn StateObserver>>,
}

impl RecipeWorkflow {
    pub fn new(ctx: &ClientCtx) -> Self {
        let (state, _) = watch::channel(ClientState::Idle);
        Self {
            ctx: ctx.clone(),
            state,
            cancel: CancelFlag::new(),
            observer: None,
        }
    }

    /// Attach an observer that sees every transition in order.
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancellation(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receiver for the latest state. Can be taken any number of times.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// Handle that cancels whichever of submit/poll is running.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> ClientState {
        self.state.borrow().clone()
    }

    fn transition(&self, next: ClientState) {
        let current = self.state.borrow().rank();
        debug_assert!(
            next.rank() > current,
            "workflow may only move forward ({} -> {})",
            current,
            next.label()
        );
        match &next {
            ClientState::Failed(reason) => warn!(%reason, "workflow failed"),
            other => info!(state = other.label(), "workflow state changed"),
        }
        notify(&self.observer, &next);
        self.state.send_replace(next);
    }

    fn fail(&self, reason: impl Into<WorkflowError>) -> ClientState {
        let failed = ClientState::Failed(reason.into());
        self.transition(failed.clone());
        failed
    }

    /// Upload `images` under `recipe_name` and wait for the job to finish.
    ///
    /// Always returns a terminal state, the same one last published to
    /// subscribers.
    pub async fn run(self, recipe_name: &str, images: Vec<Attachment>) -> ClientState {
        let span = info_span!("recipe_workflow", recipe = %recipe_name, photos = images.len());
        async move {
            if images.is_empty() {
                return self.fail(SubmissionError::BadInput);
            }
            self.transition(ClientState::Uploading);
            self.upload_and_wait(recipe_name, images).await
        }
        .instrument(span)
        .await
    }

    /// Like [`run`](Self::run), but loads the photos first.
    ///
    /// Any source that cannot be loaded fails the whole workflow before
    /// anything is sent.
    pub async fn run_sources(self, recipe_name: &str, sources: Vec<ImageSource>) -> ClientState {
        let span = info_span!("recipe_workflow", recipe = %recipe_name, photos = sources.len());
        async move {
            if sources.is_empty() {
                return self.fail(SubmissionError::BadInput);
            }
            self.transition(ClientState::Uploading);
            let images = match load_attachments(sources, self.ctx.config.max_parallel_loads)
                .await
                .into_result()
            {
                Ok(images) => images,
                Err(err) => return self.fail(err),
            };
            self.upload_and_wait(recipe_name, images).await
        }
        .instrument(span)
        .await
    }

    /// Run on a background task. Dropping the handle does not cancel it; use
    /// [`cancel_handle`](Self::cancel_handle) for that.
    pub fn spawn(
        self,
        recipe_name: impl Into<String>,
        images: Vec<Attachment>,
    ) -> (JoinHandle<ClientState>, watch::Receiver<ClientState>) {
        let states = self.subscribe();
        let recipe_name = recipe_name.into();
        let handle = tokio::spawn(async move { self.run(&recipe_name, images).await });
        (handle, states)
    }

    async fn upload_and_wait(&self, recipe_name: &str, images: Vec<Attachment>) -> ClientState {
        let request = match multipart::encode(&[(RECIPE_NAME_FIELD, recipe_name)], &images) {
            Ok(request) => request,
            Err(err) => return self.fail(err),
        };
        drop(images);

        let job_id = match self
            .ctx
            .submitter()
            .submit(&request, Some(&self.cancel))
            .await
        {
            Ok(job_id) => job_id,
            Err(err) => return self.fail(err),
        };
        drop(request);

        self.transition(ClientState::Polling {
            job_id: job_id.clone(),
        });

        match self.ctx.poller().wait(&job_id, Some(&self.cancel)).await {
            Ok(status) => {
                let done = ClientState::Succeeded {
                    job_id,
                    payload: status.payload,
                };
                self.transition(done.clone());
                done
            }
            Err(err) => self.fail(err),
        }
    }
}

impl std::fmt::Debug for RecipeWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeWorkflow")
            .field("base_url", &self.ctx.base_url)
            .field("state", &self.state.borrow().label())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
