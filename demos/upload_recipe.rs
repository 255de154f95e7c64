//! Example: upload recipe photos and wait for the extracted recipe.
//!
//! Run with: `cargo run --example upload_recipe -- "Recipe name" photo1.jpg photo2.jpg`
//!
//! The server is taken from `RECIPE_JOBS_BASE_URL` (default
//! `http://127.0.0.1:8000`); set `RUST_LOG=recipe_jobs=debug` to see requests.

use recipe_jobs::{ClientConfig, ClientCtx, ClientState, FnStateObserver, ImageSource, RecipeWorkflow};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let name = args.next().ok_or("usage: upload_recipe <name> <photo>...")?;
    let photos: Vec<ImageSource> = args.map(|p| ImageSource::Path(PathBuf::from(p))).collect();

    let ctx = ClientCtx::from_config(ClientConfig::from_env())?;
    println!("Uploading {} photo(s) to {}", photos.len(), ctx.base_url);

    let workflow = RecipeWorkflow::new(&ctx).with_observer(Arc::new(FnStateObserver(
        |state: &ClientState| match state {
            ClientState::Polling { job_id } => println!("[polling] job {}", job_id),
            ClientState::Failed(reason) => println!("[failed] {}", reason),
            other => println!("[{}]", other.label()),
        },
    )));

    let cancel = workflow.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match workflow.run_sources(&name, photos).await {
        ClientState::Succeeded { payload, .. } => {
            println!("\nRecipe:\n{}", payload.unwrap_or_default());
            Ok(())
        }
        ClientState::Failed(reason) => Err(reason.into()),
        other => Err(format!("workflow ended in {}", other.label()).into()),
    }
}
