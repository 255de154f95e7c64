use recipe_jobs::backend::HttpRequest;
use recipe_jobs::{
    Attachment, ClientCtx, ClientState, FnStateObserver, JobId, MockBackend, MockReply, PollError,
    RecipeWorkflow, SubmissionError, TerminalPolicy, WorkflowError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE1, 0x42];

fn ctx(mock: &Arc<MockBackend>) -> ClientCtx {
    ClientCtx::builder("http://127.0.0.1:8000/")
        .backend(mock.clone())
        .poll_interval(Duration::from_secs(1))
        .poll_timeout(Duration::from_secs(20))
        .request_timeout(Duration::from_secs(5))
        .build()
        .expect("valid context")
}

fn photos(n: usize) -> Vec<Attachment> {
    (0..n).map(|i| Attachment::jpeg(i, JPEG.to_vec())).collect()
}

fn labels(seen: &Mutex<Vec<&'static str>>) -> Vec<&'static str> {
    seen.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn full_workflow_reaches_succeeded() {
    let _ = tracing_subscriber::fmt::try_init();

    let mock = Arc::new(MockBackend::new(vec![
        MockReply::json(201, r#"{"job_id":"r-100","status":"pending"}"#),
        MockReply::json(200, r#"{"job_id":"r-100","status":"pending"}"#),
        MockReply::json(200, "oops, not json"),
        MockReply::json(
            200,
            r#"{"job_id":"r-100","status":"done","recipe":{"title":"Shakshuka","steps":3}}"#,
        ),
    ]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let start = Instant::now();
    let end = RecipeWorkflow::new(&ctx(&mock))
        .with_observer(Arc::new(FnStateObserver(move |s: &ClientState| {
            sink.lock().unwrap().push(s.label())
        })))
        .run("Shakshuka", photos(2))
        .await;

    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(labels(&seen), vec!["uploading", "polling", "succeeded"]);

    let ClientState::Succeeded { job_id, payload } = end.clone() else {
        panic!("expected success, got {:?}", end);
    };
    assert_eq!(job_id, JobId::new("r-100"));
    let recipe: serde_json::Value = serde_json::from_str(&payload.unwrap()).unwrap();
    assert_eq!(recipe["recipe"]["title"], "Shakshuka");

    let requests: Vec<HttpRequest> = mock.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].url, "http://127.0.0.1:8000/jobs");
    assert!(requests[1..]
        .iter()
        .all(|r| r.url == "http://127.0.0.1:8000/jobs/r-100"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"recipe_name\"\r\n\r\nShakshuka\r\n"));
    assert!(body.contains("name=\"files\"; filename=\"photo0.jpg\""));
    assert!(body.contains("name=\"files\"; filename=\"photo1.jpg\""));
}

#[tokio::test]
async fn empty_selection_never_touches_the_network() {
    let mock = Arc::new(MockBackend::fixed(MockReply::json(201, "{}")));
    let end = RecipeWorkflow::new(&ctx(&mock)).run("Empty", Vec::new()).await;

    assert_eq!(end, ClientState::Failed(SubmissionError::BadInput.into()));
    if let ClientState::Failed(reason) = &end {
        assert_eq!(reason.to_string(), "no photos selected");
    }
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn explicit_failure_status_with_opt_in_policy() {
    let mock = Arc::new(MockBackend::new(vec![
        MockReply::json(202, r#"{"job_id":"bad","status":"pending"}"#),
        MockReply::json(200, r#"{"job_id":"bad","status":"failed"}"#),
    ]));
    let ctx = ClientCtx::builder("http://127.0.0.1:8000")
        .backend(mock.clone())
        .terminal_policy(TerminalPolicy::DoneOrFailed)
        .build()
        .unwrap();

    let end = RecipeWorkflow::new(&ctx).run("Flan", photos(1)).await;
    assert_eq!(
        end,
        ClientState::Failed(WorkflowError::Poll(PollError::JobFailed {
            status: "failed".into()
        }))
    );
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_workflows_are_independent() {
    let ok = Arc::new(MockBackend::new(vec![
        MockReply::json(201, r#"{"job_id":"a","status":"pending"}"#),
        MockReply::json(200, r#"{"job_id":"a","status":"done"}"#),
    ]));
    let broken = Arc::new(MockBackend::fixed(MockReply::json(503, "maintenance")));

    let (a, b) = tokio::join!(
        RecipeWorkflow::new(&ctx(&ok)).run("A", photos(1)),
        RecipeWorkflow::new(&ctx(&broken)).run("B", photos(1)),
    );

    assert!(matches!(a, ClientState::Succeeded { .. }));
    assert!(matches!(
        b,
        ClientState::Failed(WorkflowError::Submission(SubmissionError::ServerRejected { status: 503, .. }))
    ));
}
