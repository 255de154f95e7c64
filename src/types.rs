use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier of one server-side job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job state as reported by the server.
///
/// Only [`StatusKind::Done`] ends polling under the default policy; every
/// other value, including unrecognized ones, is treated as still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Done,
    Failed,
    Unknown(String),
}

impl StatusKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" | "queued" | "running" | "processing" => StatusKind::Pending,
            "done" => StatusKind::Done,
            "failed" | "error" => StatusKind::Failed,
            other => StatusKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::Done => "done",
            StatusKind::Failed => "failed",
            StatusKind::Unknown(raw) => raw,
        }
    }
}

impl<'de> Deserialize<'de> for StatusKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StatusKind::parse(&raw))
    }
}

/// Body of a successful `POST /jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobAccepted {
    pub job_id: JobId,
    pub status: String,
}

/// One observation of a job, as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: JobId,
    pub status: StatusKind,
    /// Raw response body the status was decoded from.
    pub payload: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    job_id: JobId,
    status: StatusKind,
}

impl JobStatus {
    /// Decode a status response body, keeping the raw text as the payload.
    pub fn from_body(body: &str) -> serde_json::Result<Self> {
        let parsed: StatusBody = serde_json::from_str(body)?;
        Ok(Self {
            job_id: parsed.job_id,
            status: parsed.status,
            payload: Some(body.to_string()),
        })
    }

    /// Parse the raw payload into a typed `T` (e.g. the finished recipe).
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.payload.as_deref().unwrap_or("null"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_body_keeps_payload() {
        let body = r#"{"job_id":"abc","status":"done","recipe":{"title":"Curry"}}"#;
        let status = JobStatus::from_body(body).unwrap();
        assert_eq!(status.job_id, JobId::new("abc"));
        assert_eq!(status.status, StatusKind::Done);
        assert_eq!(status.payload.as_deref(), Some(body));

        let v: serde_json::Value = status.payload_as().unwrap();
        assert_eq!(v["recipe"]["title"], "Curry");
    }

    #[test]
    fn test_unknown_status_is_kept_raw() {
        let status = JobStatus::from_body(r#"{"job_id":"x","status":"archived"}"#).unwrap();
        assert_eq!(status.status, StatusKind::Unknown("archived".into()));
        assert_eq!(status.status.as_str(), "archived");
    }

    #[test]
    fn test_missing_status_is_an_error() {
        assert!(JobStatus::from_body(r#"{"job_id":"x"}"#).is_err());
        assert!(JobStatus::from_body("not json").is_err());
    }

    #[test]
    fn test_job_accepted_decodes() {
        let accepted: JobAccepted =
            serde_json::from_str(r#"{"job_id":"j-1","status":"pending"}"#).unwrap();
        assert_eq!(accepted.job_id.as_str(), "j-1");
        assert_eq!(accepted.status, "pending");
    }
}
