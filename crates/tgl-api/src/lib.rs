//! Toggl API client for submitting compressed events as time entries.
//!
//! Implements the slice of the Toggl API v8 the pipeline needs:
//!
//! - Workspace resolution by numeric id or by name
//! - Project lookup and creation, cached per client
//! - Time entry creation
//!
//! All calls are blocking; submission is a synchronous batch job. The
//! [`TimeTracker`] trait is the seam the submission driver works against,
//! so tests can substitute an in-memory tracker for [`TogglClient`].

use std::collections::HashMap;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tgl_core::Event;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum gap between consecutive requests, per Toggl's rate guidance.
const REQUEST_PACING: Duration = Duration::from_secs(1);

const TOGGL_API_URL: &str = "https://www.toggl.com/api/v8";

/// Fixed basic-auth password that marks the username as an API token.
const API_TOKEN_PASSWORD: &str = "api_token";

/// `created_with` value stamped on every submitted time entry.
const CREATED_WITH: &str = "tgl";

/// Errors that can occur when talking to Toggl.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provided API token was invalid.
    #[error("invalid API token: {reason}")]
    InvalidToken {
        /// Why the token was rejected.
        reason: &'static str,
    },

    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The HTTP request itself failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a short JSON or plain-text message.
        body: String,
    },

    /// The configured workspace matched neither an id nor a name.
    #[error("unknown workspace {0:?}")]
    UnknownWorkspace(String),

    /// The response body could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether this error is an HTTP 4xx answer from the API.
    ///
    /// Client errors will not resolve by retrying and usually point at a
    /// bad token or a malformed payload.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..500).contains(status))
    }
}

/// A project in a Toggl workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRef {
    /// Project id, used as `pid` on time entries.
    pub id: i64,
    /// Workspace the project belongs to.
    pub workspace_id: i64,
}

/// Remote time tracking service as seen by the submission driver.
///
/// Methods take `&mut self` so implementations can cache lookups between
/// calls.
pub trait TimeTracker {
    /// Projects known to the workspace, keyed by name.
    fn projects(&mut self) -> Result<HashMap<String, ProjectRef>, ApiError>;

    /// Creates a project in the workspace and returns its reference.
    fn create_project(&mut self, name: &str) -> Result<ProjectRef, ApiError>;

    /// Creates a time entry for one compressed event.
    fn create_time_entry(&mut self, project_id: i64, event: &Event) -> Result<(), ApiError>;
}

// ========== Wire types ==========

#[derive(Debug, Deserialize)]
struct Workspace {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: i64,
    wid: i64,
    name: String,
}

/// Toggl wraps created objects in a `data` envelope.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTimeEntry {
    id: i64,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'a> {
    project: ProjectPayload<'a>,
}

#[derive(Debug, Serialize)]
struct ProjectPayload<'a> {
    wid: i64,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTimeEntryRequest<'a> {
    time_entry: TimeEntryPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TimeEntryPayload<'a> {
    pid: i64,
    description: &'a str,
    start: String,
    duration: i64,
    tags: Vec<&'a str>,
    created_with: &'static str,
}

fn time_entry_request(project_id: i64, event: &Event) -> CreateTimeEntryRequest<'_> {
    CreateTimeEntryRequest {
        time_entry: TimeEntryPayload {
            pid: project_id,
            description: event.description.as_deref().unwrap_or(""),
            start: format_start(event.start),
            duration: event.duration,
            tags: event.tags.iter().map(String::as_str).collect(),
            created_with: CREATED_WITH,
        },
    }
}

/// Renders an epoch timestamp as local-time RFC 3339, the format Toggl
/// expects for `start`. Out-of-range values clamp to the epoch origin.
fn format_start(start: i64) -> String {
    DateTime::from_timestamp(start, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Matches the configured workspace against the account's workspace list.
///
/// A numeric value is first tried as a workspace id; anything else, or a
/// number that matches no id, is compared against workspace names.
fn resolve_workspace(workspaces: &[Workspace], wanted: &str) -> Option<i64> {
    if let Ok(id) = wanted.parse::<i64>() {
        if workspaces.iter().any(|workspace| workspace.id == id) {
            return Some(id);
        }
    }
    workspaces
        .iter()
        .find(|workspace| workspace.name == wanted)
        .map(|workspace| workspace.id)
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn check_status(response: reqwest::blocking::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// ========== Client ==========

/// Blocking client for one Toggl workspace.
pub struct TogglClient {
    http: reqwest::blocking::Client,
    api_token: String,
    workspace: String,
    workspace_id: Option<i64>,
    projects: Option<HashMap<String, ProjectRef>>,
    last_request: Option<Instant>,
}

impl fmt::Debug for TogglClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TogglClient")
            .field("api_token", &"[REDACTED]")
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl TogglClient {
    /// Creates a client for one workspace.
    ///
    /// `workspace` is either a numeric workspace id or a workspace name; it
    /// is resolved against the account on first use.
    pub fn new(
        api_token: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(ApiError::InvalidToken {
                reason: "token cannot be empty",
            });
        }
        if api_token.trim().is_empty() {
            return Err(ApiError::InvalidToken {
                reason: "token cannot be only whitespace",
            });
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            api_token,
            workspace: workspace.into(),
            workspace_id: None,
            projects: None,
            last_request: None,
        })
    }

    /// Resolves the configured workspace to its id, fetching the account's
    /// workspace list on first call.
    pub fn workspace_id(&mut self) -> Result<i64, ApiError> {
        if let Some(id) = self.workspace_id {
            return Ok(id);
        }
        let body = self.get("workspaces")?;
        let workspaces: Vec<Workspace> = parse_json(&body)?;
        let id = resolve_workspace(&workspaces, &self.workspace)
            .ok_or_else(|| ApiError::UnknownWorkspace(self.workspace.clone()))?;
        tracing::debug!(workspace = %self.workspace, id, "resolved workspace");
        self.workspace_id = Some(id);
        Ok(id)
    }

    fn fetch_projects(&mut self) -> Result<HashMap<String, ProjectRef>, ApiError> {
        let workspace_id = self.workspace_id()?;
        let body = self.get(&format!("workspaces/{workspace_id}/projects"))?;
        // The projects endpoint returns a JSON null for an empty workspace.
        let projects: Option<Vec<Project>> = parse_json(&body)?;
        Ok(projects
            .unwrap_or_default()
            .into_iter()
            .map(|project| {
                (
                    project.name,
                    ProjectRef {
                        id: project.id,
                        workspace_id: project.wid,
                    },
                )
            })
            .collect())
    }

    /// Sleeps off whatever remains of the pacing window since the last
    /// request.
    fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < REQUEST_PACING {
                thread::sleep(REQUEST_PACING - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn get(&mut self, path: &str) -> Result<String, ApiError> {
        self.pace();
        let response = self
            .http
            .get(format!("{TOGGL_API_URL}/{path}"))
            .basic_auth(&self.api_token, Some(API_TOKEN_PASSWORD))
            .send()?;
        check_status(response)
    }

    fn post<T: Serialize>(&mut self, path: &str, payload: &T) -> Result<String, ApiError> {
        self.pace();
        let response = self
            .http
            .post(format!("{TOGGL_API_URL}/{path}"))
            .basic_auth(&self.api_token, Some(API_TOKEN_PASSWORD))
            .json(payload)
            .send()?;
        check_status(response)
    }
}

impl TimeTracker for TogglClient {
    fn projects(&mut self) -> Result<HashMap<String, ProjectRef>, ApiError> {
        if let Some(projects) = &self.projects {
            return Ok(projects.clone());
        }
        let projects = self.fetch_projects()?;
        tracing::debug!(count = projects.len(), "fetched workspace projects");
        self.projects = Some(projects.clone());
        Ok(projects)
    }

    fn create_project(&mut self, name: &str) -> Result<ProjectRef, ApiError> {
        let workspace_id = self.workspace_id()?;
        let request = CreateProjectRequest {
            project: ProjectPayload {
                wid: workspace_id,
                name,
            },
        };
        let body = self.post("projects", &request)?;
        let created: DataEnvelope<Project> = parse_json(&body)?;
        let reference = ProjectRef {
            id: created.data.id,
            workspace_id: created.data.wid,
        };
        tracing::info!(name, id = reference.id, "created project");
        if let Some(projects) = &mut self.projects {
            projects.insert(created.data.name, reference);
        }
        Ok(reference)
    }

    fn create_time_entry(&mut self, project_id: i64, event: &Event) -> Result<(), ApiError> {
        let request = time_entry_request(project_id, event);
        let body = self.post("time_entries", &request)?;
        let created: DataEnvelope<CreatedTimeEntry> = parse_json(&body)?;
        tracing::debug!(
            id = created.data.id,
            pid = project_id,
            duration = event.duration,
            "created time entry"
        );
        Ok(())
    }
}
