//! GitLab storage backend.
//!
//! Notebooks are the projects visible to the token's user and notes are the
//! top-level files of each project's default branch. Every change is a
//! commit made through the repository files API.
//!
//! | Operation     | Endpoint                                                  |
//! |---------------|-----------------------------------------------------------|
//! | `username`    | `GET user`                                                |
//! | `notebooks`   | `GET projects` (all pages)                                |
//! | `notes`       | `GET projects/:id/repository/tree` (all pages)            |
//! | note content  | `GET projects/:id/repository/files/:path?ref=:branch`     |
//! | note date     | `GET projects/:id/repository/commits/:last_commit_id`     |
//! | `create_note` | `POST projects/:id/repository/files/:path`                |
//! | `update_note` | `PUT projects/:id/repository/files/:path`                 |
//! | `remove_note` | `DELETE projects/:id/repository/files/:path`              |

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local, Utc};
use futures::future::try_join_all;
use notebook_core::{Note, Notebook};
use reqwest::Method;
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::{BackendDescriptor, BackendOptions, RequiredOption, StorageBackend};
use crate::error::{StoreError, StoreResult};
use crate::query::{QueryClient, RequestOptions, merge_query};

/// Registry key of this backend.
pub const KIND: &str = "gitlab";

/// Branch notes are read from and committed to unless configured otherwise.
pub const DEFAULT_BRANCH: &str = "master";

/// Option holding the installation URL.
pub const OPTION_BASE_URL: &str = "baseUrl";

/// Option holding the personal access token.
pub const OPTION_TOKEN: &str = "token";

/// Optional option overriding [`DEFAULT_BRANCH`].
pub const OPTION_BRANCH: &str = "branch";

/// Optional OAuth application id used to build the authorization URL.
pub const OPTION_CLIENT_ID: &str = "clientId";

/// Optional OAuth callback used to build the authorization URL.
pub const OPTION_REDIRECT_URI: &str = "redirectUri";

const REQUIRED_OPTIONS: &[RequiredOption] = &[
    RequiredOption {
        name: OPTION_BASE_URL,
        title: "Base URL of the installation?",
        optional: false,
    },
    RequiredOption {
        name: OPTION_TOKEN,
        title: "Personal access token (empty to authorize in the browser)",
        optional: true,
    },
];

/// Descriptor registered under [`KIND`].
pub static DESCRIPTOR: BackendDescriptor = BackendDescriptor {
    kind: KIND,
    display_name: "Gitlab",
    required_options: REQUIRED_OPTIONS,
    saved_name,
    connect,
};

fn saved_name(options: &BackendOptions) -> String {
    let base_url = options.get(OPTION_BASE_URL).map(String::as_str).unwrap_or("");
    format!("Gitlab ({base_url})")
}

fn connect(options: &BackendOptions) -> StoreResult<Arc<dyn StorageBackend>> {
    Ok(Arc::new(GitlabBackend::new(options)?))
}

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct UserResponse {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    file_path: String,
    content: String,
    last_commit_id: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    created_at: DateTime<Utc>,
}

// ============================================================================
// Backend
// ============================================================================

/// Storage backend for a GitLab installation.
#[derive(Debug, Clone)]
pub struct GitlabBackend {
    client: QueryClient,
    token: Option<String>,
    branch: String,
    client_id: String,
    redirect_uri: String,
}

impl GitlabBackend {
    /// Build a backend from connection options.
    ///
    /// `baseUrl` is mandatory. Without a `token` the backend can only
    /// produce an authorization URL.
    pub fn new(options: &BackendOptions) -> StoreResult<Self> {
        let option = |name: &str| {
            options
                .get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let base_url = option(OPTION_BASE_URL).ok_or_else(|| StoreError::MissingOption {
            kind: KIND.to_string(),
            name: OPTION_BASE_URL.to_string(),
        })?;
        let token = option(OPTION_TOKEN).map(str::to_string);

        Ok(Self {
            client: QueryClient::new(base_url, token.as_deref())?,
            token,
            branch: option(OPTION_BRANCH).unwrap_or(DEFAULT_BRANCH).to_string(),
            client_id: option(OPTION_CLIENT_ID).unwrap_or_default().to_string(),
            redirect_uri: option(OPTION_REDIRECT_URI).unwrap_or_default().to_string(),
        })
    }

    /// Branch notes are committed to.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// OAuth authorization URL the user must visit when no token is set.
    pub fn authorize_url(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        merge_query(
            &format!("{}/oauth/authorize", self.client.base_url()),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("state", state.as_str()),
            ],
        )
    }

    fn file_action(notebook: &Notebook, path: &str) -> String {
        format!(
            "projects/{}/repository/files/{}",
            notebook.id,
            urlencoding::encode(path)
        )
    }

    fn commit_form(&self, content: Option<&str>, message: &str) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("branch", self.branch.clone()),
            ("commit_message", message.to_string()),
        ];
        if let Some(content) = content {
            fields.push(("content", content.to_string()));
        }
        fields
    }

    /// Read one file and the commit that last touched it.
    async fn file_as_note(&self, notebook: &Notebook, path: &str) -> StoreResult<Note> {
        let action = merge_query(
            &Self::file_action(notebook, path),
            &[("ref", self.branch.as_str())],
        );
        let file: FileResponse = self.client.get(&action).await?;

        let commit: CommitResponse = self
            .client
            .get(&format!(
                "projects/{}/repository/commits/{}",
                notebook.id, file.last_commit_id
            ))
            .await?;

        let content = decode_content(&file.file_path, &file.content)?;
        Ok(Note::new(file.file_path, content, commit.created_at))
    }
}

/// Name of a note created now: `note-YYYY-MM-DD-hh-mm-ss.md` in local time.
pub fn new_note_path() -> String {
    Local::now().format("note-%Y-%m-%d-%H-%M-%S.md").to_string()
}

fn decode_content(path: &str, encoded: &str) -> StoreResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| StoreError::InvalidContent {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| StoreError::InvalidContent {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl StorageBackend for GitlabBackend {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    async fn authorize(&self) -> StoreResult<()> {
        if self.token.is_some() {
            return Ok(());
        }

        Err(StoreError::AuthorizationRequired {
            authorize_url: self.authorize_url(),
        })
    }

    async fn username(&self) -> StoreResult<String> {
        let user: UserResponse = self.client.get("user").await?;
        Ok(user.username)
    }

    async fn notebooks(&self) -> StoreResult<Vec<Notebook>> {
        let projects: Vec<ProjectResponse> = self
            .client
            .query("projects", &RequestOptions::default())
            .await?;

        Ok(projects
            .into_iter()
            .map(|project| Notebook::new(project.id.to_string(), project.name))
            .collect())
    }

    async fn notes(&self, notebook: &Notebook) -> StoreResult<Vec<Note>> {
        let action = format!("projects/{}/repository/tree", notebook.id);
        let entries: Vec<TreeEntry> = match self
            .client
            .query(&action, &RequestOptions::default())
            .await
        {
            Ok(entries) => entries,
            Err(error) => {
                tracing::debug!(
                    notebook_id = %notebook.id,
                    error = %error,
                    "Repository tree unavailable, treating notebook as empty"
                );
                Vec::new()
            }
        };

        try_join_all(
            entries
                .iter()
                .filter(|entry| entry.kind == "blob")
                .map(|entry| self.file_as_note(notebook, &entry.path)),
        )
        .await
    }

    async fn create_note(&self, notebook: &Notebook) -> StoreResult<Note> {
        let path = new_note_path();
        self.client
            .fetch(
                &Self::file_action(notebook, &path),
                &RequestOptions::form(
                    Method::POST,
                    self.commit_form(Some(""), "Created new note"),
                ),
            )
            .await?;

        tracing::debug!(notebook_id = %notebook.id, path = %path, "Created note");
        self.file_as_note(notebook, &path).await
    }

    async fn update_note(
        &self,
        notebook: &Notebook,
        note: &Note,
        content: &str,
    ) -> StoreResult<Note> {
        self.client
            .fetch(
                &Self::file_action(notebook, note.id.as_str()),
                &RequestOptions::form(Method::PUT, self.commit_form(Some(content), "Updated note")),
            )
            .await?;

        self.file_as_note(notebook, note.id.as_str()).await
    }

    async fn remove_note(&self, notebook: &Notebook, note: &Note) -> StoreResult<()> {
        self.client
            .fetch(
                &Self::file_action(notebook, note.id.as_str()),
                &RequestOptions::form(Method::DELETE, self.commit_form(None, "Removed note")),
            )
            .await?;

        tracing::debug!(notebook_id = %notebook.id, note_id = %note.id, "Removed note");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
