//! HTTP client for the Locus server API (§6.2)
//!
//! The core depends only on the [`ApiClient`] trait; [`ReqwestApiClient`] is
//! the concrete implementation used by the binary. Tests exercise the trait
//! through an in-memory mock (see `mock` below) so the worker/planner/
//! artifact-sync unit tests never touch the network.

mod error;
mod types;

pub use error::ApiError;
pub use types::{
    CommentRequest, DispatchRequest, DispatchResponse, DocGroup, DocGroupRequest, DocRequest,
    SprintPatch, SprintSummary, SprintTasksResponse, TaskPatch,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Doc, Sprint, Task};

/// Everything the worker, planner, and artifact syncer need from the server
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn dispatch(
        &self,
        worker_id: &str,
        sprint_id: Option<Uuid>,
    ) -> Result<Option<Task>, ApiError>;

    async fn get_task(&self, task_id: Uuid) -> Result<Task, ApiError>;

    async fn patch_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<(), ApiError>;

    async fn post_comment(&self, task_id: Uuid, comment: &CommentRequest) -> Result<(), ApiError>;

    async fn get_active_sprint(&self) -> Result<Option<Sprint>, ApiError>;

    async fn get_sprint(&self, sprint_id: Uuid) -> Result<Sprint, ApiError>;

    async fn get_sprint_tasks(&self, sprint_id: Uuid) -> Result<Vec<Task>, ApiError>;

    async fn patch_sprint_mindmap(
        &self,
        sprint_id: Uuid,
        mindmap: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ApiError>;

    async fn list_doc_groups(&self) -> Result<Vec<DocGroup>, ApiError>;

    async fn create_doc_group(&self, name: &str, order: i32) -> Result<DocGroup, ApiError>;

    async fn list_docs(&self) -> Result<Vec<Doc>, ApiError>;

    async fn create_doc(&self, req: &DocRequest) -> Result<Doc, ApiError>;

    async fn patch_doc(&self, doc_id: &str, req: &DocRequest) -> Result<(), ApiError>;
}

/// Default production implementation backed by [`reqwest`]
pub struct ReqwestApiClient {
    client: Client,
    base_url: String,
    workspace_id: Uuid,
}

impl ReqwestApiClient {
    pub fn new(base_url: impl Into<String>, api_key: &str, workspace_id: Uuid, timeout: Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key);
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&auth) {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .expect("building the HTTP client with static headers cannot fail");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            workspace_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/workspaces/{}{}",
            self.base_url, self.workspace_id, path
        )
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        self.parse_response(url, resp).await
    }

    async fn request_no_content(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<(), ApiError> {
        let url = self.url(path);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Status { url, status, body })
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        url: String,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(ApiError::from)
    }
}

#[async_trait]
impl ApiClient for ReqwestApiClient {
    async fn dispatch(
        &self,
        worker_id: &str,
        sprint_id: Option<Uuid>,
    ) -> Result<Option<Task>, ApiError> {
        let req = DispatchRequest {
            worker_id: worker_id.to_string(),
            sprint_id,
        };
        let url = self.url("/dispatch");
        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: DispatchResponse = self.parse_response(url, resp).await?;
        Ok(parsed.task)
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task, ApiError> {
        self.request_json(Method::GET, &format!("/tasks/{}", task_id), None::<&()>)
            .await
    }

    async fn patch_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<(), ApiError> {
        self.request_no_content(
            Method::PATCH,
            &format!("/tasks/{}", task_id),
            Some(patch),
        )
        .await
    }

    async fn post_comment(&self, task_id: Uuid, comment: &CommentRequest) -> Result<(), ApiError> {
        self.request_no_content(
            Method::POST,
            &format!("/tasks/{}/comment", task_id),
            Some(comment),
        )
        .await
    }

    async fn get_active_sprint(&self) -> Result<Option<Sprint>, ApiError> {
        let url = self.url("/sprints/active");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        let sprint: Sprint = serde_json::from_str(&body)?;
        Ok(Some(sprint))
    }

    async fn get_sprint(&self, sprint_id: Uuid) -> Result<Sprint, ApiError> {
        self.request_json(Method::GET, &format!("/sprints/{}", sprint_id), None::<&()>)
            .await
    }

    async fn get_sprint_tasks(&self, sprint_id: Uuid) -> Result<Vec<Task>, ApiError> {
        let resp: SprintTasksResponse = self
            .request_json(
                Method::GET,
                &format!("/tasks?sprintId={}", sprint_id),
                None::<&()>,
            )
            .await?;
        Ok(resp.tasks)
    }

    async fn patch_sprint_mindmap(
        &self,
        sprint_id: Uuid,
        mindmap: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let patch = SprintPatch {
            mindmap: mindmap.to_string(),
            mindmap_updated_at: updated_at,
        };
        self.request_no_content(
            Method::PATCH,
            &format!("/sprints/{}", sprint_id),
            Some(&patch),
        )
        .await
    }

    async fn list_doc_groups(&self) -> Result<Vec<DocGroup>, ApiError> {
        self.request_json(Method::GET, "/doc-groups", None::<&()>).await
    }

    async fn create_doc_group(&self, name: &str, order: i32) -> Result<DocGroup, ApiError> {
        let req = DocGroupRequest {
            name: name.to_string(),
            order,
        };
        self.request_json(Method::POST, "/doc-groups", Some(&req)).await
    }

    async fn list_docs(&self) -> Result<Vec<Doc>, ApiError> {
        self.request_json(Method::GET, "/docs", None::<&()>).await
    }

    async fn create_doc(&self, req: &DocRequest) -> Result<Doc, ApiError> {
        self.request_json(Method::POST, "/docs", Some(req)).await
    }

    async fn patch_doc(&self, doc_id: &str, req: &DocRequest) -> Result<(), ApiError> {
        self.request_no_content(Method::PATCH, &format!("/docs/{}", doc_id), Some(req))
            .await
    }
}

/// In-memory mock for worker/planner/artifact-sync unit tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockApiClient {
        pub dispatch_queue: Mutex<Vec<Option<Task>>>,
        pub dispatch_calls: AtomicUsize,
        pub active_sprint: Mutex<Option<Sprint>>,
        pub sprint_tasks: Mutex<Vec<Task>>,
        pub patched_tasks: Mutex<Vec<(Uuid, TaskPatch)>>,
        pub comments: Mutex<Vec<(Uuid, CommentRequest)>>,
        pub mindmap_patches: Mutex<Vec<(Uuid, String)>>,
        pub doc_groups: Mutex<Vec<DocGroup>>,
        pub docs: Mutex<Vec<Doc>>,
    }

    impl MockApiClient {
        pub fn with_dispatch_queue(tasks: Vec<Option<Task>>) -> Self {
            Self {
                dispatch_queue: Mutex::new(tasks),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ApiClient for MockApiClient {
        async fn dispatch(
            &self,
            _worker_id: &str,
            _sprint_id: Option<Uuid>,
        ) -> Result<Option<Task>, ApiError> {
            self.dispatch_calls.fetch_add(1, Ordering::SeqCst);
            let mut queue = self.dispatch_queue.lock().unwrap();
            if queue.is_empty() {
                Ok(None)
            } else {
                Ok(queue.remove(0))
            }
        }

        async fn get_task(&self, task_id: Uuid) -> Result<Task, ApiError> {
            self.sprint_tasks
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == task_id)
                .cloned()
                .ok_or(ApiError::NoTaskAvailable)
        }

        async fn patch_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<(), ApiError> {
            self.patched_tasks
                .lock()
                .unwrap()
                .push((task_id, patch.clone()));
            Ok(())
        }

        async fn post_comment(
            &self,
            task_id: Uuid,
            comment: &CommentRequest,
        ) -> Result<(), ApiError> {
            self.comments.lock().unwrap().push((task_id, comment.clone()));
            Ok(())
        }

        async fn get_active_sprint(&self) -> Result<Option<Sprint>, ApiError> {
            Ok(self.active_sprint.lock().unwrap().clone())
        }

        async fn get_sprint(&self, sprint_id: Uuid) -> Result<Sprint, ApiError> {
            self.active_sprint
                .lock()
                .unwrap()
                .clone()
                .filter(|s| s.id == sprint_id)
                .ok_or(ApiError::NoTaskAvailable)
        }

        async fn get_sprint_tasks(&self, _sprint_id: Uuid) -> Result<Vec<Task>, ApiError> {
            Ok(self.sprint_tasks.lock().unwrap().clone())
        }

        async fn patch_sprint_mindmap(
            &self,
            sprint_id: Uuid,
            mindmap: &str,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), ApiError> {
            self.mindmap_patches
                .lock()
                .unwrap()
                .push((sprint_id, mindmap.to_string()));
            Ok(())
        }

        async fn list_doc_groups(&self) -> Result<Vec<DocGroup>, ApiError> {
            Ok(self.doc_groups.lock().unwrap().clone())
        }

        async fn create_doc_group(&self, name: &str, order: i32) -> Result<DocGroup, ApiError> {
            let group = DocGroup {
                id: format!("group-{}", self.doc_groups.lock().unwrap().len() + 1),
                name: name.to_string(),
                order,
            };
            self.doc_groups.lock().unwrap().push(group.clone());
            Ok(group)
        }

        async fn list_docs(&self) -> Result<Vec<Doc>, ApiError> {
            Ok(self.docs.lock().unwrap().clone())
        }

        async fn create_doc(&self, req: &DocRequest) -> Result<Doc, ApiError> {
            let doc = Doc {
                id: format!("doc-{}", self.docs.lock().unwrap().len() + 1),
                title: req.title.clone(),
                content: req.content.clone(),
                group_id: Some(req.group_id.clone()),
            };
            self.docs.lock().unwrap().push(doc.clone());
            Ok(doc)
        }

        async fn patch_doc(&self, doc_id: &str, req: &DocRequest) -> Result<(), ApiError> {
            let mut docs = self.docs.lock().unwrap();
            if let Some(doc) = docs.iter_mut().find(|d| d.id == doc_id) {
                doc.content = req.content.clone();
                doc.group_id = Some(req.group_id.clone());
            }
            Ok(())
        }
    }
}
