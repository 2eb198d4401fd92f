//! HTTP implementations of the directory traits over reqwest.
//!
//! All calls are synchronous request/response with a bounded timeout set on
//! the shared client. Failures are classified into `NotFound` (terminal) and
//! `Unavailable` (retryable) rather than bubbling raw transport errors.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use super::{Collaborator, DirectoryError, Task, TaskDirectory, User, UserDirectory};

/// User service client.
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Creates a client against the given base URL (no trailing slash).
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: trim_base(base_url.into()),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn fetch_user(&self, user_id: i64) -> Result<User, DirectoryError> {
        let url = format!("{}/user/{}", self.base_url, user_id);
        let response = get(&self.client, &url).await?;
        decode(response, &format!("user {}", user_id)).await
    }
}

/// Task service client.
pub struct HttpTaskDirectory {
    client: Client,
    base_url: String,
}

impl HttpTaskDirectory {
    /// Creates a client against the given base URL (no trailing slash).
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: trim_base(base_url.into()),
        }
    }
}

#[async_trait]
impl TaskDirectory for HttpTaskDirectory {
    async fn fetch_task(&self, task_id: i64) -> Result<Task, DirectoryError> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);
        let response = get(&self.client, &url).await?;
        decode(response, &format!("task {}", task_id)).await
    }

    async fn fetch_collaborators(&self, task_id: i64) -> Result<Vec<i64>, DirectoryError> {
        let url = format!("{}/tasks/{}/collaborators", self.base_url, task_id);
        let response = get(&self.client, &url).await?;
        let entries: Vec<Collaborator> =
            decode(response, &format!("collaborators of task {}", task_id)).await?;
        Ok(entries.into_iter().map(|c| c.user_id).collect())
    }

    async fn fetch_tasks_with_deadlines(&self) -> Result<Vec<Task>, DirectoryError> {
        let url = format!("{}/tasks/with-deadlines", self.base_url);
        let response = get(&self.client, &url).await?;
        decode(response, "tasks with deadlines").await
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Issues a GET and classifies transport-level failures as retryable.
async fn get(client: &Client, url: &str) -> Result<Response, DirectoryError> {
    client
        .get(url)
        .send()
        .await
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))
}

/// Classifies the status code and decodes the JSON body.
async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
    entity: &str,
) -> Result<T, DirectoryError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(DirectoryError::NotFound(entity.to_string()));
    }
    if status.is_server_error() {
        return Err(DirectoryError::Unavailable(format!(
            "{} answered {}",
            entity, status
        )));
    }
    if !status.is_success() {
        // Remaining 4xx cannot be fixed by retrying
        return Err(DirectoryError::NotFound(format!(
            "{} (upstream answered {})",
            entity, status
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| DirectoryError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base_strips_trailing_slashes() {
        assert_eq!(trim_base("http://svc:6000/".to_string()), "http://svc:6000");
        assert_eq!(trim_base("http://svc:6000".to_string()), "http://svc:6000");
    }

    #[test]
    fn test_url_shapes() {
        let client = Client::new();
        let users = HttpUserDirectory::new(client.clone(), "http://users:6000/");
        let tasks = HttpTaskDirectory::new(client, "http://tasks:6001");

        assert_eq!(users.base_url, "http://users:6000");
        assert_eq!(tasks.base_url, "http://tasks:6001");
    }
}
