//! Typed wrapper around every `/api` endpoint.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    Account, AdoptAnimalRequest, AnimalResponse, AuthResponse, BuyAccessoryRequest, Child,
    ChildListResponse, ClearNotificationsResponse, CoinsResponse, CreateTaskRequest, ErrorResponse,
    EventListResponse, FeedAnimalResponse, HealthResponse, LedgerResponse, LoginRequest,
    NotificationsResponse, PurchaseResponse, RegisterChildRequest, RegisterParentRequest,
    RenameAnimalRequest, ShopResponse, Task, TaskListResponse, TaskResponse,
    TaskTransitionResponse, UpdateTaskRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} ({code}): {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("not logged in")]
    NotAuthenticated,
}

impl ClientError {
    /// The API error code, when the server answered with one
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.send(self.request(Method::GET, "/health")).await
    }

    // --- accounts ---

    pub async fn register_parent(
        &mut self,
        request: &RegisterParentRequest,
    ) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/auth/register/parent").json(request))
            .await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    pub async fn register_child(
        &mut self,
        request: &RegisterChildRequest,
    ) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/auth/register/child").json(request))
            .await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    /// Log in and keep the returned token for later calls
    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/auth/login").json(&request))
            .await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    pub async fn me(&self) -> ClientResult<Account> {
        self.send(self.authed(Method::GET, "/auth/me")?).await
    }

    // --- tasks ---

    pub async fn create_task(&self, request: &CreateTaskRequest) -> ClientResult<TaskResponse> {
        self.send(self.authed(Method::POST, "/task")?.json(request)).await
    }

    pub async fn list_parent_tasks(&self) -> ClientResult<Vec<Task>> {
        let response: TaskListResponse =
            self.send(self.authed(Method::GET, "/task/parent")?).await?;
        Ok(response.tasks)
    }

    pub async fn list_child_tasks(&self, child_id: &str) -> ClientResult<Vec<Task>> {
        let response: TaskListResponse = self
            .send(self.authed(Method::GET, &format!("/task/child/{}", child_id))?)
            .await?;
        Ok(response.tasks)
    }

    pub async fn get_task(&self, task_id: &str) -> ClientResult<Task> {
        self.send(self.authed(Method::GET, &format!("/task/{}", task_id))?).await
    }

    pub async fn update_task(
        &self,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> ClientResult<TaskResponse> {
        self.send(self.authed(Method::PATCH, &format!("/task/{}", task_id))?.json(request))
            .await
    }

    pub async fn delete_task(&self, task_id: &str) -> ClientResult<()> {
        let response = self
            .authed(Method::DELETE, &format!("/task/{}", task_id))?
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    pub async fn complete_task(&self, task_id: &str) -> ClientResult<TaskTransitionResponse> {
        self.transition(task_id, "complete").await
    }

    pub async fn undo_task(&self, task_id: &str) -> ClientResult<TaskTransitionResponse> {
        self.transition(task_id, "undo").await
    }

    pub async fn approve_task(&self, task_id: &str) -> ClientResult<TaskTransitionResponse> {
        self.transition(task_id, "approve").await
    }

    pub async fn reject_task(&self, task_id: &str) -> ClientResult<TaskTransitionResponse> {
        self.transition(task_id, "reject").await
    }

    pub async fn unapprove_task(&self, task_id: &str) -> ClientResult<TaskTransitionResponse> {
        self.transition(task_id, "unapprove").await
    }

    async fn transition(
        &self,
        task_id: &str,
        action: &str,
    ) -> ClientResult<TaskTransitionResponse> {
        self.send(self.authed(Method::PATCH, &format!("/task/{}/{}", task_id, action))?)
            .await
    }

    // --- family ---

    pub async fn children(&self) -> ClientResult<Vec<Child>> {
        let response: ChildListResponse =
            self.send(self.authed(Method::GET, "/parent/children")?).await?;
        Ok(response.children)
    }

    pub async fn coins(&self, child_id: &str) -> ClientResult<i64> {
        let response: CoinsResponse = self
            .send(self.authed(Method::GET, &format!("/parent/child/{}/coins", child_id))?)
            .await?;
        Ok(response.coins)
    }

    pub async fn ledger(&self, child_id: &str) -> ClientResult<LedgerResponse> {
        self.send(self.authed(Method::GET, &format!("/parent/child/{}/ledger", child_id))?)
            .await
    }

    pub async fn child_me(&self) -> ClientResult<Child> {
        self.send(self.authed(Method::GET, "/child/me")?).await
    }

    // --- pets ---

    pub async fn adopt_animal(&self, request: &AdoptAnimalRequest) -> ClientResult<AnimalResponse> {
        self.send(self.authed(Method::POST, "/animals")?.json(request)).await
    }

    pub async fn my_animal(&self) -> ClientResult<AnimalResponse> {
        self.send(self.authed(Method::GET, "/animals/mine")?).await
    }

    pub async fn child_animal(&self, child_id: &str) -> ClientResult<AnimalResponse> {
        self.send(self.authed(Method::GET, &format!("/animals/child/{}", child_id))?)
            .await
    }

    pub async fn shop(&self) -> ClientResult<ShopResponse> {
        self.send(self.authed(Method::GET, "/animals/shop")?).await
    }

    pub async fn rename_animal(&self, animal_id: &str, name: &str) -> ClientResult<AnimalResponse> {
        let request = RenameAnimalRequest { name: name.to_string() };
        self.send(self.authed(Method::PATCH, &format!("/animals/{}", animal_id))?.json(&request))
            .await
    }

    pub async fn feed_animal(&self, animal_id: &str) -> ClientResult<FeedAnimalResponse> {
        self.send(self.authed(Method::PATCH, &format!("/animals/{}/feed", animal_id))?)
            .await
    }

    pub async fn buy_accessory(
        &self,
        animal_id: &str,
        item: &str,
    ) -> ClientResult<PurchaseResponse> {
        let request = BuyAccessoryRequest { item: item.to_string() };
        self.send(
            self.authed(Method::POST, &format!("/animals/{}/accessories", animal_id))?
                .json(&request),
        )
        .await
    }

    // --- events ---

    pub async fn events(&self, after: i64, limit: u32) -> ClientResult<EventListResponse> {
        self.send(
            self.authed(Method::GET, "/events")?
                .query(&[("after", after.to_string()), ("limit", limit.to_string())]),
        )
        .await
    }

    pub async fn notifications(&self) -> ClientResult<NotificationsResponse> {
        self.send(self.authed(Method::GET, "/notifications")?).await
    }

    pub async fn clear_notifications(&self) -> ClientResult<ClearNotificationsResponse> {
        self.send(self.authed(Method::POST, "/notifications/clear")?).await
    }

    // --- plumbing ---

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}/api{}", self.base_url, path))
    }

    fn authed(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Turn non-2xx answers into `ClientError::Api`
    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => (body.code, body.error),
            Err(_) => ("UNKNOWN".to_string(), text),
        };
        Err(ClientError::Api { status, code, message })
    }
}
