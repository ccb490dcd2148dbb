//! Authenticated REST gateway to the SmartTask backend.
//!
//! [`Gateway`] owns a [`Transport`] (normally an [`AuthLayer`] around
//! [`HttpTransport`]) and exposes the backend's endpoints grouped by area:
//! [`AuthApi`], [`TasksApi`], [`AiApi`], [`NotificationsApi`] and [`SettingsApi`].

mod auth;
mod transport;

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::{Result, SmartTaskError};
use crate::model::{
    AiAnalysisRequest, AiAnalysisResponse, AuthResponse, LoginRequest, NotificationAck,
    NotificationPreference, NotificationPreferenceRequest, RegisterRequest, SettingsRequest,
    SettingsResponse, Task, TaskRequest, TaskStatus,
};
use crate::retry::with_retry;
use crate::session::SessionStore;

pub use auth::{AuthLayer, CredentialSource, ForceLogout, UnauthorizedHandler, UNAUTHORIZED};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

pub struct Gateway<T> {
    transport: T,
    max_retries: usize,
    retry_base_delay_ms: u64,
}

impl Gateway<AuthLayer<HttpTransport>> {
    /// Production wiring: reqwest transport, session-backed credentials, and a
    /// forced logout (plus `redirect`) on any 401.
    pub fn from_config(
        config: &ApiConfig,
        session: Arc<SessionStore>,
        redirect: impl Fn() + Send + Sync + 'static,
    ) -> Result<Self> {
        let http = HttpTransport::from_config(config)?;
        let handler = ForceLogout::new(session.clone()).with_redirect(redirect);
        let layer = AuthLayer::new(http, session, Arc::new(handler));
        Ok(Self::new(layer).with_retry(config.max_retries, config.retry_base_delay_ms))
    }
}

impl<T: Transport> Gateway<T> {
    /// No retries until [`with_retry`](Self::with_retry) says otherwise.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_retries: 0,
            retry_base_delay_ms: 0,
        }
    }

    pub fn with_retry(mut self, max_retries: usize, base_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn auth(&self) -> AuthApi<'_, T> {
        AuthApi { gw: self }
    }

    pub fn tasks(&self) -> TasksApi<'_, T> {
        TasksApi { gw: self }
    }

    pub fn ai(&self) -> AiApi<'_, T> {
        AiApi { gw: self }
    }

    pub fn notifications(&self) -> NotificationsApi<'_, T> {
        NotificationsApi { gw: self }
    }

    pub fn settings(&self) -> SettingsApi<'_, T> {
        SettingsApi { gw: self }
    }

    // -- Request helpers --

    /// Send and map error statuses. Idempotent requests are retried on
    /// transient failures; writes go out exactly once.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        if !request.is_idempotent() {
            return self.transport.send(request).await?.error_for_status();
        }
        with_retry(self.max_retries, self.retry_base_delay_ms, || {
            let request = request.clone();
            async move { self.transport.send(request).await?.error_for_status() }
        })
        .await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::new(method, path).with_body(body))
            .await?
            .json()
    }
}

/// `/auth/*`
pub struct AuthApi<'a, T> {
    gw: &'a Gateway<T>,
}

impl<T: Transport> AuthApi<'_, T> {
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        request.validate()?;
        self.gw.send_json(Method::POST, "/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        request.validate()?;
        self.gw.send_json(Method::POST, "/auth/register", request).await
    }
}

/// `/tasks/*`
pub struct TasksApi<'a, T> {
    gw: &'a Gateway<T>,
}

impl<T: Transport> TasksApi<'_, T> {
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.gw.get("/tasks").await
    }

    pub async fn get(&self, id: i64) -> Result<Task> {
        self.gw.get(&format!("/tasks/{id}")).await
    }

    pub async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.gw.get(&format!("/tasks/status/{status}")).await
    }

    pub async fn list_overdue(&self) -> Result<Vec<Task>> {
        self.gw.get("/tasks/overdue").await
    }

    pub async fn create(&self, request: &TaskRequest) -> Result<Task> {
        request.validate()?;
        self.gw.send_json(Method::POST, "/tasks", request).await
    }

    /// Create and let the backend enrich the task with AI suggestions.
    pub async fn create_with_ai(&self, request: &TaskRequest) -> Result<Task> {
        request.validate()?;
        self.gw.send_json(Method::POST, "/tasks/ai", request).await
    }

    pub async fn update(&self, id: i64, request: &TaskRequest) -> Result<Task> {
        request.validate()?;
        self.gw
            .send_json(Method::PUT, &format!("/tasks/{id}"), request)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.gw
            .execute(ApiRequest::new(Method::DELETE, format!("/tasks/{id}")))
            .await?;
        Ok(())
    }
}

/// `/ai/*`
pub struct AiApi<'a, T> {
    gw: &'a Gateway<T>,
}

impl<T: Transport> AiApi<'_, T> {
    pub async fn analyze(&self, request: &AiAnalysisRequest) -> Result<AiAnalysisResponse> {
        request.validate()?;
        self.gw.send_json(Method::POST, "/ai/analyze", request).await
    }
}

/// `/notifications/*`
pub struct NotificationsApi<'a, T> {
    gw: &'a Gateway<T>,
}

impl<T: Transport> NotificationsApi<'_, T> {
    /// `None` when the user never saved preferences.
    pub async fn preferences(&self) -> Result<Option<NotificationPreference>> {
        match self
            .gw
            .execute(ApiRequest::get("/notifications/preferences"))
            .await
        {
            Ok(resp) if resp.body.trim().is_empty() => Ok(None),
            Ok(resp) => resp.json().map(Some),
            Err(SmartTaskError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save_preferences(
        &self,
        request: &NotificationPreferenceRequest,
    ) -> Result<NotificationPreference> {
        request.validate()?;
        self.gw
            .send_json(Method::POST, "/notifications/preferences", request)
            .await
    }

    /// Ask the backend to send a test WhatsApp message.
    pub async fn send_test(&self) -> Result<NotificationAck> {
        let resp = self
            .gw
            .execute(ApiRequest::new(Method::POST, "/notifications/test"))
            .await?;
        if resp.body.trim().is_empty() {
            return Ok(NotificationAck::default());
        }
        resp.json()
    }
}

/// `/settings`
pub struct SettingsApi<'a, T> {
    gw: &'a Gateway<T>,
}

impl<T: Transport> SettingsApi<'_, T> {
    pub async fn get(&self) -> Result<SettingsResponse> {
        self.gw.get("/settings").await
    }

    /// Blank fields are dropped before sending, so they keep their stored
    /// values on the backend.
    pub async fn update(&self, request: SettingsRequest) -> Result<SettingsResponse> {
        let request = request.normalized();
        if request.is_empty() {
            return Err(SmartTaskError::InvalidInput(
                "no settings to update".into(),
            ));
        }
        self.gw.send_json(Method::PUT, "/settings", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned responses in order and counts calls.
    struct Scripted {
        responses: Mutex<VecDeque<ApiResponse>>,
        calls: AtomicUsize,
        last: Mutex<Option<ApiRequest>>,
    }

    impl Scripted {
        fn new(responses: &[(u16, &str)]) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .iter()
                        .map(|(status, body)| ApiResponse {
                            status: *status,
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> ApiRequest {
            self.last.lock().unwrap().clone().unwrap()
        }
    }

    impl Transport for Scripted {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ApiResponse {
                    status: 500,
                    body: "script exhausted".into(),
                }))
        }
    }

    const TASK: &str = r#"{"id":7,"title":"Write report","status":"TODO","priority":"HIGH",
        "createdAt":"2024-03-01T09:00:00","updatedAt":"2024-03-01T09:00:00"}"#;

    #[tokio::test]
    async fn test_get_retries_transient_failures() {
        let gw = Gateway::new(Scripted::new(&[(503, ""), (200, "[]")])).with_retry(2, 1);
        let tasks = gw.tasks().list().await.unwrap();
        assert!(tasks.is_empty());
        assert_eq!(gw.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_writes_are_not_retried() {
        let gw = Gateway::new(Scripted::new(&[(503, ""), (200, TASK)])).with_retry(3, 1);
        let err = gw.tasks().create(&TaskRequest::new("Write report")).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(gw.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_error_body_passes_through() {
        let body = r#"{"mensagem":"Tarefa não encontrada"}"#;
        let gw = Gateway::new(Scripted::new(&[(404, body)]));
        match gw.tasks().get(99).await {
            Err(SmartTaskError::Api { status, body: b }) => {
                assert_eq!(status, 404);
                assert_eq!(b, body);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_paths_and_methods() {
        let gw = Gateway::new(Scripted::new(&[
            (200, "[]"),
            (200, TASK),
            (204, ""),
        ]));
        gw.tasks().list_by_status(TaskStatus::InProgress).await.unwrap();
        let req = gw.transport().last_request();
        assert_eq!(req.path, "/tasks/status/IN_PROGRESS");
        assert_eq!(req.method, Method::GET);

        gw.tasks()
            .update(7, &TaskRequest::new("Write report"))
            .await
            .unwrap();
        let req = gw.transport().last_request();
        assert_eq!(req.path, "/tasks/7");
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.body.unwrap()["title"], "Write report");

        gw.tasks().delete(7).await.unwrap();
        assert_eq!(gw.transport().last_request().method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_invalid_input_never_leaves_the_client() {
        let gw = Gateway::new(Scripted::new(&[]));
        let err = gw.tasks().create(&TaskRequest::new("ab")).await.unwrap_err();
        assert!(matches!(err, SmartTaskError::InvalidInput(_)));
        assert_eq!(gw.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_preferences_are_none() {
        let gw = Gateway::new(Scripted::new(&[(404, ""), (200, "")]));
        assert!(gw.notifications().preferences().await.unwrap().is_none());
        assert!(gw.notifications().preferences().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_update_drops_blank_fields() {
        let gw = Gateway::new(Scripted::new(&[(200, r#"{"openaiConfigured":true}"#)]));
        let request = SettingsRequest {
            openai_api_key: Some("  sk-123  ".into()),
            twilio_auth_token: Some("   ".into()),
            ..Default::default()
        };
        let resp = gw.settings().update(request).await.unwrap();
        assert!(resp.openai_configured);

        let body = gw.transport().last_request().body.unwrap();
        assert_eq!(body, serde_json::json!({"openaiApiKey": "sk-123"}));
    }

    #[tokio::test]
    async fn test_settings_update_rejects_all_blank() {
        let gw = Gateway::new(Scripted::new(&[]));
        let err = gw
            .settings()
            .update(SettingsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SmartTaskError::InvalidInput(_)));
        assert_eq!(gw.transport().calls(), 0);
    }
}
