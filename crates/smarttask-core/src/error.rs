use thiserror::Error;

/// Message shown when nothing more specific can be extracted from a failure.
pub const DEFAULT_ERROR_MESSAGE: &str = "Ocorreu um erro inesperado.";

#[derive(Debug, Error)]
pub enum SmartTaskError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend answered 401. The session has already been torn down by
    /// the time a caller sees this; `body` keeps the server's explanation.
    #[error("authentication rejected by the server")]
    Unauthorized { body: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}

impl SmartTaskError {
    /// Returns `true` when the error is likely transient and worth retrying
    /// (HTTP 429/5xx, network timeouts, refused connections).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SmartTaskError>;

/// Extract the most useful human-readable message from a failed call.
///
/// Priority for API and 401 errors: a plain non-blank string body, then `mensagem`,
/// then `message`, then the first string in the field-level `erros`/`errors`
/// map. Everything else yields `fallback`.
pub fn user_message(err: &SmartTaskError, fallback: &str) -> String {
    match err {
        SmartTaskError::Api { body, .. } | SmartTaskError::Unauthorized { body } => {
            message_from_body(body)
        }
        SmartTaskError::InvalidInput(msg) => Some(msg.clone()),
        _ => None,
    }
    .unwrap_or_else(|| fallback.to_string())
}

fn message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        // Not JSON at all: the body itself is the message.
        Err(_) => {
            let trimmed = body.trim();
            return (!trimmed.is_empty()).then(|| body.to_string());
        }
    };

    if let Some(s) = value.as_str() {
        return (!s.trim().is_empty()).then(|| s.to_string());
    }

    for key in ["mensagem", "message"] {
        match value.get(key) {
            Some(serde_json::Value::Null) | None => {}
            Some(serde_json::Value::String(s)) if s.is_empty() => {}
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(other) => return Some(other.to_string()),
        }
    }

    for key in ["erros", "errors"] {
        let Some(map) = value.get(key).and_then(|v| v.as_object()) else {
            continue;
        };
        let Some(first) = map.values().next() else {
            continue;
        };
        return match first {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => items
                .iter()
                .find_map(|item| item.as_str().map(str::to_string)),
            _ => None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> SmartTaskError {
        SmartTaskError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_transient_503() {
        assert!(api(503, "unavailable").is_transient());
    }

    #[test]
    fn test_transient_429() {
        assert!(api(429, "slow down").is_transient());
    }

    #[test]
    fn test_permanent_400() {
        assert!(!api(400, "bad").is_transient());
    }

    fn unauthorized(body: &str) -> SmartTaskError {
        SmartTaskError::Unauthorized {
            body: body.to_string(),
        }
    }

    #[test]
    fn test_permanent_unauthorized() {
        assert!(!unauthorized("").is_transient());
        assert_eq!(unauthorized("").status(), Some(401));
    }

    #[test]
    fn test_message_from_unauthorized_body() {
        let err = unauthorized(r#"{"message":"Usuário ou senha inválidos."}"#);
        assert_eq!(
            user_message(&err, DEFAULT_ERROR_MESSAGE),
            "Usuário ou senha inválidos."
        );
    }

    #[test]
    fn test_message_unauthorized_without_body_falls_back() {
        assert_eq!(user_message(&unauthorized(""), "log in again"), "log in again");
    }

    #[test]
    fn test_message_plain_string_body() {
        let err = api(400, "Usuario ja existe");
        assert_eq!(user_message(&err, "fallback"), "Usuario ja existe");
    }

    #[test]
    fn test_message_json_string_body() {
        let err = api(400, r#""Titulo obrigatorio""#);
        assert_eq!(user_message(&err, "fallback"), "Titulo obrigatorio");
    }

    #[test]
    fn test_message_prefers_mensagem_over_message() {
        let err = api(400, r#"{"mensagem":"primeiro","message":"segundo"}"#);
        assert_eq!(user_message(&err, "fallback"), "primeiro");
    }

    #[test]
    fn test_message_field() {
        let err = api(409, r#"{"message":"Username already taken"}"#);
        assert_eq!(user_message(&err, "fallback"), "Username already taken");
    }

    #[test]
    fn test_message_first_field_error_array() {
        let err = api(
            400,
            r#"{"erros":{"whatsappNumber":[1,"Numero invalido"]}}"#,
        );
        assert_eq!(user_message(&err, "fallback"), "Numero invalido");
    }

    #[test]
    fn test_message_first_field_error_string() {
        let err = api(400, r#"{"errors":{"title":"must not be blank"}}"#);
        assert_eq!(user_message(&err, "fallback"), "must not be blank");
    }

    #[test]
    fn test_message_skips_empty_erros_map() {
        let err = api(400, r#"{"erros":{},"errors":{"title":"must not be blank"}}"#);
        assert_eq!(user_message(&err, "fallback"), "must not be blank");
    }

    #[test]
    fn test_message_falls_back_for_blank_body() {
        let err = api(500, "   ");
        assert_eq!(user_message(&err, DEFAULT_ERROR_MESSAGE), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_message_falls_back_for_unrecognized_json() {
        let err = api(500, r#"{"timestamp":"2024-01-01"}"#);
        assert_eq!(user_message(&err, "nope"), "nope");
    }

    #[test]
    fn test_message_falls_back_for_non_api_errors() {
        let err = SmartTaskError::Storage("disk full".into());
        assert_eq!(user_message(&err, "generic"), "generic");
    }
}
