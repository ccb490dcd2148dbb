use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmartTaskError};

use super::timestamp;

pub const DEFAULT_REMINDER_TIME: &str = "08:30";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

static WHATSAPP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("valid regex"));

static REMINDER_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("valid regex"));

/// WhatsApp notification preferences as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferenceRequest {
    pub whatsapp_number: String,
    pub enabled: bool,
    pub daily_reminder_time: String,
    pub timezone: String,
    pub send_overdue_alerts: bool,
    pub send_completion_summary: bool,
}

impl Default for NotificationPreferenceRequest {
    fn default() -> Self {
        Self {
            whatsapp_number: String::new(),
            enabled: false,
            daily_reminder_time: DEFAULT_REMINDER_TIME.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            send_overdue_alerts: true,
            send_completion_summary: true,
        }
    }
}

impl NotificationPreferenceRequest {
    pub fn validate(&self) -> Result<()> {
        let number = self.whatsapp_number.trim();
        if number.is_empty() {
            return Err(SmartTaskError::InvalidInput(
                "WhatsApp number is required".into(),
            ));
        }
        if !WHATSAPP_RE.is_match(number) {
            return Err(SmartTaskError::InvalidInput(format!(
                "invalid WhatsApp number '{number}' (use international format: +5511999999999)"
            )));
        }
        if !REMINDER_TIME_RE.is_match(self.daily_reminder_time.trim()) {
            return Err(SmartTaskError::InvalidInput(format!(
                "invalid reminder time '{}' (use HH:mm)",
                self.daily_reminder_time
            )));
        }
        Ok(())
    }
}

/// Stored preferences. Any field the backend leaves null falls back to the
/// client defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub daily_reminder_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub send_overdue_alerts: Option<bool>,
    #[serde(default)]
    pub send_completion_summary: Option<bool>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl NotificationPreference {
    /// Editable form of these preferences with defaults filled in.
    pub fn to_request(&self) -> NotificationPreferenceRequest {
        let defaults = NotificationPreferenceRequest::default();
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        NotificationPreferenceRequest {
            whatsapp_number: non_blank(&self.whatsapp_number).unwrap_or_default(),
            enabled: self.enabled.unwrap_or(defaults.enabled),
            daily_reminder_time: non_blank(&self.daily_reminder_time)
                .unwrap_or(defaults.daily_reminder_time),
            timezone: non_blank(&self.timezone).unwrap_or(defaults.timezone),
            send_overdue_alerts: self.send_overdue_alerts.unwrap_or(defaults.send_overdue_alerts),
            send_completion_summary: self
                .send_completion_summary
                .unwrap_or(defaults.send_completion_summary),
        }
    }

    pub fn has_whatsapp_number(&self) -> bool {
        self.whatsapp_number
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty())
    }
}

/// Acknowledgement returned by the test-notification endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationAck {
    #[serde(default)]
    pub message: String,
}
