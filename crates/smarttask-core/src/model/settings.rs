use serde::{Deserialize, Serialize};

/// Integration credentials update. Only non-empty fields are sent, so a blank
/// field leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_account_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_whatsapp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_whatsapp_number: Option<String>,
}

impl SettingsRequest {
    /// Trim every field and drop the blank ones.
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            openai_api_key: keep(self.openai_api_key),
            twilio_account_sid: keep(self.twilio_account_sid),
            twilio_auth_token: keep(self.twilio_auth_token),
            twilio_whatsapp_number: keep(self.twilio_whatsapp_number),
            user_whatsapp_number: keep(self.user_whatsapp_number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.openai_api_key.is_none()
            && self.twilio_account_sid.is_none()
            && self.twilio_auth_token.is_none()
            && self.twilio_whatsapp_number.is_none()
            && self.user_whatsapp_number.is_none()
    }
}

/// Which integrations are configured. Secrets never come back, only flags
/// and masked numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    #[serde(default)]
    pub openai_configured: bool,
    #[serde(default)]
    pub twilio_configured: bool,
    #[serde(default)]
    pub twilio_whatsapp_number: Option<String>,
    #[serde(default)]
    pub user_whatsapp_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
