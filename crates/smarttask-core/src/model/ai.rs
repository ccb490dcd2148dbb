use serde::{Deserialize, Serialize};

use crate::error::{Result, SmartTaskError};

use super::{TaskPriority, TaskRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysisRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AiAnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        if !context.trim().is_empty() {
            self.context = Some(context);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(SmartTaskError::InvalidInput(
                "text to analyze cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Structured suggestions returned by the AI analysis endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisResponse {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub suggested_priority: Option<TaskPriority>,
    #[serde(default)]
    pub estimated_hours: Option<u32>,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    #[serde(default)]
    pub suggested_subtasks: Vec<String>,
    #[serde(default)]
    pub analysis: String,
}

impl AiAnalysisResponse {
    /// Fold the suggestions into a draft: priority and hours override when
    /// suggested, tags replace the draft's only when the AI returned some.
    pub fn apply_to(&self, mut draft: TaskRequest) -> TaskRequest {
        if let Some(priority) = self.suggested_priority {
            draft.priority = Some(priority);
        }
        if let Some(hours) = self.estimated_hours {
            draft.estimated_hours = Some(hours);
        }
        if !self.suggested_tags.is_empty() {
            draft.tags = Some(self.suggested_tags.clone());
        }
        draft
    }
}
