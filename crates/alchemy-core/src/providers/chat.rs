//! Chat call request/response shapes, independent of any wire format.

/// A single chat message, role-tagged.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Builds a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion request issued to a provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Model name to use.
    pub model: String,
    /// Sampling temperature, 0.0-2.0.
    pub temperature: f64,
    /// Max tokens to generate.
    pub max_tokens: u32,
    /// Stop sequences.
    pub stop: Vec<String>,
}

/// Result of a successful chat call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Prompt tokens consumed.
    pub tokens_in: u32,
    /// Completion tokens produced.
    pub tokens_out: u32,
    /// Wall-clock time for the call, in milliseconds.
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_and_user_builders_set_role() {
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("x").role, "user");
    }
}
