//! Chat + embedding provider registry: a uniform façade over heterogeneous
//! upstream LLM endpoints with fallback, timeout, and availability rules.

pub mod chat;
pub mod error;
pub mod registry;

pub use chat::{ChatMessage, ChatRequest, ChatResponse};
pub use error::ProviderError;
pub use registry::{ProviderInfo, Registry};
