//! HTTP (Transport B) and RPC-tool (Transport A) gateways over the engine.
//!
//! Neither transport talks to [`alchemy_core`] components directly; both
//! route every operation through [`ops`], so the two stay behaviorally
//! identical and only differ in wire shape (`dto` for HTTP bodies, `rpc`
//! for tool call/result envelopes).

pub mod dto;
pub mod error;
pub mod handler;
pub mod ops;
pub mod rpc;
pub mod state;

pub use handler::create_router;
pub use rpc::{dispatch, ToolCall, ToolResult};
pub use state::AppState;
