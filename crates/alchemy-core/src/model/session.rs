use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::prompt::Persona;
use super::Strategy;

/// One user request's grouping context: the origin input, persona, and
/// selection strategy shared by every prompt it produces.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    /// Stable unique identifier, shared by every [`crate::model::Prompt`] this
    /// session produces.
    pub session_id: Uuid,
    /// The original raw user input before any phase.
    pub origin_input: String,
    /// Target domain flavor applied across all phases.
    pub persona: Persona,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Which selection strategy governs this session's phase pipeline.
    pub phase_strategy: Strategy,
}

impl Session {
    /// Starts a new session with a freshly generated id and current timestamp.
    pub fn new(origin_input: impl Into<String>, persona: Persona, phase_strategy: Strategy) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            origin_input: origin_input.into(),
            persona,
            created_at: Utc::now(),
            phase_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_generates_unique_ids() {
        let a = Session::new("idea", Persona::Code, Strategy::Best);
        let b = Session::new("idea", Persona::Code, Strategy::Best);
        assert_ne!(a.session_id, b.session_id);
    }
}
