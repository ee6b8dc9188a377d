use uuid::Uuid;

/// What kind of edge connects two prompts in the lineage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// `to` was produced by feeding `from` into the next phase.
    Cascade,
    /// `to` is one iteration of the optimizer loop refining `from`.
    OptimizeIteration,
    /// `to` is a sibling variant of `from` produced in the same phase.
    Variant,
}

/// A directed edge between two prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Relationship {
    /// Source prompt id.
    pub from_prompt_id: Uuid,
    /// Destination prompt id.
    pub to_prompt_id: Uuid,
    /// What kind of edge this is.
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Builds a new relationship edge.
    pub fn new(from_prompt_id: Uuid, to_prompt_id: Uuid, kind: RelationshipKind) -> Self {
        Self {
            from_prompt_id,
            to_prompt_id,
            kind,
        }
    }
}
