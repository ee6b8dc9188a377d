//! Per-`(phase, persona)` system prompt templates. Each pair gets its own
//! voice; the user message is assembled uniformly around whatever text the
//! phase is transforming.

use crate::model::{Persona, Phase};

/// Returns the system prompt for `phase` under `persona`.
pub fn system_prompt(phase: Phase, persona: Persona) -> &'static str {
    match (phase, persona) {
        (Phase::PrimaMateria, Persona::Code) => {
            "You are performing the prima-materia phase on a software idea: extract the raw \
             structural requirements — inputs, outputs, constraints, edge cases — into a \
             clear ordered list. Do not write any code yet. No embellishment."
        }
        (Phase::PrimaMateria, Persona::Writing) => {
            "You are performing the prima-materia phase on a writing idea: extract the raw \
             elements — audience, tone, length, key beats — into a clear ordered list. \
             Do not draft any prose yet."
        }
        (Phase::PrimaMateria, Persona::Analysis) => {
            "You are performing the prima-materia phase on an analytical idea: extract the \
             raw question, the data or evidence implied, and the decision it should inform, \
             into a clear ordered list."
        }
        (Phase::PrimaMateria, Persona::Generic) => {
            "You are performing the prima-materia phase: extract the raw structural elements \
             of the user's idea into a clear ordered list, without embellishment."
        }
        (Phase::Solutio, Persona::Code) => {
            "You are performing the solutio phase on a structured software requirement: \
             dissolve it into a natural-language prompt a capable coding model could act on \
             directly, preserving every constraint."
        }
        (Phase::Solutio, Persona::Writing) => {
            "You are performing the solutio phase on a structured writing brief: dissolve it \
             into a natural, flowing prompt that reads like an editor's brief, preserving \
             tone and audience."
        }
        (Phase::Solutio, Persona::Analysis) => {
            "You are performing the solutio phase on a structured analytical brief: dissolve \
             it into a natural prompt that states the question, the evidence to weigh, and \
             the form the answer should take."
        }
        (Phase::Solutio, Persona::Generic) => {
            "You are performing the solutio phase: dissolve the structured elements into a \
             natural, coherent prompt a capable model could act on directly."
        }
        (Phase::Coagulatio, Persona::Code) => {
            "You are performing the coagulatio phase: crystallize the prompt into its final, \
             precise form for a coding assistant — explicit about inputs, outputs, and \
             acceptance criteria, with no loose language left."
        }
        (Phase::Coagulatio, Persona::Writing) => {
            "You are performing the coagulatio phase: crystallize the prompt into its final \
             form for a writing assistant — a tight, unambiguous brief with nothing left to \
             guess at."
        }
        (Phase::Coagulatio, Persona::Analysis) => {
            "You are performing the coagulatio phase: crystallize the prompt into its final \
             form for an analysis assistant — the question, the method, and the expected \
             output format stated precisely."
        }
        (Phase::Coagulatio, Persona::Generic) => {
            "You are performing the coagulatio phase: crystallize the prompt into its final, \
             precise, unambiguous form."
        }
    }
}

/// Builds the user message for `phase`, wrapping `text` (either the
/// enhanced origin input, for independent strategies, or the previous
/// phase's winning output, for cascade).
pub fn user_message(phase: Phase, text: &str) -> String {
    match phase {
        Phase::PrimaMateria => format!("Raw idea:\n{text}"),
        Phase::Solutio => format!("Structured draft:\n{text}"),
        Phase::Coagulatio => format!("Natural-language draft:\n{text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_persona_pair_has_a_distinct_template() {
        let phases = crate::constants::PHASE_ORDER;
        let personas = [Persona::Code, Persona::Writing, Persona::Analysis, Persona::Generic];
        let mut seen = std::collections::HashSet::new();
        for phase in phases {
            for persona in personas {
                assert!(seen.insert(system_prompt(phase, persona)), "duplicate template for {phase:?}/{persona:?}");
            }
        }
    }

    #[test]
    fn user_message_carries_the_text_through() {
        assert!(user_message(Phase::PrimaMateria, "idea").contains("idea"));
    }
}
