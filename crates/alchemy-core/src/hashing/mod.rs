//! Content fingerprinting for deduplication and cache keys.
//!
//! All hashes are BLAKE3, either full 256-bit (fingerprints, where collisions
//! would silently merge distinct prompts) or truncated to 64 bits (cache
//! keys, where a collision is just a cache miss).

use blake3::Hasher;

use crate::model::{Persona, Phase};

/// Full 256-bit content hash of arbitrary text.
#[inline]
pub fn hash_prompt(content: &str) -> [u8; 32] {
    *blake3::hash(content.as_bytes()).as_bytes()
}

/// Computes a 64-bit hash of `data` using BLAKE3, truncated from 256 bits.
///
/// # Truncation rationale
///
/// The first 8 bytes of a BLAKE3 hash are plenty for cache keys and
/// deduplication probes: a collision here is a cache miss or a redundant
/// generation, not data loss, and the birthday bound on 64 bits keeps
/// collisions negligible (~0.003%) up to tens of millions of entries.
/// Use [`hash_prompt`] instead wherever a collision would be silently
/// destructive (e.g. merging two distinct stored prompts).
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Full input fingerprint for a prompt: origin input, persona, phase,
/// producer, and temperature. Two requests with identical fingerprints are
/// eligible for the store's insert dedup shortcut.
pub fn hash_input_fingerprint(
    origin_input: &str,
    persona: Persona,
    phase: Phase,
    provider: &str,
    model: &str,
    temperature: f64,
) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(origin_input.as_bytes());
    hasher.update(b"|");
    hasher.update(persona.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(phase.slug().as_bytes());
    hasher.update(b"|");
    hasher.update(provider.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    hasher.update(b"|");
    hasher.update(&temperature.to_bits().to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// 64-bit cache key for an embedding request: text plus the model that will
/// embed it (two models never share a cache entry for the same text).
#[inline]
pub fn hash_embedding_cache_key(text: &str, model: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Hashes a session's origin input for use as a session-scoped dedup key.
#[inline]
pub fn hash_session_origin(origin_input: &str) -> u64 {
    hash_to_u64(origin_input.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_prompt_is_deterministic() {
        let content = "Write a haiku about rust.";
        assert_eq!(hash_prompt(content), hash_prompt(content));
    }

    #[test]
    fn hash_prompt_distinguishes_case_and_whitespace() {
        let variants = [
            "What is the capital of France?",
            "what is the capital of france?",
            "What is the capital of France? ",
        ];
        let hashes: std::collections::HashSet<_> = variants.iter().map(|p| hash_prompt(p)).collect();
        assert_eq!(hashes.len(), variants.len());
    }

    #[test]
    fn hash_to_u64_is_deterministic() {
        let data = b"tenant-session-key";
        assert_eq!(hash_to_u64(data), hash_to_u64(data));
    }

    #[test]
    fn fingerprint_is_stable_for_identical_inputs() {
        let a = hash_input_fingerprint("idea", Persona::Code, Phase::Solutio, "openai", "gpt-4o-mini", 0.7);
        let b = hash_input_fingerprint("idea", Persona::Code, Phase::Solutio, "openai", "gpt-4o-mini", 0.7);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_temperature() {
        let a = hash_input_fingerprint("idea", Persona::Code, Phase::Solutio, "openai", "gpt-4o-mini", 0.7);
        let b = hash_input_fingerprint("idea", Persona::Code, Phase::Solutio, "openai", "gpt-4o-mini", 0.9);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_phase() {
        let a = hash_input_fingerprint("idea", Persona::Code, Phase::PrimaMateria, "openai", "gpt-4o-mini", 0.7);
        let b = hash_input_fingerprint("idea", Persona::Code, Phase::Solutio, "openai", "gpt-4o-mini", 0.7);
        assert_ne!(a, b);
    }

    #[test]
    fn embedding_cache_key_distinguishes_model() {
        let a = hash_embedding_cache_key("hello", "text-embedding-3-small");
        let b = hash_embedding_cache_key("hello", "text-embedding-3-large");
        assert_ne!(a, b);
    }

    #[test]
    fn session_origin_hash_is_deterministic() {
        assert_eq!(hash_session_origin("idea"), hash_session_origin("idea"));
    }
}
