use super::*;

#[test]
fn missing_model_dir_is_reported_as_unavailable() {
    let config = LocalEmbedConfig::new("/nonexistent/local-embed-model");
    assert!(!LocalEmbedder::is_available(&config));
    assert!(matches!(
        LocalEmbedder::load(config),
        Err(LocalEmbedError::ModelNotFound { .. })
    ));
}

#[test]
fn normalize_scales_to_unit_length() {
    let normalized = LocalEmbedder::normalize(vec![3.0, 4.0]);
    let norm: f32 = normalized.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
}

#[test]
fn normalize_leaves_zero_vector_untouched() {
    let normalized = LocalEmbedder::normalize(vec![0.0, 0.0]);
    assert_eq!(normalized, vec![0.0, 0.0]);
}
