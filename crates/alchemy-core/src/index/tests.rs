use super::mock::{cosine_similarity, MockIndex};
use super::*;
use uuid::Uuid;

fn payload() -> IndexPayload {
    IndexPayload {
        phase: Phase::Solutio,
        persona: Persona::Code,
        provider: "openai".to_string(),
        score: 8.0,
        session_id: Uuid::new_v4(),
    }
}

#[test]
fn cosine_similarity_of_identical_vectors_is_one() {
    let v = vec![1.0, 2.0, 3.0];
    assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn upsert_then_query_finds_exact_match() {
    let index = MockIndex::new();
    let id = Uuid::new_v4();
    index
        .upsert(id, vec![1.0, 0.0, 0.0], payload())
        .await
        .unwrap();

    let results = index
        .query(vec![1.0, 0.0, 0.0], 1, IndexFilters::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id);
    assert!(results[0].similarity >= 0.999);
}

#[tokio::test]
async fn query_respects_phase_filter() {
    let index = MockIndex::new();
    let matching = Uuid::new_v4();
    let other = Uuid::new_v4();
    index
        .upsert(matching, vec![1.0, 0.0], payload())
        .await
        .unwrap();
    let mut other_payload = payload();
    other_payload.phase = Phase::Coagulatio;
    index.upsert(other, vec![1.0, 0.0], other_payload).await.unwrap();

    let filters = IndexFilters {
        phase: Some(Phase::Solutio),
        ..Default::default()
    };
    let results = index.query(vec![1.0, 0.0], 10, filters).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, matching);
}

#[tokio::test]
async fn delete_removes_point_from_results() {
    let index = MockIndex::new();
    let id = Uuid::new_v4();
    index.upsert(id, vec![1.0, 0.0], payload()).await.unwrap();
    index.delete(id).await.unwrap();
    assert!(index.is_empty());
}
