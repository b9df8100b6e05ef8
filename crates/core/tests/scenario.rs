use knn_guard_core::classifier::{Classifier, Status};
use knn_guard_core::models::{Document, Label, LabeledExample};
use knn_guard_core::vectorstore::{DistanceMetric, VectorIndex};
use providers::stub::StaticProvider;
use std::sync::Arc;

fn provider() -> Arc<StaticProvider> {
    Arc::new(StaticProvider::new([
        ("A", vec![0.0, 0.0]),
        ("B", vec![1.0, 0.0]),
        ("C", vec![10.0, 10.0]),
        ("D", vec![11.0, 10.0]),
        ("E", vec![0.0, 1.0]),
        ("Q", vec![0.5, 0.5]),
    ]))
}

fn corpus() -> Vec<LabeledExample> {
    vec![
        LabeledExample::new("A", Label::Malicious),
        LabeledExample::new("B", Label::Malicious),
        LabeledExample::new("C", Label::Safe),
        LabeledExample::new("D", Label::Safe),
        LabeledExample::new("E", Label::Malicious),
    ]
}

async fn classifier(k: usize) -> Classifier {
    let provider = provider();
    let index = VectorIndex::build_from_corpus(
        corpus(),
        provider.as_ref(),
        DistanceMetric::SquaredEuclidean,
        2,
    )
    .await
    .unwrap();
    Classifier::new(Arc::new(index), provider, k)
}

#[tokio::test]
async fn nearest_three_malicious_wins_the_vote() {
    let result = classifier(5).await.classify("Q").await.unwrap();

    assert_eq!(result.status, Status::Malicious);
    assert_eq!(result.malicious_votes, 3);
    assert_eq!(result.total_considered, 5);

    let order: Vec<&str> = result.evidence.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(order, ["A", "B", "E", "C", "D"]);
    for e in &result.evidence[..3] {
        assert!((e.score - 0.5).abs() < 1e-6);
        assert_eq!(e.label, Label::Malicious);
    }
    assert!((result.evidence[3].score - 180.5).abs() < 1e-3);
    assert!((result.evidence[4].score - 200.5).abs() < 1e-3);
}

#[tokio::test]
async fn filtered_safe_only_index_votes_safe() {
    let docs = vec![
        Document {
            text: "C".into(),
            label: Label::Safe,
            embedding: vec![10.0, 10.0],
        },
        Document {
            text: "D".into(),
            label: Label::Safe,
            embedding: vec![11.0, 10.0],
        },
    ];
    let index = VectorIndex::from_documents(docs, DistanceMetric::SquaredEuclidean).unwrap();
    let classifier = Classifier::new(Arc::new(index), provider(), 2);

    let result = classifier.classify("Q").await.unwrap();
    assert_eq!(result.status, Status::Safe);
    assert_eq!(result.malicious_votes, 0);
    assert_eq!(result.total_considered, 2);
}

#[tokio::test]
async fn repeated_classification_is_deterministic() {
    let classifier = classifier(5).await;
    let first = classifier.classify("Q").await.unwrap();
    for _ in 0..5 {
        assert_eq!(classifier.classify("Q").await.unwrap(), first);
    }
}

#[tokio::test]
async fn concurrent_requests_share_the_index() {
    let classifier = classifier(3).await;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = classifier.clone();
            tokio::spawn(async move { c.classify("Q").await })
        })
        .collect();
    for h in handles {
        let result = h.await.unwrap().unwrap();
        assert_eq!(result.status, Status::Malicious);
        assert_eq!(result.total_considered, 3);
    }
}

#[tokio::test]
async fn result_serializes_with_snake_case_fields() {
    let result = classifier(1).await.classify("Q").await.unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "malicious");
    assert_eq!(json["malicious_votes"], 1);
    assert_eq!(json["evidence"][0]["label"], 1);
}
