//! Scores the classifier against a held-out labeled dataset.

use knn_guard_core::classifier::{Classifier, Status};
use knn_guard_core::models::{Label, LabeledExample};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub total: usize,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
    pub unknown: usize,
    pub errors: usize,
}

impl EvalReport {
    fn record(&mut self, expected: Label, got: Status) {
        match (expected, got) {
            (_, Status::Unknown) => self.unknown += 1,
            (Label::Malicious, Status::Malicious) => self.true_positive += 1,
            (Label::Safe, Status::Malicious) => self.false_positive += 1,
            (Label::Safe, Status::Safe) => self.true_negative += 1,
            (Label::Malicious, Status::Safe) => self.false_negative += 1,
        }
    }

    /// Fraction of decided cases classified correctly.
    pub fn accuracy(&self) -> f64 {
        let decided =
            self.true_positive + self.false_positive + self.true_negative + self.false_negative;
        ratio(self.true_positive + self.true_negative, decided)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Classifies every case; failures are counted rather than aborting the run.
pub async fn evaluate(classifier: &Classifier, cases: &[LabeledExample]) -> EvalReport {
    let mut report = EvalReport::default();
    for case in cases {
        report.total += 1;
        match classifier.classify(&case.text).await {
            Ok(result) => report.record(case.label, result.status),
            Err(err) => {
                warn!(error = %err, text = %case.text, "eval case failed");
                report.errors += 1;
            }
        }
    }
    report
}
