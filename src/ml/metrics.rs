//! Held-out evaluation metrics for the crop classifier.

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one prediction; out-of-range positions are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Fraction of predictions on the diagonal; `0` when empty.
    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes).map(|k| self.get(k, k) as u64).sum();
        correct as f32 / total as f32
    }

    /// Precision, recall and support per class.
    pub fn per_class(&self) -> Vec<ClassStats> {
        let k = self.n_classes;
        (0..k)
            .map(|class_idx| {
                let tp = self.get(class_idx, class_idx) as f32;
                let support: u32 = (0..k).map(|j| self.get(class_idx, j)).sum();
                let predicted: u32 = (0..k).map(|i| self.get(i, class_idx)).sum();
                let precision = ratio(tp, predicted as f32);
                let recall = ratio(tp, support as f32);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassStats {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    pub f1: f32,
    /// Number of held-out rows whose true class is this one.
    pub support: u32,
}

fn ratio(num: f32, den: f32) -> f32 {
    if den == 0.0 { 0.0 } else { num / den }
}
