use crate::frame::Frame;
use anyhow::Result;
use std::cmp::Ordering;

/// A ranked class prediction. `confidence` lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_id: u32,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(class_id: u32, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
        }
    }

    pub fn percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// Image recognition network.
pub trait Classifier {
    /// The `top_k` most confident classes for `frame`, highest first.
    fn classify(&mut self, frame: &Frame, top_k: usize) -> Result<Vec<Prediction>>;

    fn class_label(&self, class_id: u32) -> Option<&str>;

    fn num_classes(&self) -> usize;

    fn network_name(&self) -> &str;

    /// Inference rate of the most recent classification.
    fn network_fps(&self) -> f32;

    fn print_profiler_times(&self);
}

/// Picks the `top_k` highest scores at or above `threshold`.
///
/// Ties keep class order, so the lower class id ranks first.
pub fn top_k(scores: &[f32], top_k: usize, threshold: f32) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite() && **s >= threshold)
        .map(|(i, s)| Prediction::new(i as u32, *s))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(top_k);
    ranked
}

/// Turns raw network outputs into probabilities.
///
/// Outputs that already form a distribution are returned unchanged.
pub fn to_probabilities(outputs: Vec<f32>) -> Vec<f32> {
    if outputs.is_empty() {
        return outputs;
    }
    let in_range = outputs.iter().all(|v| (0.0..=1.0).contains(v));
    let sum: f32 = outputs.iter().sum();
    if in_range && (sum - 1.0).abs() < 1e-3 {
        return outputs;
    }
    softmax(&outputs)
}

pub fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
