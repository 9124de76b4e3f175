//! Aggregate statistics across attempt history.
//!
//! Feeds the analytics dashboard: average and best accuracy, per-difficulty
//! and per-subject averages, pass rate, and topic weaknesses ranked by how
//! badly they score across attempts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Difficulty;
use crate::results::{AttemptResult, TopicScore};

/// Accuracy at or above which an attempt counts as a pass.
pub const PASS_MARK: u32 = 60;

/// How worrying a weak topic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaknessSeverity {
    /// Below 50%.
    Critical,
    /// Below 65%.
    Watch,
    Ok,
}

impl WeaknessSeverity {
    pub fn for_accuracy(accuracy: f64) -> Self {
        if accuracy < 50.0 {
            WeaknessSeverity::Critical
        } else if accuracy < 65.0 {
            WeaknessSeverity::Watch
        } else {
            WeaknessSeverity::Ok
        }
    }
}

impl fmt::Display for WeaknessSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaknessSeverity::Critical => write!(f, "Critical"),
            WeaknessSeverity::Watch => write!(f, "Watch"),
            WeaknessSeverity::Ok => write!(f, "OK"),
        }
    }
}

/// Average accuracy over a group of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub attempts: usize,
    pub avg_accuracy: f64,
}

/// Cross-attempt tally for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    pub accuracy: f64,
    pub severity: WeaknessSeverity,
}

/// Dashboard aggregates over attempt history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub attempts: usize,
    /// Mean of attempt accuracies, rounded.
    pub avg_accuracy: u32,
    pub best_accuracy: u32,
    /// Fraction of attempts at or above [`PASS_MARK`], 0.0 to 1.0.
    pub pass_rate: f64,
    pub total_minutes: u32,
    pub integrity_warnings: u32,
    pub per_difficulty: BTreeMap<Difficulty, GroupStats>,
    pub per_subject: BTreeMap<String, GroupStats>,
    /// Every topic seen, weakest first.
    pub topics: Vec<TopicStats>,
}

impl HistoryStats {
    /// Topics rated [`WeaknessSeverity::Critical`] or [`WeaknessSeverity::Watch`].
    pub fn weak_topics(&self) -> impl Iterator<Item = &TopicStats> {
        self.topics
            .iter()
            .filter(|t| t.severity != WeaknessSeverity::Ok)
    }
}

/// Compute dashboard aggregates. Returns zeroed stats for an empty history.
pub fn compute_history_stats(attempts: &[AttemptResult]) -> HistoryStats {
    let n = attempts.len();
    let accuracy_sum: u32 = attempts.iter().map(|a| a.accuracy).sum();
    let avg_accuracy = if n == 0 {
        0
    } else {
        (accuracy_sum as f64 / n as f64).round() as u32
    };
    let passed = attempts.iter().filter(|a| a.accuracy >= PASS_MARK).count();

    let mut per_difficulty: BTreeMap<Difficulty, Vec<u32>> = BTreeMap::new();
    let mut per_subject: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    let mut topic_totals: BTreeMap<String, TopicScore> = BTreeMap::new();

    for a in attempts {
        per_difficulty.entry(a.difficulty).or_default().push(a.accuracy);
        per_subject
            .entry(a.subject.clone())
            .or_default()
            .push(a.accuracy);
        for (topic, score) in &a.topic_breakdown {
            let entry = topic_totals.entry(topic.clone()).or_default();
            entry.correct += score.correct;
            entry.total += score.total;
        }
    }

    let mut topics: Vec<TopicStats> = topic_totals
        .into_iter()
        .map(|(topic, score)| {
            let accuracy = score.accuracy();
            TopicStats {
                topic,
                correct: score.correct,
                total: score.total,
                accuracy,
                severity: WeaknessSeverity::for_accuracy(accuracy),
            }
        })
        .collect();
    // Stable sort keeps topic-name order among equal accuracies.
    topics.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));

    HistoryStats {
        attempts: n,
        avg_accuracy,
        best_accuracy: attempts.iter().map(|a| a.accuracy).max().unwrap_or(0),
        pass_rate: if n == 0 { 0.0 } else { passed as f64 / n as f64 },
        total_minutes: attempts.iter().map(|a| a.time_taken_minutes).sum(),
        integrity_warnings: attempts.iter().map(|a| a.integrity_warnings).sum(),
        per_difficulty: per_difficulty
            .into_iter()
            .map(|(k, v)| (k, group(&v)))
            .collect(),
        per_subject: per_subject
            .into_iter()
            .map(|(k, v)| (k, group(&v)))
            .collect(),
        topics,
    }
}

fn group(accuracies: &[u32]) -> GroupStats {
    let sum: u32 = accuracies.iter().sum();
    GroupStats {
        attempts: accuracies.len(),
        avg_accuracy: if accuracies.is_empty() {
            0.0
        } else {
            sum as f64 / accuracies.len() as f64
        },
    }
}
