use serde::Serialize;

use crate::repositories::classes::ScoreRow;

pub(crate) const PASS_THRESHOLD_PERCENT: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ClassAnalysis {
    pub(crate) total_submissions: usize,
    pub(crate) average_score: f64,
    pub(crate) pass_rate: f64,
}

/// Averages are taken over per-submission percentages of each exam's total.
pub(crate) fn analyze(rows: &[ScoreRow]) -> ClassAnalysis {
    let percentages: Vec<f64> = rows
        .iter()
        .filter(|row| row.total_points > 0)
        .map(|row| row.graded_score * 100.0 / f64::from(row.total_points))
        .collect();

    if percentages.is_empty() {
        return ClassAnalysis { total_submissions: rows.len(), average_score: 0.0, pass_rate: 0.0 };
    }

    let count = percentages.len() as f64;
    let average = percentages.iter().sum::<f64>() / count;
    let passed = percentages.iter().filter(|value| **value >= PASS_THRESHOLD_PERCENT).count();

    ClassAnalysis {
        total_submissions: rows.len(),
        average_score: round2(average),
        pass_rate: round2(passed as f64 / count * 100.0),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
