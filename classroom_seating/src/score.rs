//! Score computation.
//!
//! Every student starts at 100 points. Each occurrence in an attendance
//! category subtracts the penalty of that category, and the manual bonus is
//! added at the end. Raw scores are then rescaled against the students who
//! went above 100 (see [`rescale`]).

use log::{debug, info};

use crate::config::*;
use crate::context::SessionContext;

pub const BASE_SCORE: i64 = 100;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StudentScore {
    /// 1-based position in the roster.
    pub index: usize,
    pub name: String,
    /// Occurrences per category, in registry order.
    pub occurrences: Vec<u32>,
    /// 100 minus the penalties.
    pub base_score: i64,
    pub bonus: i64,
    pub total_score: i64,
    /// In `[0, 100]`.
    pub final_score: i64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScoreReport {
    /// The mean total score of the students above 100, or 100.
    pub benchmark: f64,
    pub scale_factor: f64,
    pub students: Vec<StudentScore>,
}

/// The total (unscaled) score of every student of the roster, in roster order.
pub fn raw_scores(
    roster: &ClassRoster,
    records: &[AttendanceRecord],
    bonuses: &BonusScores,
    categories: &CategoryRegistry,
) -> Vec<StudentScore> {
    let mut scores: Vec<StudentScore> = roster
        .students
        .iter()
        .enumerate()
        .map(|(idx, name)| StudentScore {
            index: idx + 1,
            name: name.clone(),
            occurrences: vec![0; categories.len()],
            base_score: BASE_SCORE,
            bonus: 0,
            total_score: BASE_SCORE,
            final_score: 0,
        })
        .collect();

    for record in records {
        for (label, students) in record.attendance.iter() {
            let ordinal = match categories.ordinal_of(label) {
                Some(o) => o,
                None => {
                    debug!(
                        "raw_scores: {}: ignoring unknown category {:?}",
                        record.date, label
                    );
                    continue;
                }
            };
            let penalty = categories.defs()[ordinal].penalty_score as i64;
            for student in students {
                if let Some(idx) = roster.index_of(student) {
                    let s = &mut scores[idx];
                    s.occurrences[ordinal] += 1;
                    s.base_score -= penalty;
                }
            }
        }
    }

    for s in scores.iter_mut() {
        s.bonus = bonuses.get(&s.name).cloned().unwrap_or(0);
        s.total_score = s.base_score + s.bonus;
    }
    scores
}

/// Rescales the total scores of a whole class.
///
/// The mean of the scores above 100 becomes the new 100 and all the other
/// scores are scaled by the same factor. The result is rounded (half away
/// from zero) and clamped to `[0, 100]`. It depends on every score of the
/// class, so it has to be recomputed when any of them changes.
///
/// Returns the benchmark and the final scores, in the same order.
pub fn rescale(totals: &[i64]) -> (f64, Vec<i64>) {
    let high: Vec<i64> = totals
        .iter()
        .cloned()
        .filter(|t| *t > BASE_SCORE)
        .collect();
    let benchmark = if high.is_empty() {
        BASE_SCORE as f64
    } else {
        high.iter().sum::<i64>() as f64 / high.len() as f64
    };
    let scale_factor = BASE_SCORE as f64 / benchmark;
    let finals = totals
        .iter()
        .map(|t| {
            let scaled = (*t as f64 * scale_factor).round() as i64;
            scaled.clamp(0, BASE_SCORE)
        })
        .collect();
    (benchmark, finals)
}

/// Computes the final score of every student of a class.
pub fn compute_scores(
    roster: &ClassRoster,
    records: &[AttendanceRecord],
    bonuses: &BonusScores,
    ctx: &SessionContext,
) -> ScoreReport {
    info!(
        "compute_scores: class {}: {} students, {} records",
        roster.name,
        roster.students.len(),
        records.len()
    );
    let mut students = raw_scores(roster, records, bonuses, &ctx.categories);
    let totals: Vec<i64> = students.iter().map(|s| s.total_score).collect();
    let (benchmark, finals) = rescale(&totals);
    for (s, f) in students.iter_mut().zip(finals) {
        s.final_score = f;
    }
    let scale_factor = BASE_SCORE as f64 / benchmark;
    debug!(
        "compute_scores: benchmark {:.3}, scale factor {:.5}",
        benchmark, scale_factor
    );
    ScoreReport {
        benchmark,
        scale_factor,
        students,
    }
}

/// For each category, the number of records (days) in which the student
/// appears at least once. Categories without any day are omitted.
pub fn student_day_summary(
    student: &str,
    records: &[AttendanceRecord],
    categories: &CategoryRegistry,
) -> Vec<(String, u32)> {
    categories
        .defs()
        .iter()
        .filter_map(|def| {
            let days = records
                .iter()
                .filter(|r| r.students(&def.category).iter().any(|s| s == student))
                .count() as u32;
            if days > 0 {
                Some((def.category.clone(), days))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> ClassRoster {
        ClassRoster::new("1A", &["A".to_string(), "B".to_string(), "C".to_string()]).unwrap()
    }

    fn scenario_record() -> AttendanceRecord {
        let mut r = AttendanceRecord::new("2024-01-01");
        r.attendance
            .insert("迟".to_string(), vec!["A".to_string(), "A".to_string()]);
        r.attendance.insert("旷".to_string(), vec!["B".to_string()]);
        r
    }

    fn finals(report: &ScoreReport) -> Vec<i64> {
        report.students.iter().map(|s| s.final_score).collect()
    }

    #[test]
    fn scenario_without_bonus() {
        let ctx = SessionContext::new("2024-01-01");
        let report = compute_scores(&roster(), &[scenario_record()], &BonusScores::new(), &ctx);
        let totals: Vec<i64> = report.students.iter().map(|s| s.total_score).collect();
        assert_eq!(totals, vec![98, 95, 100]);
        assert_eq!(report.benchmark, 100.0);
        assert_eq!(finals(&report), vec![98, 95, 100]);
        assert_eq!(report.students[0].occurrences[1], 2);
    }

    #[test]
    fn scenario_with_bonus() {
        let ctx = SessionContext::new("2024-01-01");
        let mut bonuses = BonusScores::new();
        bonuses.insert("A".to_string(), 10);
        let report = compute_scores(&roster(), &[scenario_record()], &bonuses, &ctx);
        assert_eq!(report.students[0].total_score, 108);
        assert_eq!(report.benchmark, 108.0);
        assert_eq!(finals(&report), vec![100, 88, 93]);
    }

    #[test]
    fn bonus_category_adds_points() {
        let mut r = AttendanceRecord::new("2024-01-01");
        r.attendance.insert("加".to_string(), vec!["C".to_string()]);
        r.attendance.insert("??".to_string(), vec!["C".to_string()]);
        let scores = raw_scores(
            &roster(),
            &[r],
            &BonusScores::new(),
            &CategoryRegistry::reference(),
        );
        assert_eq!(scores[2].total_score, 101);
    }

    #[test]
    fn degenerate_benchmark_only_clamps() {
        let (benchmark, finals) = rescale(&[100, 40, -20, 0]);
        assert_eq!(benchmark, 100.0);
        assert_eq!(finals, vec![100, 40, 0, 0]);
    }

    #[test]
    fn final_scores_are_clamped() {
        let vectors: Vec<Vec<i64>> = vec![
            vec![],
            vec![250],
            vec![101, 102, -300],
            vec![1000, 100, 99, -1000],
            vec![-5, -5, -5],
            vec![150, 150, 150, 20],
        ];
        for v in vectors {
            let (_, finals) = rescale(&v);
            assert_eq!(finals.len(), v.len());
            assert!(
                finals.iter().all(|f| (0..=100).contains(f)),
                "{:?} -> {:?}",
                v,
                finals
            );
        }
    }

    #[test]
    fn more_infractions_never_raise_the_final_score() {
        let ctx = SessionContext::new("2024-01-01");
        let mut bonuses = BonusScores::new();
        bonuses.insert("B".to_string(), 30);
        bonuses.insert("C".to_string(), 7);
        for label in ["加", "迟", "假", "旷", "睡", "玩"] {
            let mut previous: Option<i64> = None;
            for n in 0..12 {
                let mut r = AttendanceRecord::new("2024-01-01");
                r.attendance
                    .insert(label.to_string(), vec!["C".to_string(); n]);
                let report = compute_scores(&roster(), &[r], &bonuses, &ctx);
                let c = report.students[2].final_score;
                if let (Some(p), true) = (previous, label != "加") {
                    assert!(c <= p, "{} x{}: {} > {}", label, n, c, p);
                }
                previous = Some(c);
            }
        }
    }

    #[test]
    fn day_summary_counts_days_not_occurrences() {
        let mut second = AttendanceRecord::new("2024-01-02");
        second
            .attendance
            .insert("迟".to_string(), vec!["A".to_string()]);
        let summary = student_day_summary(
            "A",
            &[scenario_record(), second],
            &CategoryRegistry::reference(),
        );
        assert_eq!(summary, vec![("迟".to_string(), 2)]);
        assert!(student_day_summary("C", &[scenario_record()], &CategoryRegistry::reference()).is_empty());
    }
}
