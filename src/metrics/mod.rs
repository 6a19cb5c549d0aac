// src/metrics/mod.rs
//
// Pure metric functions. Everything here works on plain numbers or row
// slices so the rules can be tested without a database.

use crate::config::{EngagementWeights, StudentWeights, TeacherWeights};
use crate::models::{ActivityTier, GradeRecord};

pub mod aggregator;

pub const SECONDS_PER_DAY: i64 = 86_400;

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// completed / enrolled × 100, one decimal. Zero enrolled yields 0.0.
pub fn completion_rate(completed: usize, enrolled: usize) -> f64 {
    if enrolled == 0 {
        return 0.0;
    }
    round1(completed as f64 / enrolled as f64 * 100.0)
}

/// Mean percentage over graded items; ungraded items are skipped and an
/// empty set yields 0.0.
pub fn average_grade<'a, I>(grades: I) -> f64
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let (sum, n) = grades
        .into_iter()
        .filter_map(GradeRecord::percent)
        .fold((0.0, 0usize), |(s, n), p| (s + p, n + 1));
    if n == 0 {
        0.0
    } else {
        round1(sum / n as f64)
    }
}

/// Estimated time on platform from activity timestamps. Gaps longer than
/// `session_cap` count as `session_cap`.
pub fn estimate_active_seconds(timestamps: &[i64], session_cap: i64) -> i64 {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .map(|w| (w[1] - w[0]).clamp(0, session_cap.max(0)))
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivitySample {
    pub logins: usize,
    pub active_seconds: i64,
    pub forum_posts: usize,
}

pub fn engagement_score(sample: ActivitySample, w: &EngagementWeights) -> f64 {
    let hours = sample.active_seconds.max(0) as f64 / 3600.0;
    let raw = sample.logins as f64 * w.per_login
        + hours * w.per_active_hour
        + sample.forum_posts as f64 * w.per_forum_post;
    round1(raw.clamp(0.0, 100.0))
}

pub fn teacher_performance_score(
    courses: usize,
    students: usize,
    completion_rate: f64,
    w: &TeacherWeights,
) -> f64 {
    let course_part = capped_ratio(courses as f64, w.course_target);
    let student_part = capped_ratio(students as f64, w.student_target);
    let completion_part = (completion_rate / 100.0).clamp(0.0, 1.0);
    round1(
        100.0 * (w.courses * course_part + w.completion * completion_part + w.students * student_part),
    )
}

pub fn student_performance_score(
    completion_rate: f64,
    average_grade: f64,
    engagement: f64,
    w: &StudentWeights,
) -> f64 {
    round1(completion_rate * w.completion + average_grade * w.grade + engagement * w.engagement)
}

fn capped_ratio(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (value / target).min(1.0)
}

/// Whole days from `then` to `now`, never negative.
pub fn days_between(now: i64, then: i64) -> i64 {
    ((now - then) / SECONDS_PER_DAY).max(0)
}

/// `None` means the user never logged in and ranks as most inactive.
pub fn classify_inactivity(days: Option<i64>) -> ActivityTier {
    match days {
        None => ActivityTier::Critical,
        Some(d) if d >= 14 => ActivityTier::Critical,
        Some(d) if d >= 7 => ActivityTier::Warning,
        Some(d) if d >= 3 => ActivityTier::LowActivity,
        Some(_) => ActivityTier::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(final_grade: Option<f64>, max: f64) -> GradeRecord {
        GradeRecord {
            user_id: 1,
            course_id: 2,
            item_type: "course".into(),
            finalgrade: final_grade,
            grademax: max,
        }
    }

    #[test]
    fn completion_rate_handles_empty_course() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(2, 4), 50.0);
        assert_eq!(completion_rate(1, 3), 33.3);
    }

    #[test]
    fn average_grade_skips_ungraded_items() {
        assert_eq!(average_grade(&[] as &[GradeRecord]), 0.0);
        assert_eq!(average_grade(&[grade(None, 100.0)]), 0.0);
        let grades = [grade(Some(8.0), 10.0), grade(None, 10.0), grade(Some(30.0), 50.0)];
        assert_eq!(average_grade(&grades), 70.0);
    }

    #[test]
    fn average_grade_ignores_zero_max_items() {
        let grades = [grade(Some(5.0), 0.0), grade(Some(45.0), 50.0)];
        assert_eq!(average_grade(&grades), 90.0);
    }

    #[test]
    fn active_time_caps_long_gaps() {
        // 10 min, then a 5 h gap capped to 30 min, then 5 min
        let ts = [0, 600, 600 + 5 * 3600, 600 + 5 * 3600 + 300];
        assert_eq!(estimate_active_seconds(&ts, 1800), 600 + 1800 + 300);
        assert_eq!(estimate_active_seconds(&[42], 1800), 0);
        assert_eq!(estimate_active_seconds(&[], 1800), 0);
    }

    #[test]
    fn active_time_is_order_independent() {
        let ts = [1200, 0, 600];
        assert_eq!(estimate_active_seconds(&ts, 1800), 1200);
    }

    #[test]
    fn engagement_is_monotonic_and_capped() {
        let w = EngagementWeights::default();
        let mut last = 0.0;
        for logins in 0..40 {
            let s = engagement_score(
                ActivitySample { logins, active_seconds: 3600, forum_posts: 1 },
                &w,
            );
            assert!(s >= last);
            assert!(s <= 100.0);
            last = s;
        }
        let mut last = 0.0;
        for forum_posts in 0..20 {
            let s = engagement_score(
                ActivitySample { logins: 2, active_seconds: 0, forum_posts },
                &w,
            );
            assert!(s >= last);
            last = s;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn engagement_uses_weights() {
        let w = EngagementWeights::default();
        let s = engagement_score(
            ActivitySample { logins: 4, active_seconds: 2 * 3600, forum_posts: 3 },
            &w,
        );
        assert_eq!(s, 20.0 + 4.0 + 30.0);
    }

    #[test]
    fn teacher_score_matches_weighted_sum() {
        let w = TeacherWeights::default();
        assert_eq!(teacher_performance_score(3, 15, 60.0, &w), 64.5);
        // caps at the targets
        assert_eq!(teacher_performance_score(50, 500, 100.0, &w), 100.0);
        assert_eq!(teacher_performance_score(0, 0, 0.0, &w), 0.0);
    }

    #[test]
    fn student_score_matches_weighted_sum() {
        let w = StudentWeights::default();
        assert_eq!(student_performance_score(50.0, 80.0, 20.0, &w), 53.0);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(classify_inactivity(Some(0)), ActivityTier::Active);
        assert_eq!(classify_inactivity(Some(2)), ActivityTier::Active);
        assert_eq!(classify_inactivity(Some(3)), ActivityTier::LowActivity);
        assert_eq!(classify_inactivity(Some(6)), ActivityTier::LowActivity);
        assert_eq!(classify_inactivity(Some(7)), ActivityTier::Warning);
        assert_eq!(classify_inactivity(Some(13)), ActivityTier::Warning);
        assert_eq!(classify_inactivity(Some(14)), ActivityTier::Critical);
        assert_eq!(classify_inactivity(None), ActivityTier::Critical);
    }

    #[test]
    fn days_between_truncates_and_never_goes_negative() {
        assert_eq!(days_between(7 * SECONDS_PER_DAY + 100, 0), 7);
        assert_eq!(days_between(0, 500), 0);
    }
}
