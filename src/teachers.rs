use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{TeacherMetrics, TeacherRecord};
use crate::students::distribution;
use crate::window;

pub fn aggregate_teachers(teachers: &[TeacherRecord], now: NaiveDateTime) -> TeacherMetrics {
    let current = window::month_bucket(now.date(), 0);
    let mut subjects: HashMap<&str, usize> = HashMap::new();
    let mut active = 0usize;
    let mut new_this_month = 0usize;

    for teacher in teachers {
        if teacher.status.is_active() {
            active += 1;
        }
        if teacher
            .created_at
            .is_some_and(|created| current.contains(created.date()))
        {
            new_this_month += 1;
        }
        let subject = if teacher.subject.is_empty() {
            "Unspecified"
        } else {
            teacher.subject.as_str()
        };
        *subjects.entry(subject).or_insert(0) += 1;
    }

    TeacherMetrics {
        total: teachers.len(),
        active,
        inactive: teachers.len() - active,
        new_this_month,
        subject_distribution: distribution(subjects, teachers.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn roster_counts_follow_default_active_rule() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let teachers: Vec<TeacherRecord> = [
            json!({ "id": "t1", "subject": "Physics", "created_at": "2026-03-02" }),
            json!({ "id": "t2", "subject": "Physics", "status": "inactive" }),
            json!({ "id": "t3", "specialization": "Biology", "createdAt": "2025-12-01T10:00:00Z" }),
            json!({ "id": "t4" }),
        ]
        .iter()
        .map(normalize::teacher)
        .collect();

        let metrics = aggregate_teachers(&teachers, now);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.active, 3);
        assert_eq!(metrics.inactive, 1);
        assert_eq!(metrics.new_this_month, 1);
        assert_eq!(metrics.subject_distribution[0].name, "Physics");
        assert_eq!(metrics.subject_distribution[0].value, 2);
        assert_eq!(metrics.subject_distribution[1].name, "Biology");
        assert_eq!(metrics.subject_distribution[2].name, "Unspecified");
    }
}
