use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::models::{
    ClassRecord, EnrollmentRecord, EnrollmentStatus, PaymentDistribution, PaymentRecord,
};
use crate::window;

/// Current-month collection status of students actively enrolled in active classes.
pub fn payment_distribution(
    classes: &[ClassRecord],
    enrollments: &[EnrollmentRecord],
    payments: &[PaymentRecord],
    now: NaiveDateTime,
) -> PaymentDistribution {
    let active_classes: HashSet<&str> = classes
        .iter()
        .filter(|c| c.status.is_active())
        .map(|c| c.id.as_str())
        .collect();

    let enrolled: HashSet<&str> = enrollments
        .iter()
        .filter(|e| e.status == EnrollmentStatus::Active)
        .filter(|e| !e.student_id.is_empty() && active_classes.contains(e.class_id.as_str()))
        .map(|e| e.student_id.as_str())
        .collect();

    let current = window::month_bucket(now.date(), 0);
    let payers: HashSet<&str> = payments
        .iter()
        .filter(|p| p.status.is_collected())
        .filter(|p| p.date.is_some_and(|dt| current.contains(dt.date())))
        .map(|p| p.student_id.as_str())
        .collect();

    let paid = enrolled.intersection(&payers).count();
    PaymentDistribution {
        enrolled: enrolled.len(),
        paid,
        pending: enrolled.len().saturating_sub(paid),
        collection_rate: collection_rate(paid, enrolled.len()),
    }
}

/// Whole-number percentage clamped to `0..=100`.
pub fn collection_rate(paid: usize, enrolled: usize) -> u32 {
    if enrolled == 0 {
        return 0;
    }
    (paid as f64 / enrolled as f64 * 100.0).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn classes() -> Vec<ClassRecord> {
        [
            json!({ "id": "c1", "status": "active" }),
            json!({ "id": "c2", "status": "inactive" }),
        ]
        .iter()
        .map(normalize::class)
        .collect()
    }

    fn enrollments(rows: &[Value]) -> Vec<EnrollmentRecord> {
        rows.iter().map(normalize::enrollment).collect()
    }

    fn payments(rows: &[Value]) -> Vec<PaymentRecord> {
        rows.iter().map(normalize::payment).collect()
    }

    #[test]
    fn paid_is_the_intersection_of_enrolled_and_payers() {
        let enrollments = enrollments(&[
            json!({ "student_id": "s1", "class_id": "c1", "status": "active" }),
            json!({ "student_id": "s2", "classId": "c1", "status": "active" }),
            json!({ "student_id": "s2", "class_ID": "c1", "status": "active" }),
            json!({ "student_id": "s3", "class_id": "c1", "status": "active" }),
            json!({ "student_id": "s4", "class_id": "c2", "status": "active" }),
            json!({ "student_id": "s5", "class_id": "c1", "status": "dropped" }),
        ]);
        let payments = payments(&[
            json!({ "student_id": "s1", "status": "completed", "payment_date": "2026-03-02" }),
            json!({ "student_id": "s2", "status": "pending", "payment_date": "2026-03-02" }),
            json!({ "student_id": "s3", "status": "paid", "payment_date": "2026-02-27" }),
            json!({ "student_id": "s4", "status": "completed", "payment_date": "2026-03-03" }),
            json!({ "student_id": "s9", "status": "completed", "payment_date": "2026-03-03" }),
        ]);

        let distribution = payment_distribution(&classes(), &enrollments, &payments, now());
        assert_eq!(distribution.enrolled, 3);
        assert_eq!(distribution.paid, 1);
        assert_eq!(distribution.pending, 2);
        assert_eq!(distribution.collection_rate, 33);
    }

    #[test]
    fn no_enrollments_means_zero_rate() {
        let distribution = payment_distribution(&classes(), &[], &[], now());
        assert_eq!(
            distribution,
            PaymentDistribution {
                enrolled: 0,
                paid: 0,
                pending: 0,
                collection_rate: 0
            }
        );
    }

    #[test]
    fn collection_rate_is_always_within_bounds() {
        assert_eq!(collection_rate(5, 3), 100);
        assert_eq!(collection_rate(0, 3), 0);
        assert_eq!(collection_rate(2, 3), 67);
        for enrolled in 0..20 {
            for paid in 0..25 {
                assert!(collection_rate(paid, enrolled) <= 100);
            }
        }
    }
}
