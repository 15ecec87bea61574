use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use crate::alerts::relative_label;
use crate::classes::weekday_index;
use crate::models::{
    Activity, ActivityKind, AttendanceRecord, ClassRecord, Deadline, DeadlineKind,
    EnrollmentPoint, EnrollmentRecord, ExamRecord, PaymentDistribution, PaymentRecord,
    ScheduledClass, SessionStatus, TeachingMetrics,
};
use crate::normalize::parse_clock_time;
use crate::revenue::revenue_series;
use crate::window::{self, MonthBucket};

pub const DEADLINE_HORIZON_DAYS: i64 = 7;

/// Active classes meeting today, earliest first; unreadable start times go last.
pub fn today_schedule(classes: &[ClassRecord], now: NaiveDateTime) -> Vec<ScheduledClass> {
    let today = now.weekday().num_days_from_monday() as usize;
    let minute_now = now.hour() * 60 + now.minute();

    let mut sessions: Vec<(Option<u32>, ScheduledClass)> = classes
        .iter()
        .filter(|c| c.status.is_active() && weekday_index(&c.schedule_day) == Some(today))
        .map(|class| {
            let start = parse_clock_time(&class.start_time);
            let end = parse_clock_time(&class.end_time);
            let start_minute = start.map(|t| t.minutes_since_midnight());
            let status = match (start_minute, end.map(|t| t.minutes_since_midnight())) {
                (Some(s), _) if minute_now < s => SessionStatus::Upcoming,
                (Some(_), Some(e)) if minute_now >= e => SessionStatus::Completed,
                (Some(_), _) => SessionStatus::InProgress,
                (None, _) => SessionStatus::Upcoming,
            };
            let session = ScheduledClass {
                class_id: class.id.clone(),
                name: class.name.clone(),
                subject: class.subject.clone(),
                start_time: start.map_or_else(|| class.start_time.clone(), |t| t.to_string()),
                end_time: end.map_or_else(|| class.end_time.clone(), |t| t.to_string()),
                status,
            };
            (start_minute, session)
        })
        .collect();

    sessions.sort_by_key(|(start, _)| start.unwrap_or(u32::MAX));
    sessions.into_iter().map(|(_, session)| session).collect()
}

pub fn enrollment_series(
    enrollments: &[EnrollmentRecord],
    months: &[MonthBucket],
) -> Vec<EnrollmentPoint> {
    let mut counts = vec![0usize; months.len()];
    for enrolled_at in enrollments.iter().filter_map(|e| e.enrolled_at) {
        if let Some(index) = window::bucket_index(enrolled_at.date(), months) {
            counts[index] += 1;
        }
    }
    months
        .iter()
        .zip(counts)
        .map(|(month, enrollments)| EnrollmentPoint {
            label: month.label.clone(),
            enrollments,
        })
        .collect()
}

pub fn recent_activities(
    payments: &[PaymentRecord],
    enrollments: &[EnrollmentRecord],
    now: NaiveDateTime,
    limit: usize,
) -> Vec<Activity> {
    let payment_activity = payments.iter().filter_map(|payment| {
        let at = payment.date.filter(|at| *at <= now)?;
        let title = if payment.status.is_collected() {
            "Payment received"
        } else if payment.status.is_outstanding() {
            "Payment pending"
        } else {
            "Payment recorded"
        };
        let class = if payment.class_name.is_empty() {
            &payment.class_id
        } else {
            &payment.class_name
        };
        Some(Activity {
            kind: ActivityKind::Payment,
            title: title.to_string(),
            description: format!(
                "{:.2} from student {} for {}",
                payment.amount, payment.student_id, class
            ),
            occurred_at: at,
            time_label: relative_label(at, now),
        })
    });

    let enrollment_activity = enrollments.iter().filter_map(|enrollment| {
        let at = enrollment.enrolled_at.filter(|at| *at <= now)?;
        Some(Activity {
            kind: ActivityKind::Enrollment,
            title: "New enrollment".to_string(),
            description: format!(
                "Student {} joined class {}",
                enrollment.student_id, enrollment.class_id
            ),
            occurred_at: at,
            time_label: relative_label(at, now),
        })
    });

    let mut activities: Vec<Activity> = payment_activity.chain(enrollment_activity).collect();
    activities.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    activities.truncate(limit);
    activities
}

/// Exams within the next week (today included) and class fees due in 1..=7 days.
pub fn upcoming_deadlines(
    exams: &[ExamRecord],
    classes: &[ClassRecord],
    now: NaiveDateTime,
) -> Vec<Deadline> {
    let today = now.date();
    let horizon = today + Duration::days(DEADLINE_HORIZON_DAYS);

    let exam_deadlines = exams.iter().filter_map(|exam| {
        let due = exam.exam_date?.date();
        if due < today || due > horizon {
            return None;
        }
        Some(Deadline {
            kind: DeadlineKind::Exam,
            title: if exam.title.is_empty() {
                format!("Exam {}", exam.id)
            } else {
                exam.title.clone()
            },
            due,
            days_left: (due - today).num_days(),
        })
    });

    let fee_deadlines = classes.iter().filter_map(|class| {
        let due = class.next_payment_date?;
        let days_left = (due - today).num_days();
        if !(1..=DEADLINE_HORIZON_DAYS).contains(&days_left) {
            return None;
        }
        Some(Deadline {
            kind: DeadlineKind::Payment,
            title: format!("{} fee", class.name),
            due,
            days_left,
        })
    });

    let mut deadlines: Vec<Deadline> = exam_deadlines.chain(fee_deadlines).collect();
    deadlines.sort_by_key(|deadline| deadline.due);
    deadlines
}

pub fn teaching_metrics(
    classes: &[ClassRecord],
    payments: &[PaymentRecord],
    attendance: &[AttendanceRecord],
    distribution: &PaymentDistribution,
    now: NaiveDateTime,
) -> TeachingMetrics {
    let months = window::build_window(2, now.date());
    let series = revenue_series(payments, &months);
    let (last_month, this_month) = (series[0].total, series[1].total);
    let present = attendance.iter().filter(|r| r.present).count();

    TeachingMetrics {
        total_students: distribution.enrolled,
        active_classes: classes.iter().filter(|c| c.status.is_active()).count(),
        monthly_revenue: this_month,
        revenue_growth: window::pct_change(this_month, last_month),
        attendance_rate: window::share(present as f64, attendance.len() as f64),
        pending_payments: payments.iter().filter(|p| p.status.is_outstanding()).count(),
        collection_rate: distribution.collection_rate,
    }
}
