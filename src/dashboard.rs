use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::alerts::{self, AlertInputs};
use crate::classes::aggregate_classes;
use crate::collector::{self, Collected};
use crate::distribution::payment_distribution;
use crate::error::AnalyticsError;
use crate::models::{
    AdminDashboard, AttendanceRecord, ClassRecord, EnrollmentRecord, ExamMarkRecord, ExamRecord,
    PaymentRecord, StudentRecord, TeacherDashboard, TeacherRecord, UploadRecord,
};
use crate::normalize;
use crate::performers::top_performers;
use crate::revenue::{aggregate_revenue, revenue_series};
use crate::sources::{Feed, RecordSource};
use crate::students::aggregate_students;
use crate::teachers::aggregate_teachers;
use crate::teaching;
use crate::window;

pub const ADMIN_FEEDS: [Feed; 8] = [
    Feed::Payments,
    Feed::Enrollments,
    Feed::Students,
    Feed::Teachers,
    Feed::Classes,
    Feed::Attendance,
    Feed::Materials,
    Feed::Recordings,
];

pub const TEACHER_FEEDS: [Feed; 8] = [
    Feed::Payments,
    Feed::Enrollments,
    Feed::Classes,
    Feed::Attendance,
    Feed::Exams,
    Feed::ExamMarks,
    Feed::Materials,
    Feed::Recordings,
];

pub const TEACHER_SERIES_MONTHS: usize = 6;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct Records {
    pub payments: Vec<PaymentRecord>,
    pub enrollments: Vec<EnrollmentRecord>,
    pub students: Vec<StudentRecord>,
    pub teachers: Vec<TeacherRecord>,
    pub classes: Vec<ClassRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub exams: Vec<ExamRecord>,
    pub exam_marks: Vec<ExamMarkRecord>,
    pub materials: Vec<UploadRecord>,
    pub recordings: Vec<UploadRecord>,
}

impl Records {
    pub fn from_collected(collected: &Collected) -> Self {
        Self {
            payments: collected.records(Feed::Payments).iter().map(normalize::payment).collect(),
            enrollments: collected
                .records(Feed::Enrollments)
                .iter()
                .map(normalize::enrollment)
                .collect(),
            students: collected.records(Feed::Students).iter().map(normalize::student).collect(),
            teachers: collected.records(Feed::Teachers).iter().map(normalize::teacher).collect(),
            classes: collected.records(Feed::Classes).iter().map(normalize::class).collect(),
            attendance: collected
                .records(Feed::Attendance)
                .iter()
                .map(normalize::attendance)
                .collect(),
            exams: collected.records(Feed::Exams).iter().map(normalize::exam).collect(),
            exam_marks: collected
                .records(Feed::ExamMarks)
                .iter()
                .map(normalize::exam_mark)
                .collect(),
            materials: collected.records(Feed::Materials).iter().map(normalize::upload).collect(),
            recordings: collected.records(Feed::Recordings).iter().map(normalize::upload).collect(),
        }
    }

    /// Only the given teacher's classes and everything attached to them.
    pub fn scoped_to_teacher(&self, teacher_id: &str) -> Self {
        let classes: Vec<ClassRecord> = self
            .classes
            .iter()
            .filter(|c| c.teacher_id == teacher_id)
            .cloned()
            .collect();
        let class_ids: HashSet<String> = classes.iter().map(|c| c.id.clone()).collect();
        let owned = |class_id: &str| class_ids.contains(class_id);

        let exams: Vec<ExamRecord> = self
            .exams
            .iter()
            .filter(|e| owned(&e.class_id))
            .cloned()
            .collect();
        let exam_ids: HashSet<String> = exams.iter().map(|e| e.id.clone()).collect();

        Self {
            payments: self.payments.iter().filter(|p| owned(&p.class_id)).cloned().collect(),
            enrollments: self
                .enrollments
                .iter()
                .filter(|e| owned(&e.class_id))
                .cloned()
                .collect(),
            students: self.students.clone(),
            teachers: self
                .teachers
                .iter()
                .filter(|t| t.id == teacher_id)
                .cloned()
                .collect(),
            attendance: self
                .attendance
                .iter()
                .filter(|a| owned(&a.class_id))
                .cloned()
                .collect(),
            exam_marks: self
                .exam_marks
                .iter()
                .filter(|m| exam_ids.contains(&m.exam_id))
                .cloned()
                .collect(),
            materials: self.materials.iter().filter(|m| owned(&m.class_id)).cloned().collect(),
            recordings: self
                .recordings
                .iter()
                .filter(|r| owned(&r.class_id))
                .cloned()
                .collect(),
            exams,
            classes,
        }
    }

    fn alert_inputs(&self) -> AlertInputs<'_> {
        AlertInputs {
            payments: &self.payments,
            enrollments: &self.enrollments,
            classes: &self.classes,
            attendance: &self.attendance,
            materials: &self.materials,
            recordings: &self.recordings,
        }
    }
}

pub fn build_admin(
    records: &Records,
    degraded_sources: Vec<String>,
    now: NaiveDateTime,
) -> AdminDashboard {
    AdminDashboard {
        generated_at: now,
        revenue: aggregate_revenue(&records.payments, now),
        students: aggregate_students(&records.students, now),
        teachers: aggregate_teachers(&records.teachers, now),
        classes: aggregate_classes(&records.classes),
        payment_distribution: payment_distribution(
            &records.classes,
            &records.enrollments,
            &records.payments,
            now,
        ),
        alerts: alerts::derive_alerts(&records.alert_inputs(), now),
        degraded_sources,
    }
}

pub fn build_teacher(
    records: &Records,
    degraded_sources: Vec<String>,
    alert_limit: usize,
    now: NaiveDateTime,
) -> TeacherDashboard {
    let months = window::build_window(TEACHER_SERIES_MONTHS, now.date());
    let distribution =
        payment_distribution(&records.classes, &records.enrollments, &records.payments, now);

    TeacherDashboard {
        generated_at: now,
        metrics: teaching::teaching_metrics(
            &records.classes,
            &records.payments,
            &records.attendance,
            &distribution,
            now,
        ),
        today_schedule: teaching::today_schedule(&records.classes, now),
        revenue_data: revenue_series(&records.payments, &months),
        enrollment_data: teaching::enrollment_series(&records.enrollments, &months),
        payment_distribution: distribution,
        recent_activities: teaching::recent_activities(
            &records.payments,
            &records.enrollments,
            now,
            RECENT_ACTIVITY_LIMIT,
        ),
        alerts: alerts::prioritized(
            alerts::derive_alerts(&records.alert_inputs(), now),
            alert_limit,
        ),
        top_performers: top_performers(&records.exams, &records.exam_marks),
        upcoming_deadlines: teaching::upcoming_deadlines(&records.exams, &records.classes, now),
        degraded_sources,
    }
}

pub struct DashboardService {
    source: Arc<dyn RecordSource>,
    timeout: Duration,
    alert_limit: usize,
}

impl DashboardService {
    pub fn new(source: Arc<dyn RecordSource>, timeout: Duration, alert_limit: usize) -> Self {
        Self {
            source,
            timeout,
            alert_limit,
        }
    }

    pub async fn admin_dashboard(
        &self,
        now: NaiveDateTime,
    ) -> Result<AdminDashboard, AnalyticsError> {
        let collected = self.gather(&ADMIN_FEEDS).await?;
        let records = Records::from_collected(&collected);
        let dashboard = build_admin(&records, collected.degraded_sources(), now);
        info!(
            payments = records.payments.len(),
            students = records.students.len(),
            classes = records.classes.len(),
            alerts = dashboard.alerts.len(),
            degraded = dashboard.degraded_sources.len(),
            "admin dashboard assembled"
        );
        Ok(dashboard)
    }

    pub async fn teacher_dashboard(
        &self,
        teacher_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<TeacherDashboard, AnalyticsError> {
        let collected = self.gather(&TEACHER_FEEDS).await?;
        let mut records = Records::from_collected(&collected);
        if let Some(teacher_id) = teacher_id {
            records = records.scoped_to_teacher(teacher_id);
        }

        let dashboard =
            build_teacher(&records, collected.degraded_sources(), self.alert_limit, now);
        info!(
            teacher = teacher_id.unwrap_or("all"),
            classes = records.classes.len(),
            today = dashboard.today_schedule.len(),
            alerts = dashboard.alerts.len(),
            degraded = dashboard.degraded_sources.len(),
            "teacher dashboard assembled"
        );
        Ok(dashboard)
    }

    async fn gather(&self, feeds: &[Feed]) -> Result<Collected, AnalyticsError> {
        let collected = collector::collect(self.source.as_ref(), feeds, self.timeout).await;
        if collected.all_failed() {
            for feed in feeds {
                if let Some(reason) = collected.failure(*feed) {
                    error!(feed = %feed, %reason, "feed failed");
                }
            }
            return Err(AnalyticsError::AllSourcesUnavailable {
                feeds: collected.degraded_sources(),
            });
        }
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::SourceOutcome;
    use crate::models::HeatmapMode;
    use crate::sources::testing::StaticSource;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    // Wednesday, 10:00.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sample_classes() -> Vec<Value> {
        vec![
            json!({
                "id": "c1", "name": "Physics A/L", "status": "active", "teacher_id": "t1",
                "schedule_day": "Wednesday",
                "schedule_start_time": "09:30", "schedule_end_time": "11:00",
                "delivery_method": "online", "stream": "Science"
            }),
            json!({
                "id": "c2", "className": "Commerce", "teacherId": "t2",
                "schedule": { "day": "Friday", "startTime": "4:00 PM", "endTime": "6:00 PM" }
            }),
        ]
    }

    fn sample_payments() -> Vec<Value> {
        vec![
            json!({ "id": "p1", "amount": 1500, "status": "completed", "payment_method": "card",
                    "class_id": "c1", "student_id": "s1", "payment_date": "2026-03-02T09:00:00" }),
            json!({ "id": "p2", "amount": "800", "status": "pending", "method": "cash",
                    "classId": "c2", "studentId": "s2", "date": "2026-01-10" }),
        ]
    }

    fn sample_enrollments() -> Vec<Value> {
        vec![
            json!({ "student_id": "s1", "class_id": "c1", "status": "active",
                    "enrollment_date": "2026-03-15" }),
            json!({ "student_id": "s2", "class_id": "c2", "status": "active",
                    "enrollment_date": "2026-02-01" }),
        ]
    }

    fn sample_source() -> StaticSource {
        StaticSource::default()
            .with(Feed::Classes, sample_classes())
            .with(Feed::Payments, sample_payments())
            .with(Feed::Enrollments, sample_enrollments())
            .with(
                Feed::Students,
                vec![
                    json!({ "id": "s1", "stream": "Science" }),
                    json!({ "id": "s2", "status": "inactive" }),
                ],
            )
            .with(Feed::Teachers, vec![json!({ "id": "t1", "subject": "Physics" })])
            .with(
                Feed::Exams,
                vec![json!({
                    "id": "e1", "title": "Unit test", "class_id": "c1", "exam_date": "2026-03-20"
                })],
            )
            .with(
                Feed::ExamMarks,
                vec![json!({
                    "exam_id": "e1", "student_id": "s1", "student_name": "Nimal",
                    "score_awarded": 45, "max_marks": 50
                })],
            )
    }

    fn service(source: StaticSource) -> DashboardService {
        DashboardService::new(Arc::new(source), Duration::from_secs(1), 8)
    }

    #[tokio::test]
    async fn admin_dashboard_survives_partial_failure() {
        let source = sample_source().failing(Feed::Attendance).failing(Feed::Materials);
        let dashboard = service(source).admin_dashboard(now()).await.unwrap();

        assert_eq!(
            dashboard.degraded_sources,
            vec!["attendance".to_string(), "materials".to_string()]
        );
        assert_eq!(dashboard.revenue.this_month.total, 1500.0);
        assert_eq!(dashboard.revenue.outstanding_payments, 800.0);
        assert_eq!(dashboard.students.total, 2);
        assert_eq!(dashboard.teachers.total, 1);
        assert_eq!(dashboard.classes.total, 2);
        assert_eq!(dashboard.classes.schedule_heatmap.mode, HeatmapMode::Observed);
        assert_eq!(dashboard.payment_distribution.enrolled, 2);
        assert_eq!(dashboard.payment_distribution.paid, 1);
    }

    #[tokio::test]
    async fn total_failure_is_an_error() {
        let source = ADMIN_FEEDS
            .iter()
            .fold(StaticSource::default(), |source, feed| source.failing(*feed));

        let err = service(source).admin_dashboard(now()).await.unwrap_err();
        let AnalyticsError::AllSourcesUnavailable { feeds } = err;
        assert_eq!(feeds.len(), ADMIN_FEEDS.len());
    }

    #[tokio::test]
    async fn teacher_dashboard_is_scoped_to_one_teacher() {
        let dashboard = service(sample_source())
            .teacher_dashboard(Some("t1"), now())
            .await
            .unwrap();

        assert_eq!(dashboard.today_schedule.len(), 1);
        assert_eq!(dashboard.today_schedule[0].class_id, "c1");
        assert_eq!(dashboard.metrics.active_classes, 1);
        assert_eq!(dashboard.metrics.pending_payments, 0);
        assert_eq!(dashboard.payment_distribution.enrolled, 1);
        assert_eq!(dashboard.revenue_data.len(), TEACHER_SERIES_MONTHS);
        assert_eq!(dashboard.revenue_data.last().unwrap().total, 1500.0);
        assert_eq!(dashboard.top_performers.len(), 1);
        assert_eq!(dashboard.top_performers[0].percentage, 90);
        assert_eq!(dashboard.upcoming_deadlines.len(), 1);
        assert!(dashboard.alerts.len() <= 8);
    }

    #[tokio::test]
    async fn unscoped_teacher_dashboard_sees_every_class() {
        let dashboard = service(sample_source()).teacher_dashboard(None, now()).await.unwrap();
        assert_eq!(dashboard.metrics.active_classes, 2);
        assert_eq!(dashboard.metrics.pending_payments, 1);
        assert!(dashboard.degraded_sources.is_empty());
    }

    #[tokio::test]
    async fn teacher_alerts_are_capped() {
        let source = sample_source();
        let dashboard = DashboardService::new(Arc::new(source), Duration::from_secs(1), 1)
            .teacher_dashboard(None, now())
            .await
            .unwrap();
        assert!(dashboard.alerts.len() <= 1);
    }

    #[test]
    fn building_twice_gives_identical_payloads() {
        let mut collected = Collected::default();
        collected.insert(Feed::Payments, SourceOutcome::Loaded(sample_payments()));
        collected.insert(Feed::Classes, SourceOutcome::Loaded(sample_classes()));
        collected.insert(Feed::Enrollments, SourceOutcome::Loaded(sample_enrollments()));
        let records = Records::from_collected(&collected);

        let first = serde_json::to_value(build_admin(&records, Vec::new(), now())).unwrap();
        let second = serde_json::to_value(build_admin(&records, Vec::new(), now())).unwrap();
        assert_eq!(first, second);

        let first = serde_json::to_value(build_teacher(&records, Vec::new(), 8, now())).unwrap();
        let second = serde_json::to_value(build_teacher(&records, Vec::new(), 8, now())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn payloads_serialize_as_camel_case() {
        let records = Records::default();
        let admin =
            serde_json::to_value(build_admin(&records, vec!["payments".into()], now())).unwrap();
        assert!(admin.get("paymentDistribution").is_some());
        assert_eq!(admin["degradedSources"], json!(["payments"]));

        let teacher = serde_json::to_value(build_teacher(&records, Vec::new(), 8, now())).unwrap();
        let keys = [
            "todaySchedule",
            "revenueData",
            "enrollmentData",
            "topPerformers",
            "upcomingDeadlines",
        ];
        for key in keys {
            assert!(teacher.get(key).is_some(), "missing {key}");
        }
    }
}
