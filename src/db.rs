use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::SourceError;
use crate::normalize::{self, fields};
use crate::sources::{parse_csv_records, parse_json_records, Feed, RecordSource};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for PgSource {
    async fn fetch(&self, feed: Feed) -> Result<Vec<Value>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT payload
            FROM dashboard_analytics.raw_records
            WHERE feed = $1
            ORDER BY imported_at, id
            "#,
        )
        .bind(feed.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get::<Value, _>("payload")).collect())
    }
}

/// `<feed>-<id>` when the record carries an id, otherwise a fresh key.
pub fn source_key(feed: Feed, record: &Value) -> String {
    let id = normalize::text(record, fields::RECORD_ID);
    if id.is_empty() {
        format!("import-{}", Uuid::new_v4())
    } else {
        format!("{feed}-{id}")
    }
}

async fn insert_record(
    pool: &PgPool,
    feed: Feed,
    record: &Value,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO dashboard_analytics.raw_records (id, feed, payload, source_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(feed.as_str())
    .bind(record)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool, now: NaiveDateTime) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for (feed, records) in seed_records(now) {
        for (index, record) in records.iter().enumerate() {
            let key = format!("seed-{feed}-{index:03}");
            if insert_record(pool, feed, record, &key).await? {
                inserted += 1;
            }
        }
    }
    Ok(inserted)
}

pub async fn import_file(pool: &PgPool, feed: Feed, path: &Path) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let records = if is_csv {
        parse_csv_records(&content).with_context(|| format!("invalid CSV in {}", path.display()))?
    } else {
        parse_json_records(feed, &content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?
    };

    let mut inserted = 0usize;
    for record in &records {
        if insert_record(pool, feed, record, &source_key(feed, record)).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn stamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

// Field names are mixed the way the upstream services mix them.
pub fn seed_records(now: NaiveDateTime) -> Vec<(Feed, Vec<Value>)> {
    let days_ago = |days: i64| stamp(now - Duration::days(days));
    let days_ahead = |days: i64| stamp(now + Duration::days(days));
    let today = now.format("%A").to_string();

    let classes = vec![
        json!({
            "id": "cls-phy-al", "name": "Physics 2026 A/L", "subject": "Physics", "grade": "13",
            "stream": "Physical Science", "status": "active", "delivery_method": "online",
            "teacher_id": "tch-perera", "schedule_day": today,
            "schedule_start_time": "08:00", "schedule_end_time": "10:00",
            "next_payment_date": days_ahead(3), "created_at": days_ago(200)
        }),
        json!({
            "id": "cls-chem-al", "className": "Chemistry Revision", "subjectName": "Chemistry",
            "gradeLevel": "12", "streamName": "Physical Science", "classType": "hybrid",
            "teacherId": "tch-perera",
            "schedule": { "day": today, "startTime": "4:30 PM", "endTime": "6:30 PM" },
            "createdAt": days_ago(120)
        }),
        json!({
            "id": "cls-bio", "title": "Biology Theory", "subject": "Biology", "grade": "12",
            "stream": "Biological Science", "status": "active", "mode": "physical",
            "teacher": { "id": "tch-silva" }, "day": "Saturday",
            "start_time": "13:00", "end_time": "15:00", "created_at": days_ago(90)
        }),
        json!({
            "id": "cls-acc", "name": "Accounting", "subject": "Accounting", "grade": "11",
            "stream": "Commerce", "status": "inactive", "teacher_id": "tch-fernando",
            "schedule_day": "Monday", "schedule_start_time": "18:00", "created_at": days_ago(400)
        }),
    ];

    let payments = vec![
        json!({ "id": "pay-001", "amount": 2500, "payment_method": "online", "status": "completed",
                "class_id": "cls-phy-al", "class_name": "Physics 2026 A/L", "student_id": "stu-001",
                "payment_date": days_ago(1) }),
        json!({ "paymentId": "pay-002", "totalAmount": "2500.00", "paymentMethod": "cash",
                "status": "paid", "classId": "cls-phy-al", "className": "Physics 2026 A/L",
                "studentId": "stu-002", "paymentDate": days_ago(35) }),
        json!({ "id": "pay-003", "amount": 1800, "method": "card", "status": "pending",
                "class": { "id": "cls-chem-al", "name": "Chemistry Revision" },
                "student_id": "stu-003", "created_at": days_ago(45) }),
        json!({ "id": "pay-004", "fee": 2000, "payment_method": "bank transfer",
                "paymentStatus": "unpaid", "class_id": "cls-bio", "class_name": "Biology Theory",
                "student_id": "stu-004", "date": days_ago(5) }),
        json!({ "id": "pay-005", "amount": 3000, "payment_method": "payhere", "status": "completed",
                "class_id": "cls-bio", "class_name": "Biology Theory", "student_id": "stu-001",
                "payment_date": days_ago(370),
                "notes": "Speed Post: 350", "delivery_status": "pending" }),
    ];

    let enrollments = vec![
        json!({ "student_id": "stu-001", "class_id": "cls-phy-al", "status": "active",
                "enrollment_date": days_ago(2), "payment_status": "paid" }),
        json!({ "studentId": "stu-002", "classId": "cls-phy-al", "status": "active",
                "enrollmentDate": days_ago(40) }),
        json!({ "student_id": "stu-003", "class_id": "cls-chem-al", "status": "active",
                "enrollmentDate": days_ago(60) }),
        json!({ "student_id": "stu-004", "class_id": "cls-bio", "status": "dropped",
                "created_at": days_ago(80) }),
    ];

    let students = vec![
        json!({ "id": "stu-001", "status": "active", "registration_method": "online",
                "stream": "Physical Science", "created_at": days_ago(2) }),
        json!({ "id": "stu-002", "registrationType": "Physical", "streamName": "Physical Science",
                "createdAt": days_ago(40) }),
        json!({ "id": "stu-003", "status": "active", "registrationMethod": "ONLINE",
                "stream": "Biological Science", "registration_date": days_ago(60) }),
        json!({ "id": "stu-004", "status": "dropped", "stream": "Commerce",
                "created_at": days_ago(200) }),
    ];

    let teachers = vec![
        json!({ "id": "tch-perera", "status": "active", "subject": "Physics",
                "created_at": days_ago(300) }),
        json!({ "id": "tch-silva", "specialization": "Biology", "createdAt": days_ago(3) }),
        json!({ "id": "tch-fernando", "status": "inactive", "subject_name": "Accounting" }),
    ];

    let attendance = vec![
        json!({ "class_id": "cls-phy-al", "student_id": "stu-001", "join_time": days_ago(7) }),
        json!({ "class_id": "cls-phy-al", "student_id": "stu-002", "status": "absent" }),
        json!({ "classId": "cls-chem-al", "studentId": "stu-003", "present": true,
                "meetingStartTime": days_ago(7) }),
        json!({ "class_id": "cls-chem-al", "student_id": "stu-001", "is_present": false }),
    ];

    let exams = vec![
        json!({ "id": "exm-phy-1", "title": "Mechanics Paper", "class_id": "cls-phy-al",
                "exam_date": days_ago(10) }),
        json!({ "id": "exm-chem-1", "name": "Organic Chemistry Quiz", "classId": "cls-chem-al",
                "examDate": days_ahead(4) }),
    ];

    let exam_marks = vec![
        json!({ "exam_id": "exm-phy-1", "student_id": "stu-001", "student_name": "Kavindu Perera",
                "score_awarded": 38, "max_marks": 50 }),
        json!({ "examId": "exm-phy-1", "studentId": "stu-002", "studentName": "Tharushi Silva",
                "scoreAwarded": 44, "maxMarks": 50 }),
        json!({ "exam_id": "exm-phy-1", "student_id": "stu-002", "score_awarded": 9,
                "max_marks": 10, "parent_part_id": "part-1" }),
    ];

    let materials = vec![
        json!({ "id": "mat-001", "title": "Kinematics notes", "class_id": "cls-phy-al",
                "uploaded_at": days_ago(1) }),
    ];

    let recordings = vec![
        json!({ "id": "rec-001", "fileName": "Chemistry week 6.mp4", "classId": "cls-chem-al",
                "uploadedAt": days_ago(2) }),
    ];

    let mut by_feed = HashMap::from([
        (Feed::Payments, payments),
        (Feed::Enrollments, enrollments),
        (Feed::Students, students),
        (Feed::Teachers, teachers),
        (Feed::Classes, classes),
        (Feed::Attendance, attendance),
        (Feed::Exams, exams),
        (Feed::ExamMarks, exam_marks),
        (Feed::Materials, materials),
        (Feed::Recordings, recordings),
    ]);

    Feed::ALL
        .into_iter()
        .map(|feed| (feed, by_feed.remove(&feed).unwrap_or_default()))
        .collect()
}
