use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::models::{
    AttendanceRecord, ClassRecord, ClockTime, DeliveryMethod, EnrollmentRecord,
    EnrollmentStatus, ExamMarkRecord, ExamRecord, MemberStatus, PaymentChannel, PaymentRecord,
    PaymentStatus, RegistrationMethod, StudentRecord, TeacherRecord, UploadRecord,
};

/// Ordered accessor paths; dots descend into nested objects.
pub type FieldPaths = &'static [&'static str];

pub mod fields {
    use super::FieldPaths;

    pub const RECORD_ID: FieldPaths = &["id", "_id"];
    pub const STATUS: FieldPaths = &["status"];
    pub const CREATED_AT: FieldPaths = &["created_at", "createdAt"];
    pub const CLASS_ID: FieldPaths = &["class_id", "classId", "class_ID", "class.id"];
    pub const STUDENT_ID: FieldPaths = &["student_id", "studentId", "student_ID", "student.id"];

    pub const PAYMENT_DATE: FieldPaths =
        &["payment_date", "paymentDate", "date", "created_at", "createdAt"];
    pub const PAYMENT_AMOUNT: FieldPaths = &["amount", "total_amount", "totalAmount", "fee"];
    pub const PAYMENT_METHOD: FieldPaths = &["payment_method", "paymentMethod", "method"];
    pub const PAYMENT_STATUS: FieldPaths = &["status", "payment_status", "paymentStatus"];
    pub const PAYMENT_CLASS_NAME: FieldPaths = &["class_name", "className", "class.name"];
    pub const NOTES: FieldPaths = &["notes", "note", "remarks"];
    pub const DELIVERY_STATUS: FieldPaths =
        &["delivery_status", "deliveryStatus", "delivery.status"];

    pub const ENROLLMENT_DATE: FieldPaths =
        &["enrollment_date", "enrollmentDate", "enrolled_at", "created_at", "createdAt"];

    pub const REGISTRATION: FieldPaths = &[
        "registration_method",
        "registrationMethod",
        "registration_type",
        "registrationType",
    ];
    pub const STREAM: FieldPaths = &["stream", "stream_name", "streamName"];
    pub const MEMBER_SINCE: FieldPaths =
        &["created_at", "createdAt", "registration_date", "registrationDate"];
    pub const TEACHER_SUBJECT: FieldPaths = &["subject", "specialization", "subject_name"];

    pub const CLASS_NAME: FieldPaths = &["name", "class_name", "className", "title"];
    pub const SUBJECT: FieldPaths = &["subject", "subject_name", "subjectName"];
    pub const DELIVERY_METHOD: FieldPaths =
        &["delivery_method", "deliveryMethod", "class_type", "classType", "mode"];
    pub const SCHEDULE_DAY: FieldPaths = &["schedule_day", "scheduleDay", "schedule.day", "day"];
    pub const SCHEDULE_START: FieldPaths = &[
        "schedule_start_time",
        "scheduleStartTime",
        "schedule.start_time",
        "schedule.startTime",
        "start_time",
        "startTime",
    ];
    pub const SCHEDULE_END: FieldPaths = &[
        "schedule_end_time",
        "scheduleEndTime",
        "schedule.end_time",
        "schedule.endTime",
        "end_time",
        "endTime",
    ];
    pub const TEACHER_ID: FieldPaths = &["teacher_id", "teacherId", "teacher.id"];
    pub const NEXT_PAYMENT_DATE: FieldPaths = &["next_payment_date", "nextPaymentDate"];

    pub const ATTENDED_AT: FieldPaths =
        &["join_time", "joinTime", "meeting_start_time", "meetingStartTime"];
    pub const PRESENT: FieldPaths = &["present", "is_present", "isPresent", "attended"];

    pub const EXAM_ID: FieldPaths = &["exam_id", "examId", "exam.id"];
    pub const EXAM_TITLE: FieldPaths = &["title", "name", "exam_name"];
    pub const EXAM_DATE: FieldPaths = &["exam_date", "examDate", "date", "scheduled_at"];
    pub const STUDENT_NAME: FieldPaths = &["student_name", "studentName", "student.name"];
    pub const SCORE_AWARDED: FieldPaths =
        &["score_awarded", "scoreAwarded", "score", "marks_obtained"];
    pub const MAX_MARKS: FieldPaths = &["max_marks", "maxMarks", "total_marks", "totalMarks"];
    pub const PARENT_PART_ID: FieldPaths = &["parent_part_id", "parentPartId"];

    pub const UPLOADED_AT: FieldPaths =
        &["uploaded_at", "uploadedAt", "upload_date", "created_at", "createdAt"];
}

/// First non-null, non-blank value along `paths`.
pub fn lookup<'a>(record: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        let mut current = record;
        for key in path.split('.') {
            current = current.get(key)?;
        }
        match current {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            value => Some(value),
        }
    })
}

pub fn text(record: &Value, paths: &[&str]) -> String {
    match lookup(record, paths) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn number(record: &Value, paths: &[&str]) -> f64 {
    let raw = match lookup(record, paths) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_float(s),
        _ => 0.0,
    };
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

pub fn boolean(record: &Value, paths: &[&str]) -> Option<bool> {
    match lookup(record, paths)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn datetime(record: &Value, paths: &[&str]) -> Option<NaiveDateTime> {
    match lookup(record, paths)? {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

pub fn parse_float(raw: &str) -> f64 {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid float regex")
    });
    re.find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `HH:MM[:SS]` or `H:MM AM/PM`.
pub fn parse_clock_time(raw: &str) -> Option<ClockTime> {
    static TWELVE_HOUR: OnceLock<Regex> = OnceLock::new();
    let re = TWELVE_HOUR.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*([AP])\.?M\.?$").expect("valid 12h regex")
    });
    let trimmed = raw.trim();

    if let Some(caps) = re.captures(trimmed) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }
        let pm = caps[3].eq_ignore_ascii_case("p");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return Some(ClockTime { hour, minute });
    }

    if !trimmed.contains(':') {
        return None;
    }
    let mut parts = trimmed.split(':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    if let Some(seconds) = parts.next() {
        let seconds: u32 = seconds.trim().parse().ok()?;
        if seconds > 59 {
            return None;
        }
    }
    if parts.next().is_some() || hour > 23 || minute > 59 {
        return None;
    }
    Some(ClockTime { hour, minute })
}

pub fn member_status(raw: &str) -> MemberStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "active" => MemberStatus::Active,
        "inactive" => MemberStatus::Inactive,
        "dropped" => MemberStatus::Dropped,
        _ => MemberStatus::Other,
    }
}

pub fn payment_status(raw: &str) -> PaymentStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => PaymentStatus::Pending,
        "unpaid" => PaymentStatus::Unpaid,
        "completed" => PaymentStatus::Completed,
        "paid" => PaymentStatus::Paid,
        _ => PaymentStatus::Other,
    }
}

pub fn enrollment_status(raw: &str) -> EnrollmentStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => EnrollmentStatus::Active,
        "completed" => EnrollmentStatus::Completed,
        "dropped" => EnrollmentStatus::Dropped,
        "suspended" => EnrollmentStatus::Suspended,
        _ => EnrollmentStatus::Other,
    }
}

pub fn payment_channel(method: &str) -> PaymentChannel {
    let method = method.to_ascii_lowercase();
    if ["online", "card", "payhere"]
        .iter()
        .any(|marker| method.contains(marker))
    {
        PaymentChannel::Online
    } else {
        PaymentChannel::Cash
    }
}

pub fn registration_method(raw: &str) -> RegistrationMethod {
    if raw.to_ascii_lowercase().contains("online") {
        RegistrationMethod::Online
    } else {
        RegistrationMethod::Physical
    }
}

pub fn delivery_method(raw: &str) -> DeliveryMethod {
    let raw = raw.to_ascii_lowercase();
    if raw.contains("hybrid") {
        DeliveryMethod::Hybrid
    } else if raw.contains("online") {
        DeliveryMethod::Online
    } else {
        DeliveryMethod::Physical
    }
}

pub fn payment(raw: &Value) -> PaymentRecord {
    PaymentRecord {
        date: datetime(raw, fields::PAYMENT_DATE),
        amount: number(raw, fields::PAYMENT_AMOUNT),
        channel: payment_channel(&text(raw, fields::PAYMENT_METHOD)),
        status: payment_status(&text(raw, fields::PAYMENT_STATUS)),
        class_id: text(raw, fields::CLASS_ID),
        class_name: text(raw, fields::PAYMENT_CLASS_NAME),
        student_id: text(raw, fields::STUDENT_ID),
        notes: text(raw, fields::NOTES),
        delivery_status: text(raw, fields::DELIVERY_STATUS),
    }
}

pub fn enrollment(raw: &Value) -> EnrollmentRecord {
    EnrollmentRecord {
        student_id: text(raw, fields::STUDENT_ID),
        class_id: text(raw, fields::CLASS_ID),
        enrolled_at: datetime(raw, fields::ENROLLMENT_DATE),
        status: enrollment_status(&text(raw, fields::STATUS)),
    }
}

pub fn student(raw: &Value) -> StudentRecord {
    StudentRecord {
        status: member_status(&text(raw, fields::STATUS)),
        registration: registration_method(&text(raw, fields::REGISTRATION)),
        stream: text(raw, fields::STREAM),
        created_at: datetime(raw, fields::MEMBER_SINCE),
    }
}

pub fn teacher(raw: &Value) -> TeacherRecord {
    TeacherRecord {
        id: text(raw, fields::RECORD_ID),
        status: member_status(&text(raw, fields::STATUS)),
        subject: text(raw, fields::TEACHER_SUBJECT),
        created_at: datetime(raw, fields::MEMBER_SINCE),
    }
}

pub fn class(raw: &Value) -> ClassRecord {
    ClassRecord {
        id: text(raw, fields::RECORD_ID),
        name: text(raw, fields::CLASS_NAME),
        subject: text(raw, fields::SUBJECT),
        status: member_status(&text(raw, fields::STATUS)),
        delivery: delivery_method(&text(raw, fields::DELIVERY_METHOD)),
        schedule_day: text(raw, fields::SCHEDULE_DAY),
        start_time: text(raw, fields::SCHEDULE_START),
        end_time: text(raw, fields::SCHEDULE_END),
        teacher_id: text(raw, fields::TEACHER_ID),
        next_payment_date: datetime(raw, fields::NEXT_PAYMENT_DATE).map(|dt| dt.date()),
    }
}

// Explicit flag, then status word, then whether the student joined at all.
pub fn attendance(raw: &Value) -> AttendanceRecord {
    let joined = datetime(raw, fields::ATTENDED_AT).is_some();
    let present = boolean(raw, fields::PRESENT)
        .or_else(|| {
            match text(raw, fields::STATUS).to_ascii_lowercase().as_str() {
                "present" | "attended" | "late" => Some(true),
                "absent" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(joined);

    AttendanceRecord {
        class_id: text(raw, fields::CLASS_ID),
        present,
    }
}

pub fn exam(raw: &Value) -> ExamRecord {
    ExamRecord {
        id: text(raw, fields::RECORD_ID),
        title: text(raw, fields::EXAM_TITLE),
        class_id: text(raw, fields::CLASS_ID),
        exam_date: datetime(raw, fields::EXAM_DATE),
        created_at: datetime(raw, fields::CREATED_AT),
    }
}

pub fn exam_mark(raw: &Value) -> ExamMarkRecord {
    let parent = text(raw, fields::PARENT_PART_ID);
    ExamMarkRecord {
        exam_id: text(raw, fields::EXAM_ID),
        student_id: text(raw, fields::STUDENT_ID),
        student_name: text(raw, fields::STUDENT_NAME),
        score_awarded: number(raw, fields::SCORE_AWARDED),
        max_marks: number(raw, fields::MAX_MARKS),
        parent_part_id: (!parent.is_empty()).then_some(parent),
    }
}

pub fn upload(raw: &Value) -> UploadRecord {
    UploadRecord {
        class_id: text(raw, fields::CLASS_ID),
        uploaded_at: datetime(raw, fields::UPLOADED_AT),
    }
}
