use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    Online,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Unpaid,
    Completed,
    Paid,
    Other,
}

impl PaymentStatus {
    pub fn is_collected(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Paid)
    }

    pub fn is_outstanding(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Unpaid)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub date: Option<NaiveDateTime>,
    pub amount: f64,
    pub channel: PaymentChannel,
    pub status: PaymentStatus,
    pub class_id: String,
    pub class_name: String,
    pub student_id: String,
    pub notes: String,
    pub delivery_status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    Suspended,
    Other,
}

#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub student_id: String,
    pub class_id: String,
    pub enrolled_at: Option<NaiveDateTime>,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    Inactive,
    Dropped,
    Other,
}

impl MemberStatus {
    pub fn is_active(self) -> bool {
        self == MemberStatus::Active
    }

    pub fn has_left(self) -> bool {
        matches!(self, MemberStatus::Inactive | MemberStatus::Dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMethod {
    Online,
    Physical,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub status: MemberStatus,
    pub registration: RegistrationMethod,
    pub stream: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct TeacherRecord {
    pub id: String,
    pub status: MemberStatus,
    pub subject: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Online,
    Physical,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub fn minutes_since_midnight(self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub status: MemberStatus,
    pub delivery: DeliveryMethod,
    pub schedule_day: String,
    pub start_time: String,
    pub end_time: String,
    pub teacher_id: String,
    pub next_payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub class_id: String,
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct ExamRecord {
    pub id: String,
    pub title: String,
    pub class_id: String,
    pub exam_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct ExamMarkRecord {
    pub exam_id: String,
    pub student_id: String,
    pub student_name: String,
    pub score_awarded: f64,
    pub max_marks: f64,
    pub parent_part_id: Option<String>,
}

/// A study material or class recording; both only matter for their upload date.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub class_id: String,
    pub uploaded_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RevenueSplit {
    pub total: f64,
    pub online: f64,
    pub cash: f64,
}

impl RevenueSplit {
    pub fn add(&mut self, amount: f64, channel: PaymentChannel) {
        self.total += amount;
        match channel {
            PaymentChannel::Online => self.online += amount,
            PaymentChannel::Cash => self.cash += amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub label: String,
    pub total: f64,
    pub online: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRevenueShare {
    pub name: String,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_growth(growth: f64) -> Self {
        if growth > 0.0 {
            Trend::Up
        } else if growth < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueMetrics {
    pub this_month: RevenueSplit,
    pub last_month: RevenueSplit,
    pub trend: Trend,
    pub mrr: f64,
    pub mom_growth: f64,
    pub yoy_growth: f64,
    pub outstanding_payments: f64,
    pub collected_payments: f64,
    pub revenue_by_stream: Vec<StreamRevenueShare>,
    pub monthly_data: Vec<MonthlyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub value: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMonth {
    pub label: String,
    pub new_students: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMetrics {
    pub total: usize,
    pub active: usize,
    pub online_registered: usize,
    pub physical_registered: usize,
    pub this_month_enrollments: usize,
    pub last_month_enrollments: usize,
    pub enrollment_trend: f64,
    pub retention_rate: f64,
    pub drop_off_rate: f64,
    pub stream_distribution: Vec<NamedCount>,
    pub monthly_data: Vec<StudentMonth>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherMetrics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub new_this_month: usize,
    pub subject_distribution: Vec<NamedCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeSlot {
    Morning,
    MidMorning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 5] = [
        TimeSlot::Morning,
        TimeSlot::MidMorning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    /// Half-open hour ranges: [6,9), [9,12), [12,15), [15,18), [18,21).
    pub fn for_hour(hour: u32) -> Option<Self> {
        match hour {
            6..=8 => Some(TimeSlot::Morning),
            9..=11 => Some(TimeSlot::MidMorning),
            12..=14 => Some(TimeSlot::Afternoon),
            15..=17 => Some(TimeSlot::Evening),
            18..=20 => Some(TimeSlot::Night),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    Observed,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleHeatmapCell {
    pub day: String,
    pub time_slot: TimeSlot,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleHeatmap {
    pub mode: HeatmapMode,
    pub cells: Vec<ScheduleHeatmapCell>,
}

impl ScheduleHeatmap {
    pub fn count(&self, day: &str, slot: TimeSlot) -> Option<u32> {
        self.cells
            .iter()
            .find(|cell| cell.day == day && cell.time_slot == slot)
            .map(|cell| cell.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetrics {
    pub total: usize,
    pub active: usize,
    pub online: usize,
    pub physical: usize,
    pub hybrid: usize,
    pub schedule_heatmap: ScheduleHeatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDistribution {
    pub enrolled: usize,
    pub paid: usize,
    pub pending: usize,
    pub collection_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub exam_id: String,
    pub exam_title: String,
    pub student_id: String,
    pub student_name: String,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    PendingDelivery,
    OverduePayment,
    LowAttendance,
    TodaySchedule,
    ClassInProgress,
    UpcomingClass,
    NewEnrollment,
    NewMaterial,
    NewRecording,
    PaymentDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub time_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Upcoming,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledClass {
    pub class_id: String,
    pub name: String,
    pub subject: String,
    pub start_time: String,
    pub end_time: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentPoint {
    pub label: String,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Payment,
    Enrollment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub occurred_at: NaiveDateTime,
    pub time_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Exam,
    Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    pub kind: DeadlineKind,
    pub title: String,
    pub due: NaiveDate,
    pub days_left: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingMetrics {
    pub total_students: usize,
    pub active_classes: usize,
    pub monthly_revenue: f64,
    pub revenue_growth: f64,
    pub attendance_rate: f64,
    pub pending_payments: usize,
    pub collection_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub generated_at: NaiveDateTime,
    pub revenue: RevenueMetrics,
    pub students: StudentMetrics,
    pub teachers: TeacherMetrics,
    pub classes: ClassMetrics,
    pub payment_distribution: PaymentDistribution,
    pub alerts: Vec<Alert>,
    pub degraded_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDashboard {
    pub generated_at: NaiveDateTime,
    pub metrics: TeachingMetrics,
    pub today_schedule: Vec<ScheduledClass>,
    pub revenue_data: Vec<MonthlyBucket>,
    pub enrollment_data: Vec<EnrollmentPoint>,
    pub payment_distribution: PaymentDistribution,
    pub recent_activities: Vec<Activity>,
    pub alerts: Vec<Alert>,
    pub top_performers: Vec<TopPerformer>,
    pub upcoming_deadlines: Vec<Deadline>,
    pub degraded_sources: Vec<String>,
}
