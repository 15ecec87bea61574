use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use regex::Regex;

use crate::classes::{weekday_index, WEEKDAYS};
use crate::models::{
    Alert, AlertKind, AlertPriority, AttendanceRecord, ClassRecord, EnrollmentRecord,
    PaymentRecord, PaymentStatus, UploadRecord,
};
use crate::normalize::parse_clock_time;

pub const OVERDUE_AFTER_DAYS: i64 = 30;
pub const LOW_ATTENDANCE_RATIO: f64 = 0.75;
pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const STARTING_SOON_MINUTES: u32 = 60;
pub const PAYMENT_DUE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertInputs<'a> {
    pub payments: &'a [PaymentRecord],
    pub enrollments: &'a [EnrollmentRecord],
    pub classes: &'a [ClassRecord],
    pub attendance: &'a [AttendanceRecord],
    pub materials: &'a [UploadRecord],
    pub recordings: &'a [UploadRecord],
}

pub fn derive_alerts(inputs: &AlertInputs<'_>, now: NaiveDateTime) -> Vec<Alert> {
    let mut alerts = Vec::new();
    alerts.extend(pending_deliveries(inputs.payments));
    alerts.extend(overdue_payments(inputs.payments, now));
    alerts.extend(low_attendance(inputs.attendance, inputs.classes));
    alerts.extend(class_schedule(inputs.classes, now));
    alerts.extend(recent_activity(
        AlertKind::NewEnrollment,
        "New enrollments",
        "students enrolled",
        inputs.enrollments.iter().map(|e| e.enrolled_at),
        now,
    ));
    alerts.extend(recent_activity(
        AlertKind::NewMaterial,
        "New study materials",
        "materials uploaded",
        inputs.materials.iter().map(|m| m.uploaded_at),
        now,
    ));
    alerts.extend(recent_activity(
        AlertKind::NewRecording,
        "New recordings",
        "recordings uploaded",
        inputs.recordings.iter().map(|r| r.uploaded_at),
        now,
    ));
    alerts.extend(payments_due(inputs.classes, now));
    alerts
}

/// Highest priority first, rule order kept within a priority, at most `limit`.
pub fn prioritized(mut alerts: Vec<Alert>, limit: usize) -> Vec<Alert> {
    alerts.sort_by_key(|alert| alert.priority);
    alerts.truncate(limit);
    alerts
}

/// Delivery fee encoded in payment notes as `Speed Post: <fee>`.
pub fn speed_post_fee(notes: &str) -> Option<u64> {
    static SPEED_POST: OnceLock<Regex> = OnceLock::new();
    let re = SPEED_POST
        .get_or_init(|| Regex::new(r"Speed Post:\s*(\d+)").expect("valid speed post regex"));
    re.captures(notes)?.get(1)?.as_str().parse().ok()
}

fn pending_deliveries(payments: &[PaymentRecord]) -> Option<Alert> {
    let fees: Vec<u64> = payments
        .iter()
        .filter(|p| {
            p.delivery_status.is_empty() || p.delivery_status.eq_ignore_ascii_case("pending")
        })
        .filter_map(|p| speed_post_fee(&p.notes))
        .filter(|fee| *fee > 0)
        .collect();
    if fees.is_empty() {
        return None;
    }

    Some(Alert {
        kind: AlertKind::PendingDelivery,
        priority: AlertPriority::Medium,
        title: "Pending deliveries".to_string(),
        message: format!(
            "{} speed post deliveries awaiting dispatch (fees {})",
            fees.len(),
            fees.iter().copied().fold(0u64, u64::saturating_add)
        ),
        time_label: "Now".to_string(),
    })
}

fn overdue_payments(payments: &[PaymentRecord], now: NaiveDateTime) -> Option<Alert> {
    let cutoff = Duration::days(OVERDUE_AFTER_DAYS);
    let overdue: Vec<(&PaymentRecord, NaiveDateTime)> = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Pending)
        .filter_map(|p| p.date.map(|date| (p, date)))
        .filter(|(_, date)| now - *date > cutoff)
        .collect();
    let oldest = overdue.iter().map(|(_, date)| *date).min()?;
    let amount: f64 = overdue.iter().map(|(p, _)| p.amount).sum();

    Some(Alert {
        kind: AlertKind::OverduePayment,
        priority: AlertPriority::High,
        title: "Overdue payments".to_string(),
        message: format!(
            "{} payments pending for more than {} days (total {:.2})",
            overdue.len(),
            OVERDUE_AFTER_DAYS,
            amount
        ),
        time_label: relative_label(oldest, now),
    })
}

fn low_attendance(attendance: &[AttendanceRecord], classes: &[ClassRecord]) -> Vec<Alert> {
    let mut per_class: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in attendance.iter().filter(|r| !r.class_id.is_empty()) {
        let entry = per_class.entry(record.class_id.as_str()).or_insert((0, 0));
        if record.present {
            entry.0 += 1;
        }
        entry.1 += 1;
    }

    let names: HashMap<&str, &str> = classes
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    per_class
        .into_iter()
        .filter(|(_, (present, total))| (*present as f64) < LOW_ATTENDANCE_RATIO * *total as f64)
        .map(|(class_id, (present, total))| {
            let name = names
                .get(class_id)
                .filter(|name| !name.is_empty())
                .copied()
                .unwrap_or(class_id);
            Alert {
                kind: AlertKind::LowAttendance,
                priority: AlertPriority::Medium,
                title: "Low attendance".to_string(),
                message: format!(
                    "Attendance in {} is {:.1}% ({}/{} present)",
                    name,
                    present as f64 / total as f64 * 100.0,
                    present,
                    total
                ),
                time_label: "This period".to_string(),
            }
        })
        .collect()
}

fn class_schedule(classes: &[ClassRecord], now: NaiveDateTime) -> Vec<Alert> {
    let today = now.weekday().num_days_from_monday() as usize;
    let minute_now = now.time().hour() * 60 + now.time().minute();
    let todays: Vec<&ClassRecord> = classes
        .iter()
        .filter(|c| c.status.is_active() && weekday_index(&c.schedule_day) == Some(today))
        .collect();
    if todays.is_empty() {
        return Vec::new();
    }

    let mut alerts = vec![Alert {
        kind: AlertKind::TodaySchedule,
        priority: AlertPriority::Low,
        title: "Today's schedule".to_string(),
        message: format!("{} classes scheduled for {}", todays.len(), WEEKDAYS[today]),
        time_label: "Today".to_string(),
    }];

    for class in todays {
        let Some(start) = parse_clock_time(&class.start_time) else {
            continue;
        };
        let start_minute = start.minutes_since_midnight();
        let end = parse_clock_time(&class.end_time);

        let running = end.filter(|end| {
            start_minute <= minute_now && minute_now < end.minutes_since_midnight()
        });

        if let Some(end) = running {
            alerts.push(Alert {
                kind: AlertKind::ClassInProgress,
                priority: AlertPriority::High,
                title: "Class in progress".to_string(),
                message: format!("{} is running until {}", class.name, end),
                time_label: "Now".to_string(),
            });
        } else if start_minute > minute_now && start_minute - minute_now <= STARTING_SOON_MINUTES {
            alerts.push(Alert {
                kind: AlertKind::UpcomingClass,
                priority: AlertPriority::Medium,
                title: "Class starting soon".to_string(),
                message: format!("{} starts at {}", class.name, start),
                time_label: format!("in {} min", start_minute - minute_now),
            });
        }
    }
    alerts
}

fn recent_activity(
    kind: AlertKind,
    title: &str,
    what: &str,
    dates: impl Iterator<Item = Option<NaiveDateTime>>,
    now: NaiveDateTime,
) -> Option<Alert> {
    let since = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent: Vec<NaiveDateTime> = dates
        .flatten()
        .filter(|at| *at >= since && *at <= now)
        .collect();
    let latest = recent.iter().max().copied()?;

    Some(Alert {
        kind,
        priority: AlertPriority::Low,
        title: title.to_string(),
        message: format!("{} {} in the last {} days", recent.len(), what, RECENT_WINDOW_DAYS),
        time_label: relative_label(latest, now),
    })
}

fn payments_due(classes: &[ClassRecord], now: NaiveDateTime) -> Vec<Alert> {
    let today = now.date();
    classes
        .iter()
        .filter_map(|class| {
            let due = class.next_payment_date?;
            let days = (due - today).num_days();
            if !(1..=PAYMENT_DUE_WINDOW_DAYS).contains(&days) {
                return None;
            }
            Some(Alert {
                kind: AlertKind::PaymentDue,
                priority: AlertPriority::Medium,
                title: "Payment due soon".to_string(),
                message: format!("{} payment due on {}", class.name, due),
                time_label: if days == 1 {
                    "Tomorrow".to_string()
                } else {
                    format!("in {days} days")
                },
            })
        })
        .collect()
}

pub fn relative_label(at: NaiveDateTime, now: NaiveDateTime) -> String {
    if at > now {
        return match (at.date() - now.date()).num_days() {
            0 => "Later today".to_string(),
            1 => "Tomorrow".to_string(),
            days => format!("in {days} days"),
        };
    }
    let minutes = (now - at).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min ago");
    }
    match (now.date() - at.date()).num_days() {
        0 => format!("{} hours ago", minutes / 60),
        1 => "Yesterday".to_string(),
        days => format!("{days} days ago"),
    }
}
