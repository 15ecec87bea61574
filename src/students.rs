use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{NamedCount, RegistrationMethod, StudentMetrics, StudentMonth, StudentRecord};
use crate::window;

pub const STUDENT_WINDOW_MONTHS: usize = 12;
const UNASSIGNED_STREAM: &str = "Other";

pub fn aggregate_students(students: &[StudentRecord], now: NaiveDateTime) -> StudentMetrics {
    let today = now.date();
    let months = window::build_window(STUDENT_WINDOW_MONTHS, today);
    let current = window::month_bucket(today, 0);
    let previous = window::month_bucket(today, 1);

    let mut active = 0usize;
    let mut departed = 0usize;
    let mut online = 0usize;
    let mut this_month = 0usize;
    let mut last_month = 0usize;
    let mut new_per_month = vec![0usize; months.len()];
    let mut streams: HashMap<&str, usize> = HashMap::new();

    for student in students {
        if student.status.is_active() {
            active += 1;
        } else if student.status.has_left() {
            departed += 1;
        }
        if student.registration == RegistrationMethod::Online {
            online += 1;
        }

        let stream = if student.stream.is_empty() {
            UNASSIGNED_STREAM
        } else {
            student.stream.as_str()
        };
        *streams.entry(stream).or_insert(0) += 1;

        if let Some(date) = student.created_at.map(|dt| dt.date()) {
            if current.contains(date) {
                this_month += 1;
            } else if previous.contains(date) {
                last_month += 1;
            }
            if let Some(index) = window::bucket_index(date, &months) {
                new_per_month[index] += 1;
            }
        }
    }

    let total = students.len();
    // Running total starts at zero inside the window, not from lifetime history.
    let mut cumulative = 0usize;
    let monthly_data = months
        .iter()
        .zip(new_per_month)
        .map(|(month, new_students)| {
            cumulative += new_students;
            StudentMonth {
                label: month.label.clone(),
                new_students,
                cumulative,
            }
        })
        .collect();

    StudentMetrics {
        total,
        active,
        online_registered: online,
        physical_registered: total - online,
        this_month_enrollments: this_month,
        last_month_enrollments: last_month,
        enrollment_trend: window::pct_change(this_month as f64, last_month as f64),
        retention_rate: window::share(active as f64, total as f64),
        drop_off_rate: window::share(departed as f64, total as f64),
        stream_distribution: distribution(streams, total),
        monthly_data,
    }
}

/// Largest group first, then alphabetical.
pub fn distribution(counts: HashMap<&str, usize>, total: usize) -> Vec<NamedCount> {
    let mut groups: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, value)| NamedCount {
            name: name.to_string(),
            value,
            percentage: window::share(value as f64, total as f64),
        })
        .collect();
    groups.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    groups
}
