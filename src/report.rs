use std::fmt::Write;

use crate::classes::WEEKDAYS;
use crate::models::{
    AdminDashboard, Alert, AlertPriority, HeatmapMode, PaymentDistribution, SessionStatus,
    TeacherDashboard, TimeSlot,
};

fn priority_label(priority: AlertPriority) -> &'static str {
    match priority {
        AlertPriority::High => "HIGH",
        AlertPriority::Medium => "MEDIUM",
        AlertPriority::Low => "LOW",
    }
}

fn session_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Upcoming => "upcoming",
        SessionStatus::InProgress => "in progress",
        SessionStatus::Completed => "completed",
    }
}

fn write_degraded(output: &mut String, degraded: &[String]) {
    if !degraded.is_empty() {
        let _ = writeln!(
            output,
            "> Partial data: {} unavailable.",
            degraded.join(", ")
        );
        let _ = writeln!(output);
    }
}

fn write_alerts(output: &mut String, alerts: &[Alert]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");

    if alerts.is_empty() {
        let _ = writeln!(output, "Nothing needs attention.");
    } else {
        for alert in alerts {
            let _ = writeln!(
                output,
                "- [{}] {}: {} ({})",
                priority_label(alert.priority),
                alert.title,
                alert.message,
                alert.time_label
            );
        }
    }
}

fn write_distribution(output: &mut String, distribution: &PaymentDistribution) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Payment Collection (this month)");
    let _ = writeln!(
        output,
        "{} enrolled, {} paid, {} pending ({}% collected)",
        distribution.enrolled, distribution.paid, distribution.pending, distribution.collection_rate
    );
}

pub fn build_admin_report(dashboard: &AdminDashboard) -> String {
    let mut output = String::new();
    let revenue = &dashboard.revenue;

    let _ = writeln!(output, "# Admin Dashboard");
    let _ = writeln!(output, "Generated at {}", dashboard.generated_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(output);
    write_degraded(&mut output, &dashboard.degraded_sources);

    let _ = writeln!(output, "## Revenue");
    let _ = writeln!(
        output,
        "- This month: {:.2} (online {:.2}, cash {:.2})",
        revenue.this_month.total, revenue.this_month.online, revenue.this_month.cash
    );
    let _ = writeln!(output, "- Last month: {:.2}", revenue.last_month.total);
    let _ = writeln!(
        output,
        "- MoM growth {:.1}%, YoY growth {:.1}%, MRR {:.2}",
        revenue.mom_growth, revenue.yoy_growth, revenue.mrr
    );
    let _ = writeln!(
        output,
        "- Collected {:.2}, outstanding {:.2}",
        revenue.collected_payments, revenue.outstanding_payments
    );

    if !revenue.revenue_by_stream.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "| Stream | Revenue | Share |");
        let _ = writeln!(output, "|---|---:|---:|");
        for stream in &revenue.revenue_by_stream {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {:.1}% |",
                stream.name, stream.value, stream.percentage
            );
        }
    }

    let students = &dashboard.students;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    let _ = writeln!(
        output,
        "- {} total, {} active ({} online, {} physical registrations)",
        students.total, students.active, students.online_registered, students.physical_registered
    );
    let _ = writeln!(
        output,
        "- {} joined this month vs {} last month ({:.1}%)",
        students.this_month_enrollments, students.last_month_enrollments, students.enrollment_trend
    );
    let _ = writeln!(
        output,
        "- Retention {:.1}%, drop-off {:.1}%",
        students.retention_rate, students.drop_off_rate
    );
    for stream in &students.stream_distribution {
        let _ = writeln!(
            output,
            "  - {}: {} ({:.1}%)",
            stream.name, stream.value, stream.percentage
        );
    }

    let teachers = &dashboard.teachers;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Teachers");
    let _ = writeln!(
        output,
        "- {} total, {} active, {} inactive, {} new this month",
        teachers.total, teachers.active, teachers.inactive, teachers.new_this_month
    );

    let classes = &dashboard.classes;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Classes");
    let _ = writeln!(
        output,
        "- {} total, {} active ({} online, {} physical, {} hybrid)",
        classes.total, classes.active, classes.online, classes.physical, classes.hybrid
    );

    let heatmap = &classes.schedule_heatmap;
    let _ = writeln!(output);
    if heatmap.mode == HeatmapMode::Synthetic {
        let _ = writeln!(output, "Weekly schedule (estimated, no timetable data):");
    } else {
        let _ = writeln!(output, "Weekly schedule:");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "| Day | 6-9 | 9-12 | 12-15 | 15-18 | 18-21 |");
    let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|");
    for day in WEEKDAYS {
        let counts: Vec<String> = TimeSlot::ALL
            .iter()
            .map(|slot| heatmap.count(day, *slot).unwrap_or(0).to_string())
            .collect();
        let _ = writeln!(output, "| {} | {} |", day, counts.join(" | "));
    }

    write_distribution(&mut output, &dashboard.payment_distribution);
    write_alerts(&mut output, &dashboard.alerts);

    output
}

pub fn build_teacher_report(dashboard: &TeacherDashboard, teacher_id: Option<&str>) -> String {
    let mut output = String::new();
    let metrics = &dashboard.metrics;

    let _ = writeln!(output, "# Teacher Dashboard");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        teacher_id.unwrap_or("all teachers"),
        dashboard.generated_at.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    write_degraded(&mut output, &dashboard.degraded_sources);

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- {} students across {} active classes",
        metrics.total_students, metrics.active_classes
    );
    let _ = writeln!(
        output,
        "- Revenue this month {:.2} ({:.1}% vs last month)",
        metrics.monthly_revenue, metrics.revenue_growth
    );
    let _ = writeln!(
        output,
        "- Attendance {:.1}%, {} pending payments, {}% collected",
        metrics.attendance_rate, metrics.pending_payments, metrics.collection_rate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Today's Schedule");
    if dashboard.today_schedule.is_empty() {
        let _ = writeln!(output, "No classes today.");
    } else {
        for class in &dashboard.today_schedule {
            let _ = writeln!(
                output,
                "- {}-{} {} ({})",
                class.start_time,
                class.end_time,
                class.name,
                session_label(class.status)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Revenue and Enrollments");
    let _ = writeln!(output, "| Month | Revenue | New enrollments |");
    let _ = writeln!(output, "|---|---:|---:|");
    for (revenue, enrollment) in dashboard.revenue_data.iter().zip(&dashboard.enrollment_data) {
        let _ = writeln!(
            output,
            "| {} | {:.2} | {} |",
            revenue.label, revenue.total, enrollment.enrollments
        );
    }

    write_distribution(&mut output, &dashboard.payment_distribution);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    if dashboard.top_performers.is_empty() {
        let _ = writeln!(output, "No graded exams yet.");
    } else {
        for performer in &dashboard.top_performers {
            let _ = writeln!(
                output,
                "- {}: {} ({}%)",
                performer.exam_title, performer.student_name, performer.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Deadlines");
    if dashboard.upcoming_deadlines.is_empty() {
        let _ = writeln!(output, "Nothing due in the next week.");
    } else {
        for deadline in &dashboard.upcoming_deadlines {
            let _ = writeln!(
                output,
                "- {} on {} ({} days left)",
                deadline.title, deadline.due, deadline.days_left
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");
    if dashboard.recent_activities.is_empty() {
        let _ = writeln!(output, "No recent activity.");
    } else {
        for activity in &dashboard.recent_activities {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                activity.title, activity.time_label, activity.description
            );
        }
    }

    write_alerts(&mut output, &dashboard.alerts);

    output
}
