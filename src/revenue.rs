use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{
    MonthlyBucket, PaymentRecord, RevenueMetrics, RevenueSplit, StreamRevenueShare, Trend,
};
use crate::window::{self, MonthBucket};

pub const REVENUE_WINDOW_MONTHS: usize = 12;
pub const TOP_STREAMS: usize = 10;
const OTHER_STREAM: &str = "Other";

pub fn aggregate_revenue(payments: &[PaymentRecord], now: NaiveDateTime) -> RevenueMetrics {
    let today = now.date();
    let months = window::build_window(REVENUE_WINDOW_MONTHS, today);
    let current = window::month_bucket(today, 0);
    let previous = window::month_bucket(today, 1);
    let year_ago = window::month_bucket(today, 12);

    let mut this_month = RevenueSplit::default();
    let mut last_month = RevenueSplit::default();
    let mut same_month_last_year = RevenueSplit::default();
    let mut monthly = vec![RevenueSplit::default(); months.len()];
    let mut streams: HashMap<&str, f64> = HashMap::new();
    let mut outstanding = 0.0;
    let mut collected = 0.0;

    for payment in payments {
        let amount = payment.amount;
        let channel = payment.channel;

        if payment.status.is_outstanding() {
            outstanding += amount;
            continue;
        }
        if !payment.status.is_collected() {
            continue;
        }

        collected += amount;
        let stream = if payment.class_name.is_empty() {
            OTHER_STREAM
        } else {
            payment.class_name.as_str()
        };
        *streams.entry(stream).or_insert(0.0) += amount;

        let Some(date) = payment.date.map(|dt| dt.date()) else {
            continue;
        };
        if current.contains(date) {
            this_month.add(amount, channel);
        } else if previous.contains(date) {
            last_month.add(amount, channel);
        } else if year_ago.contains(date) {
            same_month_last_year.add(amount, channel);
        }
        if let Some(index) = window::bucket_index(date, &months) {
            monthly[index].add(amount, channel);
        }
    }

    let recent = monthly.len().min(3);
    let mrr = monthly[monthly.len() - recent..]
        .iter()
        .map(|split| split.total)
        .sum::<f64>()
        / 3.0;
    let mom_growth = window::pct_change(this_month.total, last_month.total);

    RevenueMetrics {
        this_month,
        last_month,
        trend: Trend::from_growth(mom_growth),
        mrr,
        mom_growth,
        yoy_growth: window::pct_change(this_month.total, same_month_last_year.total),
        outstanding_payments: outstanding,
        collected_payments: collected,
        revenue_by_stream: top_streams(streams, collected),
        monthly_data: label_buckets(&months, monthly),
    }
}

pub fn revenue_series(payments: &[PaymentRecord], months: &[MonthBucket]) -> Vec<MonthlyBucket> {
    let mut totals = vec![RevenueSplit::default(); months.len()];
    for payment in payments.iter().filter(|p| p.status.is_collected()) {
        let index = payment
            .date
            .and_then(|dt| window::bucket_index(dt.date(), months));
        if let Some(index) = index {
            totals[index].add(payment.amount, payment.channel);
        }
    }
    label_buckets(months, totals)
}

fn label_buckets(months: &[MonthBucket], totals: Vec<RevenueSplit>) -> Vec<MonthlyBucket> {
    months
        .iter()
        .zip(totals)
        .map(|(month, split)| MonthlyBucket {
            label: month.label.clone(),
            total: split.total,
            online: split.online,
            cash: split.cash,
        })
        .collect()
}

/// Highest revenue first; equal values fall back to the stream name.
fn top_streams(streams: HashMap<&str, f64>, collected: f64) -> Vec<StreamRevenueShare> {
    let mut shares: Vec<StreamRevenueShare> = streams
        .into_iter()
        .map(|(name, value)| StreamRevenueShare {
            name: name.to_string(),
            value,
            percentage: window::share(value, collected),
        })
        .collect();

    shares.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    shares.truncate(TOP_STREAMS);
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentChannel::{self, Cash, Online};
    use crate::models::PaymentStatus::{self, Completed, Paid, Pending};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn on(year: i32, month: u32, day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(9, 0, 0))
    }

    fn sample_payment(
        date: Option<NaiveDateTime>,
        amount: f64,
        channel: PaymentChannel,
        status: PaymentStatus,
        class_name: &str,
    ) -> PaymentRecord {
        PaymentRecord {
            date,
            amount,
            channel,
            status,
            class_id: "c1".to_string(),
            class_name: class_name.to_string(),
            student_id: "s1".to_string(),
            notes: String::new(),
            delivery_status: String::new(),
        }
    }

    #[test]
    fn three_payment_scenario() {
        let payments = vec![
            sample_payment(on(2026, 3, 2), 1000.0, Online, Completed, "Physics"),
            sample_payment(on(2026, 2, 14), 500.0, Cash, Completed, "Physics"),
            sample_payment(on(2026, 3, 5), 200.0, Cash, Pending, "Physics"),
        ];

        let metrics = aggregate_revenue(&payments, now());
        assert_eq!(metrics.this_month.total, 1000.0);
        assert_eq!(metrics.this_month.online, 1000.0);
        assert_eq!(metrics.this_month.cash, 0.0);
        assert_eq!(metrics.last_month.total, 500.0);
        assert_eq!(metrics.outstanding_payments, 200.0);
        assert_eq!(metrics.collected_payments, 1500.0);
        assert_eq!(metrics.mom_growth, 100.0);
        assert_eq!(metrics.trend, Trend::Up);
        assert_eq!(metrics.mrr, 500.0);
    }

    #[test]
    fn only_the_four_known_statuses_reach_totals() {
        let statuses = [
            PaymentStatus::Pending,
            PaymentStatus::Unpaid,
            PaymentStatus::Completed,
            PaymentStatus::Paid,
            PaymentStatus::Other,
        ];
        let payments: Vec<PaymentRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                sample_payment(on(2026, 1, 3), (i + 1) as f64 * 100.0, Cash, *status, "")
            })
            .collect();

        let metrics = aggregate_revenue(&payments, now());
        let collected: f64 = payments
            .iter()
            .filter(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Paid))
            .map(|p| p.amount)
            .sum();
        let outstanding: f64 = payments
            .iter()
            .filter(|p| matches!(p.status, PaymentStatus::Pending | PaymentStatus::Unpaid))
            .map(|p| p.amount)
            .sum();

        assert_eq!(metrics.collected_payments, collected);
        assert_eq!(metrics.outstanding_payments, outstanding);
        assert_eq!(metrics.collected_payments + metrics.outstanding_payments, 1000.0);
    }

    #[test]
    fn monthly_window_sums_only_in_window_payments() {
        let mut payments = Vec::new();
        let mut expected = 0.0;
        for back in 0..12u32 {
            let (year, month) = window::month_offset(2026, 3, back);
            let amount = 100.0 + back as f64;
            expected += amount;
            payments.push(sample_payment(on(year, month, 10), amount, Online, Paid, "Maths"));
        }
        payments.push(sample_payment(on(2025, 3, 10), 9999.0, Cash, Paid, "Maths"));
        payments.push(sample_payment(on(2026, 4, 1), 5555.0, Cash, Paid, "Maths"));
        payments.push(sample_payment(on(2026, 2, 1), 777.0, Cash, Pending, "Maths"));

        let metrics = aggregate_revenue(&payments, now());
        let windowed: f64 = metrics.monthly_data.iter().map(|m| m.total).sum();
        assert_eq!(metrics.monthly_data.len(), 12);
        assert_eq!(windowed, expected);
        assert_eq!(metrics.monthly_data[11].label, "Mar 2026");
        assert_eq!(metrics.monthly_data[11].total, 100.0);
    }

    #[test]
    fn one_instant_lands_in_one_month_whatever_its_encoding() {
        let payments: Vec<PaymentRecord> = [
            serde_json::json!({
                "amount": 100, "status": "paid", "payment_date": "2026-03-31T20:00:00-05:00"
            }),
            serde_json::json!({
                "amount": 100, "status": "paid", "payment_date": 1_775_005_200_000_i64
            }),
        ]
        .iter()
        .map(crate::normalize::payment)
        .collect();
        let mid_april = NaiveDate::from_ymd_opt(2026, 4, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let metrics = aggregate_revenue(&payments, mid_april);
        assert_eq!(metrics.this_month.total, 200.0);
        assert_eq!(metrics.last_month.total, 0.0);
    }

    #[test]
    fn undated_payments_still_count_as_collected() {
        let payments = vec![sample_payment(None, 300.0, Cash, Completed, "")];
        let metrics = aggregate_revenue(&payments, now());
        assert_eq!(metrics.collected_payments, 300.0);
        assert_eq!(metrics.this_month.total, 0.0);
        assert!(metrics.monthly_data.iter().all(|m| m.total == 0.0));
        assert_eq!(metrics.revenue_by_stream[0].name, "Other");
    }

    #[test]
    fn year_over_year_uses_same_month_last_year() {
        let payments = vec![
            sample_payment(on(2026, 3, 1), 1500.0, Cash, Paid, ""),
            sample_payment(on(2025, 3, 1), 1000.0, Cash, Paid, ""),
        ];
        let metrics = aggregate_revenue(&payments, now());
        assert_eq!(metrics.yoy_growth, 50.0);
        assert_eq!(metrics.mom_growth, 0.0);
        assert_eq!(metrics.trend, Trend::Flat);
    }

    #[test]
    fn streams_are_capped_and_tie_broken_by_name() {
        let mut payments = Vec::new();
        for i in 0..12 {
            payments.push(sample_payment(
                on(2026, 3, 1),
                if i < 2 { 500.0 } else { 100.0 },
                PaymentChannel::Cash,
                PaymentStatus::Completed,
                &format!("Stream {:02}", 11 - i),
            ));
        }

        let metrics = aggregate_revenue(&payments, now());
        let streams = &metrics.revenue_by_stream;
        assert_eq!(streams.len(), TOP_STREAMS);
        assert_eq!(streams[0].name, "Stream 10");
        assert_eq!(streams[1].name, "Stream 11");
        assert_eq!(streams[2].name, "Stream 00");
        assert_eq!(streams[0].percentage, 25.0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let payments = vec![
            sample_payment(on(2026, 3, 2), 1000.0, Online, Completed, "Physics"),
            sample_payment(
                Some(now() - Duration::days(40)),
                250.0,
                Cash,
                Paid,
                "Chemistry",
            ),
        ];
        let first = serde_json::to_string(&aggregate_revenue(&payments, now())).unwrap();
        let second = serde_json::to_string(&aggregate_revenue(&payments, now())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn series_follows_requested_window() {
        let payments = vec![
            sample_payment(on(2026, 3, 2), 80.0, Online, Completed, ""),
            sample_payment(on(2025, 8, 2), 20.0, Online, Completed, ""),
        ];
        let months = window::build_window(6, now().date());
        let series = revenue_series(&payments, &months);
        assert_eq!(series.len(), 6);
        assert_eq!(series[5].online, 80.0);
        assert_eq!(series.iter().map(|b| b.total).sum::<f64>(), 80.0);
    }
}
