use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub label: String,
}

impl MonthBucket {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

pub fn month_offset(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_default()
}

pub fn month_bucket(reference: NaiveDate, back: u32) -> MonthBucket {
    let (year, month) = month_offset(reference.year(), reference.month(), back);
    MonthBucket {
        year,
        month,
        label: month_label(year, month),
    }
}

/// Oldest first; the last bucket is the reference month.
pub fn build_window(months_back: usize, reference: NaiveDate) -> Vec<MonthBucket> {
    (0..months_back as u32)
        .rev()
        .map(|back| month_bucket(reference, back))
        .collect()
}

pub fn bucket_index(date: NaiveDate, window: &[MonthBucket]) -> Option<usize> {
    let newest = window.last()?;
    let diff = (newest.year - date.year()) * 12 + (newest.month as i32 - date.month() as i32);
    if diff < 0 || diff as usize >= window.len() {
        return None;
    }
    Some(window.len() - 1 - diff as usize)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage change, `0` when there is no positive baseline.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        round1((current - previous) / previous * 100.0)
    } else {
        0.0
    }
}

pub fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round1(part / whole * 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn window_is_ordered_oldest_to_newest() {
        let window = build_window(12, date(2026, 3, 18));
        assert_eq!(window.len(), 12);
        assert_eq!((window[0].year, window[0].month), (2025, 4));
        assert_eq!((window[11].year, window[11].month), (2026, 3));
        assert_eq!(window[11].label, "Mar 2026");
        assert_eq!(window[0].label, "Apr 2025");
    }

    #[test]
    fn month_offset_crosses_year_boundaries() {
        assert_eq!(month_offset(2026, 1, 1), (2025, 12));
        assert_eq!(month_offset(2026, 1, 13), (2024, 12));
        assert_eq!(month_offset(2026, 6, 0), (2026, 6));
    }

    #[test]
    fn bucket_index_maps_into_window_or_none() {
        let window = build_window(6, date(2026, 2, 10));
        assert_eq!(bucket_index(date(2026, 2, 28), &window), Some(5));
        assert_eq!(bucket_index(date(2026, 1, 1), &window), Some(4));
        assert_eq!(bucket_index(date(2025, 9, 30), &window), Some(0));
        assert_eq!(bucket_index(date(2025, 8, 31), &window), None);
        assert_eq!(bucket_index(date(2026, 3, 1), &window), None);
        assert_eq!(bucket_index(date(2026, 3, 1), &[]), None);
    }

    #[test]
    fn pct_change_has_no_division_by_zero() {
        assert_eq!(pct_change(1000.0, 500.0), 100.0);
        assert_eq!(pct_change(500.0, 1000.0), -50.0);
        assert_eq!(pct_change(10.0, 3.0), 233.3);
        assert_eq!(pct_change(10.0, 0.0), 0.0);
        assert_eq!(pct_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn share_rounds_to_one_decimal() {
        assert_eq!(share(2.0, 3.0), 66.7);
        assert_eq!(share(1.0, 3.0), 33.3);
        assert_eq!(share(1.0, 0.0), 0.0);
    }
}
