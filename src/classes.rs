use crate::models::{
    ClassMetrics, ClassRecord, DeliveryMethod, HeatmapMode, ScheduleHeatmap,
    ScheduleHeatmapCell, TimeSlot,
};
use crate::normalize::parse_clock_time;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SYNTHETIC_MIN_CLASSES: usize = 15;
const SYNTHETIC_DAY_WEIGHTS: [f64; 7] = [1.2, 1.5, 1.3, 1.4, 1.0, 0.8, 0.5];
const SYNTHETIC_SLOT_SHARES: [f64; 5] = [0.10, 0.30, 0.25, 0.25, 0.10];
pub const SYNTHETIC_SLOT_FLOORS: [u32; 5] = [1, 2, 2, 2, 1];

type Grid = [[u32; 5]; 7];

pub fn aggregate_classes(classes: &[ClassRecord]) -> ClassMetrics {
    let active: Vec<&ClassRecord> = classes.iter().filter(|c| c.status.is_active()).collect();
    let count = |method: DeliveryMethod| active.iter().filter(|c| c.delivery == method).count();

    ClassMetrics {
        total: classes.len(),
        active: active.len(),
        online: count(DeliveryMethod::Online),
        physical: count(DeliveryMethod::Physical),
        hybrid: count(DeliveryMethod::Hybrid),
        schedule_heatmap: observed_heatmap(&active)
            .unwrap_or_else(|| synthetic_heatmap(classes.len())),
    }
}

pub fn weekday_index(day: &str) -> Option<usize> {
    let day = day.trim();
    WEEKDAYS.iter().position(|name| name.eq_ignore_ascii_case(day))
}

/// `None` when no active class has both a day and a readable start time.
pub fn observed_heatmap(active: &[&ClassRecord]) -> Option<ScheduleHeatmap> {
    let scheduled: Vec<&&ClassRecord> = active
        .iter()
        .filter(|c| !c.schedule_day.is_empty() && !c.start_time.is_empty())
        .collect();
    if scheduled.is_empty() {
        return None;
    }

    let mut grid: Grid = [[0; 5]; 7];
    for class in scheduled {
        let Some(day) = weekday_index(&class.schedule_day) else {
            continue;
        };
        let Some(slot) =
            parse_clock_time(&class.start_time).and_then(|t| TimeSlot::for_hour(t.hour))
        else {
            continue;
        };
        grid[day][slot.index()] += 1;
    }

    Some(to_heatmap(HeatmapMode::Observed, grid))
}

pub fn synthetic_heatmap(total_classes: usize) -> ScheduleHeatmap {
    let per_day = (total_classes.max(SYNTHETIC_MIN_CLASSES) as f64 / 7.0).ceil();
    let mut grid: Grid = [[0; 5]; 7];

    for (day, weight) in SYNTHETIC_DAY_WEIGHTS.iter().enumerate() {
        let day_total = (per_day * weight).round();
        for (slot, share) in SYNTHETIC_SLOT_SHARES.iter().enumerate() {
            let count = (day_total * share).round() as u32;
            grid[day][slot] = count.max(SYNTHETIC_SLOT_FLOORS[slot]);
        }
    }

    to_heatmap(HeatmapMode::Synthetic, grid)
}

fn to_heatmap(mode: HeatmapMode, grid: Grid) -> ScheduleHeatmap {
    let cells = WEEKDAYS
        .iter()
        .zip(grid.iter())
        .flat_map(|(day, counts)| {
            TimeSlot::ALL.iter().map(move |slot| ScheduleHeatmapCell {
                day: day.to_string(),
                time_slot: *slot,
                count: counts[slot.index()],
            })
        })
        .collect();
    ScheduleHeatmap { mode, cells }
}
