use std::collections::{BTreeMap, HashMap, HashSet};

use jiff::civil::Date;
use jiff::{Span, Zoned};

use crate::models::{
    analytics::{
        AnalyticsData, AnalyticsFilter, CATEGORY_PALETTE, CategoryData, DailyCompletion,
        ForecastData, TrendDirection, WeeklyData,
    },
    task::{Task, TaskStatus},
};

/// Longest streak the backward walk will report.
const STREAK_LOOKBACK_DAYS: u32 = 365;

/// Completion-rate threshold below which the focus recommendation fires.
const LOW_COMPLETION_RATE: f64 = 70.0;
/// Weekly task volume above which the reduce-load recommendation fires.
const HIGH_WEEKLY_VOLUME: f64 = 20.0;
/// Weekly task volume below which the take-more recommendation fires.
const LOW_WEEKLY_VOLUME: f64 = 5.0;
/// Rate difference (in points) that separates a trend from noise.
const TREND_TOLERANCE: f64 = 5.0;

pub const RECOMMENDATION_FOCUS: &str =
    "Your completion rate is below 70%. Focus on finishing high-priority tasks before taking on new ones.";
pub const RECOMMENDATION_REDUCE_LOAD: &str =
    "You are creating more than 20 tasks a week. Consider reducing your load to keep it sustainable.";
pub const RECOMMENDATION_TAKE_MORE: &str =
    "Fewer than 5 tasks a week. There may be room to take on more work.";
pub const RECOMMENDATION_KEEP_GOING: &str = "Great pace! Keep up the current rhythm.";

/// Computes a full analytics snapshot from a task set.
///
/// Pure and deterministic for a given `now`: callers pass `Zoned::now()`,
/// tests pass a fixed instant. Soft-deleted tasks are ignored; the
/// category/status filter applies to the whole set before any metric.
pub fn compute_analytics(tasks: &[Task], filter: &AnalyticsFilter, now: &Zoned) -> AnalyticsData {
    let today = now.date();

    // 1. Apply the category/status filter to the whole set
    let filtered: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.deleted_at.is_none())
        .filter(|t| match &filter.category {
            Some(category) => t.category_name() == category.as_str(),
            None => true,
        })
        .filter(|t| match filter.status {
            Some(status) => t.status == status,
            None => true,
        })
        .collect();

    // 2. Restrict to the time-range window by local creation date
    let start = days_before(today, filter.time_range.days());
    let windowed: Vec<&Task> = filtered
        .iter()
        .copied()
        .filter(|t| {
            let created = local_date(t.created_at, now);
            created >= start && created <= today
        })
        .collect();

    // 3. Headline counts
    let total_tasks = windowed.len() as u32;
    let completed_tasks = windowed
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as u32;
    let pending_tasks = windowed
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count() as u32;
    let overdue_tasks = windowed
        .iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .filter(|t| t.due_date.is_some_and(|due| due < today))
        .count() as u32;

    AnalyticsData {
        total_tasks,
        completed_tasks,
        pending_tasks,
        overdue_tasks,
        completion_rate: rate(completed_tasks, total_tasks),
        daily_completions: daily_series(&windowed, start, today, now),
        weekly_data: weekly_series(&windowed, start, today, now),
        category_data: category_breakdown(&windowed, total_tasks),
        streak_days: completion_streak(&filtered, today, now),
        forecast: forecast(&filtered, today, now),
    }
}

/// Deterministic palette color for a category name (FNV-1a over the full
/// name, mod palette size).
pub fn category_color(name: &str) -> &'static str {
    let mut hash: u32 = 0x811c9dc5;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    CATEGORY_PALETTE[(hash % CATEGORY_PALETTE.len() as u32) as usize]
}

/// round(part/whole*100) as an integer percentage, 0 when whole is 0.
fn rate(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

/// Local calendar date of a timestamp, in the time zone `now` carries.
fn local_date(timestamp: jiff::Timestamp, now: &Zoned) -> Date {
    Zoned::new(timestamp, now.time_zone().clone()).date()
}

/// `date` minus `days`, clamped at the calendar floor.
fn days_before(date: Date, days: i64) -> Date {
    date.checked_sub(Span::new().days(days)).unwrap_or(Date::MIN)
}

/// Monday of the week `date` falls in.
fn week_start(date: Date) -> Date {
    days_before(date, date.weekday().to_monday_zero_offset() as i64)
}

fn daily_series(windowed: &[&Task], start: Date, end: Date, now: &Zoned) -> Vec<DailyCompletion> {
    // One zeroed bucket per calendar day, so chart consumers get a dense series
    let mut buckets: BTreeMap<Date, (u32, u32)> = BTreeMap::new();
    let mut day = start;
    loop {
        buckets.insert(day, (0, 0));
        if day >= end {
            break;
        }
        match day.tomorrow() {
            Ok(next) => day = next,
            Err(_) => break,
        }
    }

    for task in windowed {
        let created = local_date(task.created_at, now);
        if let Some((created_count, completed_count)) = buckets.get_mut(&created) {
            *created_count += 1;
            if task.status == TaskStatus::Completed {
                *completed_count += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(date, (created, completed))| DailyCompletion {
            date,
            created,
            completed,
            productivity_score: rate(completed, created),
        })
        .collect()
}

fn weekly_series(windowed: &[&Task], start: Date, end: Date, now: &Zoned) -> Vec<WeeklyData> {
    let mut buckets: BTreeMap<Date, (u32, u32)> = BTreeMap::new();
    let mut week = week_start(start);
    let last_week = week_start(end);
    loop {
        buckets.insert(week, (0, 0));
        if week >= last_week {
            break;
        }
        match week.checked_add(Span::new().days(7)) {
            Ok(next) => week = next,
            Err(_) => break,
        }
    }

    for task in windowed {
        let week = week_start(local_date(task.created_at, now));
        if let Some((created_count, completed_count)) = buckets.get_mut(&week) {
            *created_count += 1;
            if task.status == TaskStatus::Completed {
                *completed_count += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(week_start, (created, completed))| WeeklyData {
            week_start,
            created,
            completed,
            completion_rate: rate(completed, created),
            average_daily_tasks: (created as f64 / 7.0 * 10.0).round() / 10.0,
        })
        .collect()
}

fn category_breakdown(windowed: &[&Task], total_tasks: u32) -> Vec<CategoryData> {
    let mut groups: HashMap<&str, (u32, u32)> = HashMap::new();
    for task in windowed {
        let entry = groups.entry(task.category_name()).or_insert((0, 0));
        entry.0 += 1;
        if task.status == TaskStatus::Completed {
            entry.1 += 1;
        }
    }

    let mut categories: Vec<CategoryData> = groups
        .into_iter()
        .map(|(name, (count, completed_count))| CategoryData {
            name: name.to_string(),
            count,
            percentage: rate(count, total_tasks),
            color: category_color(name),
            completed_count,
            completion_rate: rate(completed_count, count),
        })
        .collect();

    // Descending by count; name breaks ties so the order is stable
    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    categories
}

fn completion_streak(filtered: &[&Task], today: Date, now: &Zoned) -> u32 {
    let completion_dates: HashSet<Date> = filtered
        .iter()
        .filter_map(|t| t.completed_at)
        .map(|completed_at| local_date(completed_at, now))
        .collect();

    let mut streak = 0;
    let mut day = today;
    while streak < STREAK_LOOKBACK_DAYS && completion_dates.contains(&day) {
        streak += 1;
        match day.yesterday() {
            Ok(previous) => day = previous,
            Err(_) => break,
        }
    }
    streak
}

fn forecast(filtered: &[&Task], today: Date, now: &Zoned) -> ForecastData {
    let cutoff_recent = days_before(today, 30);
    let cutoff_prior = days_before(today, 60);

    let recent: Vec<&&Task> = filtered
        .iter()
        .filter(|t| local_date(t.created_at, now) > cutoff_recent)
        .collect();
    let prior: Vec<&&Task> = filtered
        .iter()
        .filter(|t| {
            let created = local_date(t.created_at, now);
            created > cutoff_prior && created <= cutoff_recent
        })
        .collect();

    let completion_pct = |tasks: &[&&Task]| -> f64 {
        if tasks.is_empty() {
            return 0.0;
        }
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        completed as f64 / tasks.len() as f64 * 100.0
    };

    let average_tasks_per_week = recent.len() as f64 / 4.0;
    let recent_rate = completion_pct(&recent);
    let prior_rate = completion_pct(&prior);

    let trend_direction = if recent_rate > prior_rate + TREND_TOLERANCE {
        TrendDirection::Up
    } else if recent_rate < prior_rate - TREND_TOLERANCE {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    // Thresholds are not mutually exclusive; the praise message only appears
    // when nothing else fired
    let mut recommendations = Vec::new();
    if recent_rate < LOW_COMPLETION_RATE {
        recommendations.push(RECOMMENDATION_FOCUS.to_string());
    }
    if average_tasks_per_week > HIGH_WEEKLY_VOLUME {
        recommendations.push(RECOMMENDATION_REDUCE_LOAD.to_string());
    }
    if average_tasks_per_week < LOW_WEEKLY_VOLUME {
        recommendations.push(RECOMMENDATION_TAKE_MORE.to_string());
    }
    if recommendations.is_empty() {
        recommendations.push(RECOMMENDATION_KEEP_GOING.to_string());
    }

    ForecastData {
        next_week_tasks: average_tasks_per_week.round() as u32,
        next_week_completion_rate: recent_rate.round() as u8,
        trend_direction,
        recommendations,
    }
}
