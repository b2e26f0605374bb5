use jiff::civil::Date;
use serde::Serialize;

use crate::models::task::TaskStatus;

/// Fixed palette for category colors (hex, chart-friendly).
pub const CATEGORY_PALETTE: [&str; 10] = [
    "#3b82f6", "#22c55e", "#f59e0b", "#ef4444", "#8b5cf6", "#14b8a6", "#ec4899", "#f97316",
    "#6366f1", "#84cc16",
];

/// Time window the analytics snapshot is computed over, anchored at "now".
#[derive(Serialize, Default, Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum TimeRange {
    #[value(name = "7d")]
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[value(name = "30d")]
    #[serde(rename = "30d")]
    Month,
    #[value(name = "90d")]
    #[serde(rename = "90d")]
    Quarter,
    #[value(name = "1y")]
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    /// Length of the window in days.
    pub fn days(&self) -> i64 {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
            TimeRange::Year => 365,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Week => "last 7 days",
            TimeRange::Month => "last 30 days",
            TimeRange::Quarter => "last 90 days",
            TimeRange::Year => "last year",
        }
    }
}

/// Selection applied before any metric is computed.
#[derive(Default, Clone)]
pub struct AnalyticsFilter {
    pub time_range: TimeRange,
    pub category: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Snapshot derived from a task set; never stored, recomputed on demand.
#[derive(Serialize, Debug)]
pub struct AnalyticsData {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub pending_tasks: u32,
    pub overdue_tasks: u32,
    /// round(completed/total*100), 0 when there are no tasks
    pub completion_rate: u8,
    pub daily_completions: Vec<DailyCompletion>,
    pub weekly_data: Vec<WeeklyData>,
    pub category_data: Vec<CategoryData>,
    /// Consecutive calendar days ending today with at least one completion
    pub streak_days: u32,
    pub forecast: ForecastData,
}

/// Per-day bucket of the daily series, keyed by creation date.
#[derive(Serialize, Debug)]
pub struct DailyCompletion {
    pub date: Date,
    pub created: u32,
    pub completed: u32,
    /// round(completed/created*100), 0 when nothing was created that day
    pub productivity_score: u8,
}

/// Per-week bucket; weeks start on Monday.
#[derive(Serialize, Debug)]
pub struct WeeklyData {
    pub week_start: Date,
    pub created: u32,
    pub completed: u32,
    pub completion_rate: u8,
    /// created/7, rounded to one decimal
    pub average_daily_tasks: f64,
}

#[derive(Serialize, Debug)]
pub struct CategoryData {
    pub name: String,
    pub count: u32,
    /// Share of the windowed total, rounded
    pub percentage: u8,
    /// Deterministic color from `CATEGORY_PALETTE`
    pub color: &'static str,
    pub completed_count: u32,
    pub completion_rate: u8,
}

#[derive(Serialize, Debug)]
pub struct ForecastData {
    pub next_week_tasks: u32,
    pub next_week_completion_rate: u8,
    pub trend_direction: TrendDirection,
    pub recommendations: Vec<String>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}
