use colored::*;
use jiff::civil::Date;

use crate::models::{
    analytics::{AnalyticsData, TimeRange, TrendDirection},
    task::{Priority, Task, TaskStatus},
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a task
pub fn get_status_glyph(task: &Task, is_overdue: bool) -> ColoredString {
    if task.status == TaskStatus::Completed {
        "✓".dimmed()
    } else if is_overdue {
        "●".red()
    } else if task.status == TaskStatus::InProgress {
        "◐".yellow()
    } else {
        "○".normal()
    }
}

/// Build the context string for a task (category / priority / due date)
pub fn get_task_context(task: &Task) -> Option<String> {
    let mut parts = vec![];

    if task.category.is_some() {
        parts.push(task.category_name().to_string());
    }
    if task.priority != Priority::Medium {
        parts.push(task.priority.label().to_string());
    }
    if let Some(due) = task.due_date {
        parts.push(format!("due {}", due.strftime("%b %d")));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

/// Render a single task line with number, glyph, title, and right-aligned context
pub fn render_task_line(task: &Task, is_overdue: bool) {
    let terminal_width = get_terminal_width();

    let id_str = format!("{:>3}", task.task_number);
    let glyph = get_status_glyph(task, is_overdue);
    let title = &task.title;

    let left_section = format!("  {}  {}  {}", id_str, glyph, title);

    let styled_left = if task.status == TaskStatus::Completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    if let Some(context) = get_task_context(task) {
        let left_visible_len = format!("  {}  {}  {}", id_str, " ", title).len();
        let right_visible_len = context.chars().count();
        let total_content = left_visible_len + right_visible_len;

        if total_content + 4 < terminal_width {
            let padding = terminal_width - total_content - 2;
            println!("{}{}{}", styled_left, " ".repeat(padding), context.dimmed());
        } else {
            // Not enough space for right alignment, just print normally
            println!("{}", styled_left);
        }
    } else {
        println!("{}", styled_left);
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g., "Overdue", "In Progress")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Check if a task is overdue
pub fn is_overdue(task: &Task) -> bool {
    if task.status == TaskStatus::Completed || task.deleted_at.is_some() {
        return false;
    }

    if let Some(due) = task.due_date {
        let today = jiff::Zoned::now().date();
        return due < today;
    }

    false
}

/// Format a date as a short weekday header (e.g., "Mon Aug 24")
fn format_short_date(date: Date) -> String {
    date.strftime("%a %b %d").to_string()
}

/// Number of daily rows shown in the stats chart; the series itself can be
/// much longer for wide ranges.
const DAILY_CHART_ROWS: usize = 14;

/// Render the full analytics snapshot
pub fn render_stats(data: &AnalyticsData, range: TimeRange) {
    render_view_header(
        &format!("Analytics ({})", range.label()),
        data.total_tasks as usize,
    );

    // Summary counts
    println!(
        "  {}  {} completed · {} pending · {} overdue",
        format!("{}%", data.completion_rate).bold(),
        data.completed_tasks,
        data.pending_tasks,
        data.overdue_tasks
    );
    if data.streak_days > 0 {
        let day_word = if data.streak_days == 1 { "day" } else { "days" };
        println!(
            "  {} {} {} streak",
            "♦".yellow(),
            data.streak_days,
            day_word
        );
    }

    render_daily_chart(data);
    render_weekly_table(data);
    render_categories(data);
    render_forecast(data);
}

fn render_daily_chart(data: &AnalyticsData) {
    let rows_to_skip = data.daily_completions.len().saturating_sub(DAILY_CHART_ROWS);
    let rows = &data.daily_completions[rows_to_skip..];

    let max_created = rows.iter().map(|d| d.created).max().unwrap_or(0);
    if max_created == 0 {
        return;
    }

    render_section_header("Daily");

    // Bars scale to the space left of the date and count columns
    let chart_width = get_terminal_width().saturating_sub(30).clamp(10, 40);
    for day in rows {
        let bar_len = (day.created as usize * chart_width).div_ceil(max_created as usize);
        let completed_len =
            (day.completed as usize * chart_width).div_ceil(max_created as usize);
        let bar: String = "█".repeat(completed_len) + &"░".repeat(bar_len - completed_len);

        println!(
            "  {}  {} {}",
            format_short_date(day.date).dimmed(),
            bar.green(),
            format!("{}/{}", day.completed, day.created).dimmed()
        );
    }
}

fn render_weekly_table(data: &AnalyticsData) {
    if data.weekly_data.iter().all(|w| w.created == 0) {
        return;
    }

    render_section_header("Weekly");
    println!(
        "  {:<14} {:>8} {:>10} {:>7} {:>9}",
        "week".dimmed(),
        "created".dimmed(),
        "completed".dimmed(),
        "rate".dimmed(),
        "avg/day".dimmed()
    );
    for week in &data.weekly_data {
        println!(
            "  {:<14} {:>8} {:>10} {:>6}% {:>9.1}",
            week.week_start.to_string(),
            week.created,
            week.completed,
            week.completion_rate,
            week.average_daily_tasks
        );
    }
}

fn render_categories(data: &AnalyticsData) {
    if data.category_data.is_empty() {
        return;
    }

    render_section_header("Categories");
    for category in &data.category_data {
        let swatch = match parse_hex_color(category.color) {
            Some((r, g, b)) => "■".truecolor(r, g, b),
            None => "■".normal(),
        };
        println!(
            "  {} {}  {} ({}%)  {}",
            swatch,
            category.name.bold(),
            category.count,
            category.percentage,
            format!("{}% done", category.completion_rate).dimmed()
        );
    }
}

fn render_forecast(data: &AnalyticsData) {
    render_section_header("Next week");

    let trend = match data.forecast.trend_direction {
        TrendDirection::Up => "↑ up".green(),
        TrendDirection::Down => "↓ down".red(),
        TrendDirection::Stable => "→ stable".dimmed(),
    };
    println!(
        "  ~{} tasks · {}% completion · trend {}",
        data.forecast.next_week_tasks, data.forecast.next_week_completion_rate, trend
    );

    println!();
    for recommendation in &data.forecast.recommendations {
        println!("  {} {}", "•".cyan(), recommendation);
    }
}

/// Parse a `#rrggbb` palette entry into its channels
fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
