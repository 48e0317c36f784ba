//! Status lines and formatting shared by the command handlers.

use std::fmt::Display;
use std::io;

use chrono::DateTime;
use chrono::Utc;
use colored::Colorize;

pub fn success(out: &mut impl io::Write, message: impl Display) -> io::Result<()> {
    writeln!(out, "{} {}", "✓".green().bold(), message)
}

pub fn error(out: &mut impl io::Write, message: impl Display) -> io::Result<()> {
    writeln!(out, "{} {}", "✗".red().bold(), message)
}

pub fn warning(out: &mut impl io::Write, message: impl Display) -> io::Result<()> {
    writeln!(out, "{} {}", "!".yellow().bold(), message)
}

pub fn info(out: &mut impl io::Write, message: impl Display) -> io::Result<()> {
    writeln!(out, "{} {}", "i".blue().bold(), message)
}

/// Bold section title.
pub fn heading(out: &mut impl io::Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", title.bold())
}

/// "just now", "5m ago", "3h ago", "2d ago", or the date after a week.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);

    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() <= 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}
