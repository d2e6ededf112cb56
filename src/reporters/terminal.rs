use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

use crate::types::{AgeRow, CoChange, HotSpot, MassChange};

pub fn report_hot_spots(spots: &[HotSpot], top: usize) {
    if spots.is_empty() {
        println!("{}", "  No hot spots in the requested range.".yellow());
        return;
    }
    println!("{}", "🔥 Hot spots — most changed, largest files first".red().bold());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["RANK", "FILE", "CHANGES", "LINES"]);
    for (i, s) in spots.iter().take(top).enumerate() {
        table.add_row(vec![
            Cell::new(format!("{:3}", i + 1)),
            Cell::new(truncate_path(&s.path, 54)),
            changes_cell(s.changes),
            Cell::new(s.lines.to_string()),
        ]);
    }
    println!("{table}");
}

pub fn report_co_changes(pairs: &[CoChange], top: usize) {
    if pairs.is_empty() {
        println!("{}", "  No coupled files in the requested range.".yellow());
        return;
    }
    println!("{}", "⚠️  Co-change coupling — files that move together".yellow().bold());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["PRIMARY", "SECONDARY", "CHANGES", "COCHANGES", "COUPLING"]);
    for c in pairs.iter().take(top) {
        table.add_row(vec![
            Cell::new(truncate_path(&c.primary, 40)),
            Cell::new(truncate_path(&c.secondary, 40)),
            Cell::new(c.changes.to_string()),
            Cell::new(c.cochanges.to_string()),
            coupling_cell(c.coupling),
        ]);
    }
    println!("{table}");
}

pub fn report_ages(ages: &[AgeRow], top: usize) {
    if ages.is_empty() {
        println!("{}", "  No changes in the requested range.".yellow());
        return;
    }
    println!("{}", "🕰  Ages — days since each file last changed".cyan().bold());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["FILE", "AGE (DAYS)"]);
    let mut sorted: Vec<&AgeRow> = ages.iter().collect();
    sorted.sort_by(|a, b| b.age_days.partial_cmp(&a.age_days).unwrap_or(std::cmp::Ordering::Equal));
    for row in sorted.iter().take(top) {
        table.add_row(vec![
            Cell::new(truncate_path(&row.path, 54)),
            Cell::new(format!("{:.1}", row.age_days)),
        ]);
    }
    println!("{table}");
}

pub fn report_mass_changes(changes: &[MassChange], top: usize) {
    if changes.is_empty() {
        println!("{}", "  No mass changes above the threshold.".yellow());
        return;
    }
    println!("{}", "📦 Mass changes — revisions touching many files".magenta().bold());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["REVISION", "PATHS", "AUTHOR", "MESSAGE"]);
    for m in changes.iter().take(top) {
        table.add_row(vec![
            Cell::new(&m.revision),
            Cell::new(m.path_count.to_string()).fg(Color::Red),
            Cell::new(m.author.as_deref().unwrap_or("-")),
            Cell::new(truncate_message(m.message.as_deref().unwrap_or("-"), 60)),
        ]);
    }
    println!("{table}");
}

// ─── Cell builders ────────────────────────────────────────────────────────────

/// Change-count cell colored by magnitude. Plain text so comfy-table
/// measures the real visible width.
fn changes_cell(changes: usize) -> Cell {
    let text = changes.to_string();
    match changes {
        0..=2 => Cell::new(text).fg(Color::DarkGrey),
        3..=9 => Cell::new(text),
        _ => Cell::new(text).fg(Color::Red),
    }
}

fn coupling_cell(coupling: f64) -> Cell {
    let text = format!("{:.0}%", coupling * 100.0);
    if coupling >= 0.8 {
        Cell::new(text).fg(Color::Red)
    } else if coupling >= 0.5 {
        Cell::new(text).fg(Color::Yellow)
    } else {
        Cell::new(text)
    }
}

// ─── Other helpers ────────────────────────────────────────────────────────────

fn truncate_path(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let tail: String = s.chars().rev().take(max - 1).collect::<Vec<_>>().into_iter().rev().collect();
    format!("…{tail}")
}

fn truncate_message(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max - 1).collect();
    format!("{head}…")
}
