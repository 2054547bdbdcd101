use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::report::{ReplayReport, SentNotification};

use super::styling::{bright, bright_yellow, cyan, dim};
use super::tables::{create_table, outcome_color};

/// Prints a human-readable summary of a replay to stdout.
///
/// Displays an overview (scenario, destination, counts, timing) followed by
/// one table row per notification that was handed to the transport.
pub fn print_summary(report: &ReplayReport) {
    println!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn notification_row(idx: usize, sent: &SentNotification) -> Vec<Cell> {
    let kind = if sent.notification.text.starts_with("view/") {
        "view"
    } else {
        "build"
    };

    vec![
        Cell::new(idx + 1),
        Cell::new(kind),
        Cell::new(&sent.notification.run_name),
        Cell::new(&sent.notification.text).fg(outcome_color(&sent.notification.color)),
        Cell::new(if sent.urgent { "@all" } else { "" }),
    ]
}

fn render_summary(report: &ReplayReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let elapsed = report.finished_at - report.started_at;
    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Scenario:"),
        cyan(&report.scenario),
        dim("Delivered to:"),
        cyan(&report.delivered_to),
        dim("Events applied:"),
        bright_yellow(report.events_applied),
        dim("Build notifications:"),
        bright_yellow(report.build_notifications()),
        dim("View notifications:"),
        bright_yellow(report.view_notifications()),
        dim("Replayed at:"),
        dim(format!(
            "{} ({} ms)",
            report.started_at.format("%Y-%m-%d %H:%M UTC"),
            elapsed.num_milliseconds()
        ))
    );

    if report.notifications.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No notifications were sent."));
        return output;
    }

    add_section_header(&mut output, "📣", "Notifications");

    let mut table = create_table();
    table.set_header(create_cyan_header(&["#", "Kind", "Subject", "Message", "Mention"]));
    for (idx, sent) in report.notifications.iter().enumerate() {
        table.add_row(notification_row(idx, sent));
    }

    let _ = writeln!(output, "{table}");
    output
}
