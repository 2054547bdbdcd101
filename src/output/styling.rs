use std::fmt::Display;

use console::{style, Color, StyledObject};

use crate::outcome::Outcome;

fn paint(text: impl Display, color: Color) -> StyledObject<String> {
    style(text.to_string()).fg(color)
}

pub fn bright(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn bright_red(text: impl Display) -> StyledObject<String> {
    paint(text, Color::Red).bright()
}

pub fn bright_green(text: impl Display) -> StyledObject<String> {
    paint(text, Color::Green).bright()
}

pub fn bright_yellow(text: impl Display) -> StyledObject<String> {
    paint(text, Color::Yellow).bright()
}

pub fn cyan(text: impl Display) -> StyledObject<String> {
    paint(text, Color::Cyan)
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn magenta_bold(text: impl Display) -> StyledObject<String> {
    paint(text, Color::Magenta).bold()
}

/// A status dot in the colour of the outcome a notification reports.
pub fn outcome_marker(html_color: &str) -> StyledObject<String> {
    let color = match Outcome::from_html_color(html_color) {
        Some(Outcome::Success) => Color::Green,
        Some(Outcome::Unstable) => Color::Yellow,
        Some(Outcome::Failure) => Color::Red,
        _ => Color::White,
    };
    paint("●", color)
}
