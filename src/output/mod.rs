mod styling;
mod summary;
mod tables;

pub use styling::{bright_green, bright_red, cyan, dim, magenta_bold, outcome_marker};
pub use summary::print_summary;

/// Prints the buildherald banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📯 buildherald"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Build & view status notifier")
    );
}
