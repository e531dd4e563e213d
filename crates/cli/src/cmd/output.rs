//! Shared output formatting for commands.

use color_eyre::eyre::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or `empty` when there are none.
pub fn print_table<T: Tabled>(rows: &[T], empty: &str) {
    if rows.is_empty() {
        println!("{empty}");
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}
