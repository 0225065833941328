pub mod asm;
pub mod callstack;
pub mod control;
pub mod input;
pub mod logs;
pub mod status;
pub mod tabs;

use tuirealm::props::{Table, TableBuilder, TextSpan};

/// Table with a single text column, one row per line. Used to render pane states
/// without data (loading, errors, empty copy).
pub(super) fn message_table(lines: impl IntoIterator<Item = TextSpan>) -> Table {
    let mut builder = TableBuilder::default();
    for line in lines {
        builder.add_col(line).add_row();
    }
    let mut table = builder.build();
    // remove last unused row
    if table.last().is_some_and(|row| row.is_empty()) {
        table.pop();
    }
    table
}
