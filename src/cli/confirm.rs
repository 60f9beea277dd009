//! Confirmation prompt for live runs.

use std::io::{self, BufRead, Write};

/// Asks before writing to the target store.
///
/// Only `y`/`yes` (any case) confirms. A closed stdin (EOF) confirms as
/// well so the job can run unattended.
pub fn confirm_live_run(
    what: &str,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "This will write {what} to the target database.")?;
    write!(out, "Continue? (y/N): ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        writeln!(out, "No input available, proceeding with migration")?;
        return Ok(true);
    }
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
