//! Best-effort trailing-token substitution: replaces a `file:line:col-line:col`
//! reference at the end of a rendered line with the literal source text it
//! points at, read straight off disk. Any failure (unparsable reference,
//! missing file, out-of-range line/column) leaves the line untouched.

use std::fs;

use crate::location::parse_file_location;

const SEPARATOR: char = ' ';

pub fn resolve_equation_sources(rendered: &str) -> String {
    rendered.lines().map(resolve_line).collect::<Vec<_>>().join("\n")
}

fn resolve_line(line: &str) -> String {
    let Some(last_space) = line.rfind(SEPARATOR) else {
        return line.to_string();
    };
    let (head, token) = line.split_at(last_space + 1);
    match resolve_token(token) {
        Some(replacement) => format!("{head}{replacement}"),
        None => line.to_string(),
    }
}

fn resolve_token(token: &str) -> Option<String> {
    let location = parse_file_location(token).ok()?;
    let (end_line, end_col) = location.end?;
    let contents = fs::read_to_string(&location.file).ok()?;
    let mut lines: Vec<&str> = contents.lines().collect();
    let start_idx = location.start_line.checked_sub(1)? as usize;
    let end_idx = (end_line as usize).checked_sub(1)?;
    if start_idx > end_idx || end_idx >= lines.len() {
        return None;
    }
    lines.truncate(end_idx + 1);
    let slice = &mut lines[start_idx..];
    let last = slice.last_mut()?;
    *last = last.get(..end_col as usize)?;
    let first = slice.first().copied()?;
    let start_col = (location.start_col as usize).checked_sub(1)?;
    let trimmed_first = first.get(start_col..)?;
    let mut pieces: Vec<&str> = slice.to_vec();
    pieces[0] = trimmed_first;
    Some(pieces.join(&SEPARATOR.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_non_location_lines_untouched() {
        assert_eq!(resolve_line("Result: some-term"), "Result: some-term");
    }

    #[test]
    fn leaves_unreadable_file_reference_untouched() {
        let line = "Equation at /no/such/file.k:1:1-1:5:";
        assert_eq!(resolve_line(line), line);
    }
}
