//! `FileLocation`: a `file:line:col` or `file:line:col-line:col` reference
//! into a source file, as emitted after `while applying equation at ` in a
//! `DebugAttemptEquation` context frame.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end: Option<(u32, u32)>,
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)?;
        if let Some((line, col)) = self.end {
            write!(f, "-{line}:{col}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed file location: {0:?}")]
pub struct LocationParseError(pub String);

/// Parses `file:line:col` or `file:line:col-line:col`. The file portion
/// may itself contain colons (Windows drive letters, URIs), so the parse
/// works from the right: the last two `:`-separated fields before an
/// optional `-line:col` suffix are the starting line/col.
pub fn parse_file_location(text: &str) -> Result<FileLocation, LocationParseError> {
    let (head, end) = match text.rsplit_once('-') {
        Some((h, tail)) if tail.split(':').count() == 2 && tail.split(':').all(|p| p.parse::<u32>().is_ok()) => {
            let mut parts = tail.split(':');
            let line: u32 = parts.next().unwrap().parse().unwrap();
            let col: u32 = parts.next().unwrap().parse().unwrap();
            (h, Some((line, col)))
        }
        _ => (text, None),
    };
    let mut fields: Vec<&str> = head.rsplitn(3, ':').collect();
    if fields.len() != 3 {
        return Err(LocationParseError(text.to_string()));
    }
    fields.reverse();
    let file = fields[0].to_string();
    let start_line: u32 = fields[1].parse().map_err(|_| LocationParseError(text.to_string()))?;
    let start_col: u32 = fields[2].parse().map_err(|_| LocationParseError(text.to_string()))?;
    Ok(FileLocation { file, start_line, start_col, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_point() {
        let loc = parse_file_location("foo/bar.k:10:5").unwrap();
        assert_eq!(
            loc,
            FileLocation { file: "foo/bar.k".into(), start_line: 10, start_col: 5, end: None }
        );
    }

    #[test]
    fn parses_range() {
        let loc = parse_file_location("foo/bar.k:10:5-12:9").unwrap();
        assert_eq!(loc.end, Some((12, 9)));
        assert_eq!(loc.start_line, 10);
    }

    #[test]
    fn display_round_trips() {
        let text = "foo/bar.k:10:5-12:9";
        let loc = parse_file_location(text).unwrap();
        assert_eq!(loc.to_string(), text);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_file_location("not-a-location").is_err());
    }
}
