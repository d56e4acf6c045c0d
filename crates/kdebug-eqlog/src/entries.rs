//! Phase A — lexical parse: splits the log file into header-delimited
//! records and dispatches each to a variant-specific parser that consumes
//! its indented body with [`extract_indented`].

use crate::location::{parse_file_location, FileLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFrame {
    DebugAttemptEquation(FileLocation),
    Generic { kind: String, payload: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context(pub Vec<ContextFrame>);

impl Context {
    /// A context is "top-level" when every frame is generic — i.e. no
    /// enclosing equation-attempt frame.
    pub fn is_top_level(&self) -> bool {
        self.0.iter().all(|f| matches!(f, ContextFrame::Generic { .. }))
    }

    pub fn is_prefix_of(&self, other: &Context) -> bool {
        other.0.len() >= self.0.len() && self.0 == other.0[..self.0.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideCondition {
    pub assumed_true_condition: Vec<String>,
    pub term_like_replacements: Vec<String>,
    pub predicate_replacements: Vec<String>,
    pub assumed_to_be_defined: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementBody {
    pub equation_requirement: Vec<String>,
    pub matching_requirement: Vec<String>,
    pub side_condition: SideCondition,
    pub negated_implication: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    DebugAttemptEquation { context: Context, equation_location: FileLocation, term: Vec<String> },
    DebugApplyEquation { context: Context, resulting_term: Vec<String> },
    EquationIsApplicable { context: Context },
    EquationIsNotApplicableRequirement { context: Context, body: RequirementBody },
    EquationIsNotApplicableMatch { context: Context, body: Vec<String> },
    EquationIsNotApplicableApplyMatch { context: Context, body: Vec<String> },
    LogMessage { context: Context, body: Vec<String> },
    LogJsonRpcServer { context: Context, body: Vec<String> },
    InfoJsonRpcProcessRequest { context: Context, body: Vec<String> },
    DebugAttemptedRewriteRules { context: Context, body: Vec<String> },
    DebugAppliedRewriteRules { context: Context, body: Vec<String> },
}

impl Entry {
    pub fn context(&self) -> &Context {
        match self {
            Entry::DebugAttemptEquation { context, .. }
            | Entry::DebugApplyEquation { context, .. }
            | Entry::EquationIsApplicable { context }
            | Entry::EquationIsNotApplicableRequirement { context, .. }
            | Entry::EquationIsNotApplicableMatch { context, .. }
            | Entry::EquationIsNotApplicableApplyMatch { context, .. }
            | Entry::LogMessage { context, .. }
            | Entry::LogJsonRpcServer { context, .. }
            | Entry::InfoJsonRpcProcessRequest { context, .. }
            | Entry::DebugAttemptedRewriteRules { context, .. }
            | Entry::DebugAppliedRewriteRules { context, .. } => context,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Entry::DebugAttemptEquation { .. } => "DebugAttemptEquation",
            Entry::DebugApplyEquation { .. } => "DebugApplyEquation",
            Entry::EquationIsApplicable { .. } => "EquationIsApplicable",
            Entry::EquationIsNotApplicableRequirement { .. } => "EquationIsNotApplicableRequirement",
            Entry::EquationIsNotApplicableMatch { .. } => "EquationIsNotApplicableMatch",
            Entry::EquationIsNotApplicableApplyMatch { .. } => "EquationIsNotApplicableApplyMatch",
            Entry::LogMessage { .. } => "LogMessage",
            Entry::LogJsonRpcServer { .. } => "LogJsonRpcServer",
            Entry::InfoJsonRpcProcessRequest { .. } => "InfoJsonRpcProcessRequest",
            Entry::DebugAttemptedRewriteRules { .. } => "DebugAttemptedRewriteRules",
            Entry::DebugAppliedRewriteRules { .. } => "DebugAppliedRewriteRules",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized record header {header:?}")]
    UnrecognizedHeader { line: usize, header: String },
    #[error("line {line}: expected block {expected:?}, found {found:?}")]
    MissingBlock { line: usize, expected: &'static str, found: String },
    #[error("line {line}: {source}")]
    Location {
        line: usize,
        #[source]
        source: crate::location::LocationParseError,
    },
}

const KINDS: &[&str] = &[
    "DebugAttemptEquation",
    "DebugApplyEquation",
    "EquationIsApplicable",
    "EquationIsNotApplicableRequirement",
    "EquationIsNotApplicableMatch",
    "EquationIsNotApplicableApplyMatch",
    "LogMessage",
    "LogJsonRpcServer",
    "InfoJsonRpcProcessRequest",
    "DebugAttemptedRewriteRules",
    "DebugAppliedRewriteRules",
];

fn header_kind(line: &str) -> Option<&'static str> {
    KINDS.iter().find(|kind| line.contains(&format!("({kind}):"))).copied()
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

/// Consumes every contiguous line starting at `start` indented by at
/// least four spaces, stripping that prefix. Returns the index of the
/// first non-indented (or end-of-record) line.
pub fn extract_indented(lines: &[&str], start: usize) -> (usize, Vec<String>) {
    let mut i = start;
    let mut out = Vec::new();
    while i < lines.len() && indent_of(lines[i]) >= 4 && !lines[i].trim().is_empty() {
        out.push(lines[i][4.min(lines[i].len())..].to_string());
        i += 1;
    }
    (i, out)
}

fn parse_context(lines: &[&str], start: usize) -> (usize, Context) {
    if start >= lines.len() || lines[start].trim() != "Context:" {
        return (start, Context::default());
    }
    let (next, frame_lines) = extract_indented(lines, start + 1);
    let frames = frame_lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| parse_context_frame(l.trim()))
        .collect();
    (next, Context(frames))
}

fn parse_context_frame(line: &str) -> ContextFrame {
    let Some(close) = line.find(')') else {
        return ContextFrame::Generic { kind: String::new(), payload: line.to_string() };
    };
    if !line.starts_with('(') {
        return ContextFrame::Generic { kind: String::new(), payload: line.to_string() };
    }
    let kind = line[1..close].to_string();
    let payload = line[close + 1..].trim().to_string();
    if kind == "DebugAttemptEquation" {
        if let Some(rest) = payload.strip_prefix("while applying equation at ") {
            if let Ok(location) = parse_file_location(rest.trim()) {
                return ContextFrame::DebugAttemptEquation(location);
            }
        }
    }
    ContextFrame::Generic { kind, payload }
}

/// Splits the whole file into blank-line-separated records, parses each
/// record's header to find its `EntryKind`, then dispatches to the
/// matching variant parser.
pub fn parse_entries(text: &str) -> Result<Vec<Entry>, ParseError> {
    let all_lines: Vec<&str> = text.lines().collect();
    let mut entries = Vec::new();
    let mut i = 0;
    while i < all_lines.len() {
        if all_lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let header_line_no = i;
        let header = all_lines[i];
        let Some(kind) = header_kind(header) else {
            return Err(ParseError::UnrecognizedHeader { line: header_line_no + 1, header: header.to_string() });
        };
        i += 1;
        let (entry, next) = parse_record(kind, &all_lines, i, header_line_no)?;
        entries.push(entry);
        i = next;
    }
    Ok(entries)
}

fn parse_record(kind: &str, lines: &[&str], start: usize, header_line: usize) -> Result<(Entry, usize), ParseError> {
    match kind {
        "DebugAttemptEquation" => {
            let (after_term, term) = extract_indented(lines, start);
            let Some(loc_line) = term.first() else {
                return Err(ParseError::MissingBlock {
                    line: header_line + 1,
                    expected: "equation location",
                    found: String::new(),
                });
            };
            let equation_location = parse_file_location(loc_line.trim())
                .map_err(|source| ParseError::Location { line: header_line + 1, source })?;
            let (next, context) = parse_context(lines, after_term);
            Ok((
                Entry::DebugAttemptEquation { context, equation_location, term: term[1..].to_vec() },
                next,
            ))
        }
        "DebugApplyEquation" => {
            let (after_body, body) = extract_indented(lines, start);
            let (next, context) = parse_context(lines, after_body);
            Ok((Entry::DebugApplyEquation { context, resulting_term: body }, next))
        }
        "EquationIsApplicable" => {
            let (next_body, _body) = extract_indented(lines, start);
            let (next, context) = parse_context(lines, next_body);
            Ok((Entry::EquationIsApplicable { context }, next))
        }
        "EquationIsNotApplicableRequirement" => {
            let (body, next) = parse_requirement_body(lines, start, header_line)?;
            let (next, context) = parse_context(lines, next);
            Ok((Entry::EquationIsNotApplicableRequirement { context, body }, next))
        }
        "EquationIsNotApplicableMatch" => {
            let (after_body, body) = extract_indented(lines, start);
            let (next, context) = parse_context(lines, after_body);
            Ok((Entry::EquationIsNotApplicableMatch { context, body }, next))
        }
        "EquationIsNotApplicableApplyMatch" => {
            let (after_body, body) = extract_indented(lines, start);
            let (next, context) = parse_context(lines, after_body);
            Ok((Entry::EquationIsNotApplicableApplyMatch { context, body }, next))
        }
        _ => {
            let (after_body, body) = extract_indented(lines, start);
            let (next, context) = parse_context(lines, after_body);
            let entry = match kind {
                "LogMessage" => Entry::LogMessage { context, body },
                "LogJsonRpcServer" => Entry::LogJsonRpcServer { context, body },
                "InfoJsonRpcProcessRequest" => Entry::InfoJsonRpcProcessRequest { context, body },
                "DebugAttemptedRewriteRules" => Entry::DebugAttemptedRewriteRules { context, body },
                "DebugAppliedRewriteRules" => Entry::DebugAppliedRewriteRules { context, body },
                _ => {
                    return Err(ParseError::UnrecognizedHeader {
                        line: header_line + 1,
                        header: kind.to_string(),
                    })
                }
            };
            Ok((entry, next))
        }
    }
}

fn expect_label(lines: &[&str], i: usize, label: &'static str, header_line: usize) -> Result<usize, ParseError> {
    if i >= lines.len() || lines[i].trim() != label {
        return Err(ParseError::MissingBlock {
            line: header_line + 1,
            expected: label,
            found: lines.get(i).map(|s| s.to_string()).unwrap_or_default(),
        });
    }
    Ok(i + 1)
}

fn parse_requirement_body(
    lines: &[&str],
    start: usize,
    header_line: usize,
) -> Result<(RequirementBody, usize), ParseError> {
    let i = expect_label(lines, start, "Could not infer the equation requirement:", header_line)?;
    let (i, equation_requirement) = extract_indented(lines, i);
    let i = expect_label(lines, i, "and the matching requirement:", header_line)?;
    let (i, matching_requirement) = extract_indented(lines, i);
    let i = expect_label(lines, i, "from the side condition:", header_line)?;
    let (side_condition, i) = parse_side_condition(lines, i, header_line)?;
    let i = expect_label(lines, i, "The negated implication is:", header_line)?;
    let (next, negated_implication) = extract_indented(lines, i);
    Ok((
        RequirementBody { equation_requirement, matching_requirement, side_condition, negated_implication },
        next,
    ))
}

fn parse_side_condition(
    lines: &[&str],
    start: usize,
    header_line: usize,
) -> Result<(SideCondition, usize), ParseError> {
    let i = expect_label(lines, start, "Assumed true condition:", header_line)?;
    let (i, assumed_true_condition) = extract_indented(lines, i);
    let i = expect_label(lines, i, "TermLike replacements:", header_line)?;
    let (i, term_like_replacements) = extract_indented(lines, i);
    let i = expect_label(lines, i, "Predicate replacements:", header_line)?;
    let (i, predicate_replacements) = extract_indented(lines, i);
    let i = expect_label(lines, i, "Assumed to be defined:", header_line)?;
    let (i, assumed_to_be_defined) = extract_indented(lines, i);
    Ok((
        SideCondition { assumed_true_condition, term_like_replacements, predicate_replacements, assumed_to_be_defined },
        i,
    ))
}
