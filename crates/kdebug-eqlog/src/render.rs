//! Renders an [`Organized`] tree back into the indented, human-readable
//! text described in the equation-log format: four spaces per nesting
//! level, with `AppliedEquation`/`NotApplied*` expanding into labeled
//! subsections instead of the raw record layout Phase A consumed.

use crate::entries::{Entry, RequirementBody, SideCondition};
use crate::organize::Organized;

const STEP: &str = "    ";

pub fn render(items: &[Organized]) -> String {
    let mut out = String::new();
    for item in items {
        render_one(item, 0, &mut out);
    }
    out
}

fn indent(level: usize) -> String {
    STEP.repeat(level)
}

fn push_line(out: &mut String, level: usize, text: &str) {
    out.push_str(&indent(level));
    out.push_str(text);
    out.push('\n');
}

fn push_block(out: &mut String, level: usize, lines: &[String]) {
    for line in lines {
        push_line(out, level, line);
    }
}

fn render_one(item: &Organized, level: usize, out: &mut String) {
    match item {
        Organized::AppliedEquation { attempt, children, applicable: _, apply } => {
            render_attempt_header(attempt, level, out);
            push_line(out, level, "Applying equation:");
            render_location_and_term(attempt, level + 1, out);
            if !children.is_empty() {
                push_line(out, level + 1, "Computation:");
                for child in children {
                    render_one(child, level + 2, out);
                }
            }
            push_line(out, level + 1, "Result:");
            if let Entry::DebugApplyEquation { resulting_term, .. } = apply.as_ref() {
                push_block(out, level + 2, resulting_term);
            }
        }
        Organized::NotAppliedRequirement { attempt, children, requirement } => {
            render_attempt_header(attempt, level, out);
            push_line(out, level, "Not applied, requirement not satisfied:");
            render_location_and_term(attempt, level + 1, out);
            if !children.is_empty() {
                push_line(out, level + 1, "Computation:");
                for child in children {
                    render_one(child, level + 2, out);
                }
            }
            if let Entry::EquationIsNotApplicableRequirement { body, .. } = requirement.as_ref() {
                render_requirement_body(body, level + 1, out);
            }
        }
        Organized::NotAppliedMatch { attempt, mismatch } => {
            render_attempt_header(attempt, level, out);
            push_line(out, level, "Not applied, term does not match:");
            render_location_and_term(attempt, level + 1, out);
            if let Entry::EquationIsNotApplicableMatch { body, .. } = mismatch.as_ref() {
                push_line(out, level + 1, "Matching condition:");
                push_block(out, level + 2, body);
            }
        }
        Organized::NotAppliedApplyMatch { attempt, children, apply_mismatch } => {
            render_attempt_header(attempt, level, out);
            push_line(out, level, "Not applied, result does not match:");
            render_location_and_term(attempt, level + 1, out);
            if !children.is_empty() {
                push_line(out, level + 1, "Computation:");
                for child in children {
                    render_one(child, level + 2, out);
                }
            }
            if let Entry::EquationIsNotApplicableApplyMatch { body, .. } = apply_mismatch.as_ref() {
                push_line(out, level + 1, "Matching condition:");
                push_block(out, level + 2, body);
            }
        }
        Organized::Simple { label, entry, note, children } => {
            push_line(out, level, &format!("{label}:"));
            push_line(out, level + 1, note);
            push_block(out, level + 1, simple_body(entry));
            for child in children {
                render_one(child, level + 1, out);
            }
        }
    }
}

fn render_attempt_header(attempt: &Entry, level: usize, out: &mut String) {
    if let Entry::DebugAttemptEquation { equation_location, .. } = attempt {
        push_line(out, level, &format!("Equation at {equation_location}:"));
    }
}

fn render_location_and_term(attempt: &Entry, level: usize, out: &mut String) {
    if let Entry::DebugAttemptEquation { term, .. } = attempt {
        push_line(out, level, "Term:");
        push_block(out, level + 1, term);
    }
}

fn render_requirement_body(body: &RequirementBody, level: usize, out: &mut String) {
    push_line(out, level, "Could not infer the equation requirement:");
    push_block(out, level + 1, &body.equation_requirement);
    push_line(out, level, "and the matching requirement:");
    push_block(out, level + 1, &body.matching_requirement);
    push_line(out, level, "from the side condition:");
    render_side_condition(&body.side_condition, level + 1, out);
    push_line(out, level, "The negated implication is:");
    push_block(out, level + 1, &body.negated_implication);
}

fn render_side_condition(side: &SideCondition, level: usize, out: &mut String) {
    push_line(out, level, "Assumed true condition:");
    push_block(out, level + 1, &side.assumed_true_condition);
    push_line(out, level, "TermLike replacements:");
    push_block(out, level + 1, &side.term_like_replacements);
    push_line(out, level, "Predicate replacements:");
    push_block(out, level + 1, &side.predicate_replacements);
    push_line(out, level, "Assumed to be defined:");
    push_block(out, level + 1, &side.assumed_to_be_defined);
}

fn simple_body(entry: &Entry) -> &[String] {
    match entry {
        Entry::LogMessage { body, .. }
        | Entry::LogJsonRpcServer { body, .. }
        | Entry::InfoJsonRpcProcessRequest { body, .. }
        | Entry::DebugAttemptedRewriteRules { body, .. }
        | Entry::DebugAppliedRewriteRules { body, .. } => body,
        Entry::DebugApplyEquation { resulting_term, .. } => resulting_term,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::parse_entries;
    use crate::organize::organize;

    #[test]
    fn renders_applied_equation_with_result() {
        let text = "\
kore-repl foo (DebugAttemptEquation):
    a/b.k:1:1
    lhs-term

kore-repl foo (EquationIsApplicable):
    Context:
        (DebugAttemptEquation) while applying equation at a/b.k:1:1

kore-repl foo (DebugApplyEquation):
    rhs-term
";
        let entries = parse_entries(text).unwrap();
        let organized = organize(&entries).unwrap();
        let rendered = render(&organized);
        assert!(rendered.contains("Equation at a/b.k:1:1:"));
        assert!(rendered.contains("Applying equation:"));
        assert!(rendered.contains("rhs-term"));
    }

    #[test]
    fn renders_simple_log_message_with_note() {
        let text = "kore-repl foo (LogMessage):\n    hello\n";
        let entries = parse_entries(text).unwrap();
        let organized = organize(&entries).unwrap();
        let rendered = render(&organized);
        assert!(rendered.contains("LogMessage:"));
        assert!(rendered.contains("hello"));
    }

    #[test]
    fn indentation_increases_with_nesting() {
        let text = "kore-repl foo (LogMessage):\n    hello\n";
        let entries = parse_entries(text).unwrap();
        let organized = organize(&entries).unwrap();
        let rendered = render(&organized);
        let body_line = rendered.lines().find(|l| l.trim() == "No children:").unwrap();
        assert!(body_line.starts_with(STEP));
        assert!(!body_line.starts_with(&format!("{STEP}{STEP}")));
    }
}
