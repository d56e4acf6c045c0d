//! Phase B — structural organization: groups the flat list of [`Entry`]
//! values produced by Phase A into a nested [`Organized`] tree by context
//! length, then classifies each `(entry, children)` group by a case
//! analysis on entry/last-child kind.

use crate::entries::Entry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Organized {
    AppliedEquation { attempt: Box<Entry>, children: Vec<Organized>, applicable: Box<Entry>, apply: Box<Entry> },
    NotAppliedRequirement { attempt: Box<Entry>, children: Vec<Organized>, requirement: Box<Entry> },
    NotAppliedMatch { attempt: Box<Entry>, mismatch: Box<Entry> },
    NotAppliedApplyMatch { attempt: Box<Entry>, children: Vec<Organized>, apply_mismatch: Box<Entry> },
    Simple { label: &'static str, entry: Box<Entry>, note: &'static str, children: Vec<Organized> },
}

#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    #[error("entry {index} (context len {actual}) is not a descendant of its parent (expected prefix len {expected})")]
    ContextPrefixViolation { index: usize, expected: usize, actual: usize },
    #[error("entry {index}: {kind} with children is not structurally valid for organization")]
    UnexpectedShape { index: usize, kind: &'static str },
    #[error("applied-equation attempt at entry {index} is not immediately followed by a DebugApplyEquation sharing its context")]
    MissingMatchingApply { index: usize },
}

/// Groups `entries[start..]` into `(Organized, next_index)`, recursing on
/// every maximal run whose context is strictly longer than `parent_len`
/// and not top-level — i.e. every entry nested under the entry that opens
/// this group.
pub fn organize(entries: &[Entry]) -> Result<Vec<Organized>, OrganizeError> {
    let mut result = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (organized, next) = organize_one(entries, i)?;
        result.push(organized);
        i = next;
    }
    Ok(result)
}

fn context_len(entry: &Entry) -> usize {
    entry.context().0.len()
}

fn organize_one(entries: &[Entry], index: usize) -> Result<(Organized, usize), OrganizeError> {
    let entry = &entries[index];
    let parent_len = context_len(entry);
    let mut end = index + 1;
    while end < entries.len() {
        let candidate = &entries[end];
        if context_len(candidate) <= parent_len || candidate.context().is_top_level() {
            break;
        }
        if !entry.context().is_prefix_of(candidate.context()) {
            return Err(OrganizeError::ContextPrefixViolation {
                index: end,
                expected: parent_len,
                actual: context_len(candidate),
            });
        }
        end += 1;
    }
    let child_entries = &entries[index + 1..end];
    let children = organize(child_entries)?;
    let organized = classify(entry, children, entries, end)?;
    Ok(organized)
}

fn classify(
    entry: &Entry,
    mut children: Vec<Organized>,
    entries: &[Entry],
    end: usize,
) -> Result<(Organized, usize), OrganizeError> {
    match entry {
        Entry::DebugAttemptEquation { .. } => {
            let last_label = children.last().map(|c| organized_top_entry(c).label());
            let attempt_context = entry.context().clone();
            match last_label {
                Some("EquationIsApplicable") => {
                    let matches_next_apply = matches!(
                        entries.get(end),
                        Some(Entry::DebugApplyEquation { context, .. }) if *context == attempt_context
                    );
                    if !matches_next_apply {
                        return Err(OrganizeError::MissingMatchingApply { index: end });
                    }
                    let applicable = Box::new(children.pop().unwrap().into_entry());
                    let apply = Box::new(entries[end].clone());
                    Ok((
                        Organized::AppliedEquation { attempt: Box::new(entry.clone()), children, applicable, apply },
                        end + 1,
                    ))
                }
                Some("EquationIsNotApplicableRequirement") => {
                    let requirement = Box::new(children.pop().unwrap().into_entry());
                    Ok((
                        Organized::NotAppliedRequirement { attempt: Box::new(entry.clone()), children, requirement },
                        end,
                    ))
                }
                Some("EquationIsNotApplicableApplyMatch") => {
                    let apply_mismatch = Box::new(children.pop().unwrap().into_entry());
                    Ok((
                        Organized::NotAppliedApplyMatch { attempt: Box::new(entry.clone()), children, apply_mismatch },
                        end,
                    ))
                }
                Some("EquationIsNotApplicableMatch") if children.len() == 1 => {
                    let mismatch = Box::new(children.pop().unwrap().into_entry());
                    Ok((Organized::NotAppliedMatch { attempt: Box::new(entry.clone()), mismatch }, end))
                }
                _ => Err(OrganizeError::UnexpectedShape { index: end, kind: "DebugAttemptEquation" }),
            }
        }
        Entry::EquationIsApplicable { .. }
        | Entry::EquationIsNotApplicableRequirement { .. }
        | Entry::EquationIsNotApplicableMatch { .. }
        | Entry::EquationIsNotApplicableApplyMatch { .. } => {
            if !children.is_empty() {
                return Err(OrganizeError::UnexpectedShape { index: end, kind: entry.label() });
            }
            Ok((Organized::Simple { label: entry.label(), entry: Box::new(entry.clone()), note: "computation", children }, end))
        }
        _ => {
            if !children.is_empty() {
                return Err(OrganizeError::UnexpectedShape { index: end, kind: entry.label() });
            }
            Ok((
                Organized::Simple { label: entry.label(), entry: Box::new(entry.clone()), note: "No children:", children },
                end,
            ))
        }
    }
}

fn organized_top_entry(o: &Organized) -> &Entry {
    match o {
        Organized::AppliedEquation { attempt, .. } => attempt,
        Organized::NotAppliedRequirement { attempt, .. } => attempt,
        Organized::NotAppliedMatch { attempt, .. } => attempt,
        Organized::NotAppliedApplyMatch { attempt, .. } => attempt,
        Organized::Simple { entry, .. } => entry,
    }
}

impl Organized {
    fn into_entry(self) -> Entry {
        match self {
            Organized::Simple { entry, .. } => *entry,
            other => organized_top_entry(&other).clone(),
        }
    }

    /// Every descendant entry's context has this subtree's entry context
    /// as a strict prefix — spec.md §8's organizer prefix law, checked
    /// here for tests rather than enforced structurally.
    pub fn check_prefix_law(&self) -> bool {
        let root_ctx = organized_top_entry(self).context();
        self.descendants().iter().all(|e| root_ctx.0.len() < e.context().0.len() && root_ctx.is_prefix_of(e.context()))
    }

    fn descendants(&self) -> Vec<&Entry> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Entry>) {
        let children: &[Organized] = match self {
            Organized::AppliedEquation { children, apply, .. } => {
                out.push(apply);
                children
            }
            Organized::NotAppliedRequirement { children, requirement, .. } => {
                out.push(requirement);
                children
            }
            Organized::NotAppliedMatch { mismatch, .. } => {
                out.push(mismatch);
                return;
            }
            Organized::NotAppliedApplyMatch { children, apply_mismatch, .. } => {
                out.push(apply_mismatch);
                children
            }
            Organized::Simple { children, .. } => children,
        };
        for child in children {
            out.push(organized_top_entry(child));
            child.collect_descendants(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::parse_entries;

    #[test]
    fn applied_equation_groups_attempt_applicable_and_apply() {
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
        assert_eq!(organized.len(), 1);
        assert!(matches!(organized[0], Organized::AppliedEquation { .. }));
        assert!(organized[0].check_prefix_law());
    }

    #[test]
    fn simple_entries_pass_through_unwrapped() {
        let text = "kore-repl foo (LogMessage):\n    hello\n";
        let entries = parse_entries(text).unwrap();
        let organized = organize(&entries).unwrap();
        assert_eq!(organized.len(), 1);
        assert!(matches!(organized[0], Organized::Simple { .. }));
    }
}
