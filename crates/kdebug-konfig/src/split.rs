//! Splits long configuration lines at natural breakpoints — `~>` sequent
//! arrows and parenthesized argument lists — so a terminal with a fixed
//! column budget can display them without truncation. Bracket depth is
//! tracked so a split never lands inside nested parentheses. Operates
//! directly on the nested [`Konfig`] structure [`crate::normalize`]
//! produces, the same way it is itself built and walked.

use crate::normalize::Konfig;

const INDENT_SIZE: usize = 2;

/// Splits `line` on every occurrence of `needle` that sits at bracket
/// depth zero, tracking `()`, `[]`, `{}` nesting as it scans.
fn split_outside_parentheses(line: &str, needle: &str) -> Vec<String> {
    let mut depth: i32 = 0;
    let mut parts = Vec::new();
    let mut current = String::new();
    let bytes = line.as_bytes();
    let needle_bytes = needle.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if depth == 0 && line[i..].starts_with(needle) {
            parts.push(current.clone());
            current.clear();
            i += needle_bytes.len();
            continue;
        }
        current.push(c);
        i += 1;
    }
    parts.push(current);
    parts
}

/// Visits every item in `items` bottom-up: group items recurse one level
/// deeper first (their transformed contents replace them in place), then
/// `visitor` runs once on every leaf line as it is appended, and once more
/// on the fully rebuilt list for this level. `level` is the nesting depth
/// of the list currently being visited, used by the visitors below to
/// weigh a line's on-screen indentation against `max_len`.
fn transform_traversal<F>(level: usize, items: Vec<Konfig>, visitor: &F) -> Vec<Konfig>
where
    F: Fn(usize, &Konfig) -> Option<Vec<Konfig>>,
{
    let mut result = Vec::new();
    for item in items {
        match item {
            Konfig::Group(inner) => {
                let transformed = transform_traversal(level + 1, inner, visitor);
                result.push(Konfig::Group(transformed));
            }
            leaf => match visitor(level, &leaf) {
                Some(replacement) => result.extend(replacement),
                None => result.push(leaf),
            },
        }
    }
    let whole = Konfig::Group(result.clone());
    visitor(level, &whole).unwrap_or(result)
}

fn is_k_tag(item: &Konfig, tag: &str) -> bool {
    matches!(item, Konfig::Line(text) if text.trim() == tag)
}

/// Finds a `<k>`/`</k>` cell at this level and, if its inner group holds a
/// single over-long line containing `~>` arrows, splits that line into a
/// header segment and one `~>`-prefixed continuation per remaining arrow.
fn split_k_cell(level: usize, item: &Konfig, max_len: usize) -> Option<Vec<Konfig>> {
    let Konfig::Group(items) = item else {
        return None;
    };
    if items.len() < 3 {
        return None;
    }
    let open = items.iter().position(|k| is_k_tag(k, "<k>"))?;
    let Konfig::Group(inner) = items.get(open + 1)? else {
        return None;
    };
    if !is_k_tag(items.get(open + 2)?, "</k>") {
        return None;
    }
    let mut new_inner = Vec::new();
    for line in inner {
        let Konfig::Line(text) = line else {
            new_inner.push(line.clone());
            continue;
        };
        if text.len() + level * INDENT_SIZE < max_len || !text.contains(" ~> ") {
            new_inner.push(line.clone());
            continue;
        }
        let parts = split_outside_parentheses(text, " ~> ");
        if parts.len() <= 1 {
            new_inner.push(line.clone());
            continue;
        }
        new_inner.push(Konfig::Line(parts[0].clone()));
        new_inner.extend(parts[1..].iter().map(|s| Konfig::Line(format!("~> {s}"))));
    }
    let mut result = items[..=open].to_vec();
    result.push(Konfig::Group(new_inner));
    result.extend(items[open + 2..].iter().cloned());
    Some(result)
}

fn strip_line(_level: usize, item: &Konfig) -> Option<Vec<Konfig>> {
    match item {
        Konfig::Line(text) => Some(vec![Konfig::Line(text.trim().to_string())]),
        Konfig::Group(_) => None,
    }
}

/// Locates the bracket pair starting at or after `start`, returning its
/// open/close indices (into `chars`) and every top-level comma position
/// inside it, or `None` if unbalanced or no bracket is found.
fn find_parentheses_pair(chars: &[char], start: usize) -> Option<(usize, usize, Vec<usize>)> {
    let mut start = start;
    while start < chars.len() && !matches!(chars[start], '(' | '[' | '{') {
        start += 1;
    }
    if start >= chars.len() {
        return None;
    }
    let mut open = vec![chars[start]];
    let mut split_points = Vec::new();
    let mut end = start + 1;
    while end < chars.len() && !open.is_empty() {
        let current = chars[end];
        end += 1;
        match current {
            ',' if open.len() == 1 => split_points.push(end),
            ')' | ']' | '}' => {
                open.pop();
            }
            '(' | '[' | '{' => open.push(current),
            _ => {}
        }
    }
    if !open.is_empty() {
        return None;
    }
    Some((start, end - 1, split_points))
}

fn only_spaces(chars: &[char]) -> bool {
    chars.iter().all(|&c| c == ' ')
}

fn chars_to_string(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Finds the outermost bracket pairs on an over-long line and re-renders
/// each as a header ending at the bracket, a group holding one line per
/// comma-separated argument, and a closing-bracket footer appended after.
/// Short bracketed spans and pairs with no non-whitespace content are left
/// untouched. Arguments that are themselves still over-long are split
/// further on a later pass, once they sit in the tree as their own lines.
fn split_parentheses(level: usize, item: &Konfig, max_len: usize) -> Option<Vec<Konfig>> {
    let Konfig::Line(text) = item else {
        return None;
    };
    if text.len() + level * INDENT_SIZE < max_len {
        return None;
    }
    let chars: Vec<char> = text.chars().collect();
    let mut result: Vec<Konfig> = Vec::new();
    let mut parens = find_parentheses_pair(&chars, 0);
    let mut start = 0usize;
    while let Some((first, last, split_points)) = parens {
        let next_parens = find_parentheses_pair(&chars, last + 1);
        if only_spaces(&chars[first + 1..last]) {
            parens = next_parens;
            continue;
        }
        if last - start + level * INDENT_SIZE < max_len {
            match &next_parens {
                None => {
                    result.push(Konfig::Line(chars_to_string(&chars[start..=last])));
                    result.push(Konfig::Line(chars_to_string(&chars[last + 1..])));
                    start = chars.len();
                }
                Some((next_first, _, _)) => {
                    if next_first - start + level * INDENT_SIZE >= max_len {
                        result.push(Konfig::Line(chars_to_string(&chars[start..=last])));
                        start = last + 1;
                    }
                }
            }
            parens = next_parens;
            continue;
        }
        result.push(Konfig::Line(chars_to_string(&chars[start..=first])));
        let mut pos = first + 1;
        let mut indented = Vec::new();
        for p in split_points {
            indented.push(Konfig::Line(chars_to_string(&chars[pos..p])));
            pos = p;
        }
        indented.push(Konfig::Line(chars_to_string(&chars[pos..last])));
        start = last;
        result.push(Konfig::Group(indented));
        parens = next_parens;
    }
    if result.is_empty() {
        return None;
    }
    if start < chars.len() {
        result.push(Konfig::Line(chars_to_string(&chars[start..])));
    }
    Some(result)
}

fn remove_empty(_level: usize, item: &Konfig) -> Option<Vec<Konfig>> {
    match item {
        Konfig::Line(text) if text.is_empty() => Some(Vec::new()),
        Konfig::Group(items) if items.is_empty() => Some(Vec::new()),
        _ => None,
    }
}

/// Runs the full split pipeline over `items`: `<k>`-cell splitting, then
/// three passes of parenthesis splitting (an argument that itself needed
/// splitting may still be over-long after the first pass), each followed
/// by a strip, then a final pass dropping anything the splits emptied out.
pub fn split(items: &[Konfig], max_len: usize) -> Vec<Konfig> {
    let items = transform_traversal(0, items.to_vec(), &|level, item| split_k_cell(level, item, max_len));
    let items = transform_traversal(0, items, &strip_line);
    let items = transform_traversal(0, items, &|level, item| split_parentheses(level, item, max_len));
    let items = transform_traversal(0, items, &strip_line);
    let items = transform_traversal(0, items, &|level, item| split_parentheses(level, item, max_len));
    let items = transform_traversal(0, items, &strip_line);
    let items = transform_traversal(0, items, &|level, item| split_parentheses(level, item, max_len));
    let items = transform_traversal(0, items, &strip_line);
    transform_traversal(0, items, &remove_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unparse;

    fn lines(items: &[Konfig], max_len: usize) -> Vec<String> {
        unparse(&split(items, max_len))
    }

    #[test]
    fn short_lines_pass_through() {
        let input = vec![Konfig::Line("foo".into()), Konfig::Line("bar".into())];
        assert_eq!(lines(&input, 80), vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn splits_outside_parentheses_respects_nesting() {
        let parts = split_outside_parentheses("a ~> (b ~> c) ~> d", " ~> ");
        assert_eq!(parts, vec!["a", "(b ~> c)", "d"]);
    }

    #[test]
    fn long_call_splits_on_commas() {
        let long_arg = "x".repeat(40);
        let line = Konfig::Line(format!("foo({long_arg}, {long_arg})"));
        let result = split_parentheses(0, &line, 20).unwrap();
        assert!(result.len() > 1);
        assert!(matches!(&result[0], Konfig::Line(s) if s.ends_with('(')));
        assert!(matches!(result.last().unwrap(), Konfig::Line(s) if s.trim() == ")"));
    }

    #[test]
    fn empty_lines_are_dropped() {
        let input = vec![
            Konfig::Line("foo".into()),
            Konfig::Line("".into()),
            Konfig::Line("  ".into()),
            Konfig::Line("bar".into()),
        ];
        assert_eq!(lines(&input, 80), vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn long_k_cell_arrow_chain_splits_into_continuations() {
        let input = vec![
            Konfig::Line("<k>".into()),
            Konfig::Group(vec![Konfig::Line(
                "stuff1 ~> stuff2 ~> stuff3 ~> stuff4 ~> stuff5".into(),
            )]),
            Konfig::Line("</k>".into()),
        ];
        let result = lines(&input, 20);
        assert_eq!(result[0], "<k>");
        assert!(result.iter().any(|l| l.trim_start().starts_with("~> ")));
        assert_eq!(result.last().unwrap(), "</k>");
    }
}
