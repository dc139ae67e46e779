//! The generic innermost-first bracket reducer.
//!
//! This is the one primitive the rest of the transformer is built on: it
//! strips or rewrites arbitrarily nested `{{…}}`, `[[…]]`, `[…]`, `{|…|}` and
//! `<tag …>…tag>` regions without a recursive-descent parser, by always
//! reducing the innermost pair first and letting outer pairs fall out of the
//! next pass over the (now shorter) string.

/// Safety cap on the number of outer reduction passes. Guards against
/// adversarial or pathologically malformed input; if tripped, [`reduce`]
/// returns whatever string it had built up to that point, unchanged further.
const MAX_ITERATIONS: usize = 50_000;

/// Repeatedly locates an innermost `L ... R` pair — the leftmost position
/// where `L` is followed (before any further `L`) by a matching `R` — and
/// replaces the enclosed content (excluding the delimiters) with `f(content)`.
///
/// Terminates when no `L` remains in the string, or when [`MAX_ITERATIONS`]
/// outer passes have been made.
pub fn reduce<F>(s: &str, l: &str, r: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    debug_assert!(!l.is_empty() && !r.is_empty());

    let mut current = s.to_string();

    for _ in 0..MAX_ITERATIONS {
        let Some((start, end, inner_start, inner_end)) = find_innermost(&current, l, r) else {
            break;
        };
        let replacement = f(&current[inner_start..inner_end]);
        current.replace_range(start..end, &replacement);
    }

    current
}

/// Finds the innermost `L ... R` span.
///
/// Returns `(outer_start, outer_end, inner_start, inner_end)` where
/// `outer_start..outer_end` spans `L` through `R` inclusive, and
/// `inner_start..inner_end` spans the content between them.
fn find_innermost(s: &str, l: &str, r: &str) -> Option<(usize, usize, usize, usize)> {
    let mut search_from = 0;

    loop {
        let open = find_from(s, l, search_from)?;
        let mut candidate_open = open;

        loop {
            let after_open = candidate_open + l.len();
            let next_open = find_from(s, l, after_open);
            let next_close = find_from(s, r, after_open);

            match (next_open, next_close) {
                (Some(no), Some(nc)) if no < nc => {
                    // A deeper opener appears before the next closer: dive in.
                    candidate_open = no;
                }
                (_, Some(nc)) => {
                    let inner_start = candidate_open + l.len();
                    let outer_end = nc + r.len();
                    return Some((candidate_open, outer_end, inner_start, nc));
                }
                (_, None) => {
                    // No closer anywhere after this opener: this opener (and
                    // everything nested inside it) can never be reduced.
                    // Resume the outer scan past it.
                    search_from = open + l.len();
                    break;
                }
            }
        }

        if search_from <= open {
            // Unreachable in practice (the inner loop either returns or
            // advances search_from), but keeps the outer loop from spinning.
            search_from = open + l.len();
        }
    }
}

/// `s.find(needle)` restricted to byte offset `from` onward, returning an
/// absolute offset.
fn find_from(s: &str, needle: &str, from: usize) -> Option<usize> {
    if from > s.len() {
        return None;
    }
    s.get(from..)
        .and_then(|tail| tail.find(needle))
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_delimiter_is_unchanged() {
        assert_eq!(reduce("hello world", "{{", "}}", |c| c.to_uppercase()), "hello world");
    }

    #[test]
    fn single_pair_is_reduced() {
        assert_eq!(
            reduce("a {{ bees }} c", "{{", "}}", |c| c.trim().to_uppercase()),
            "a BEES c"
        );
    }

    #[test]
    fn nested_pairs_reduce_innermost_first() {
        let mut order = Vec::new();
        let result = reduce("{{outer {{inner}} tail}}", "{{", "}}", |c| {
            order.push(c.to_string());
            format!("[{c}]")
        });
        assert_eq!(order, vec!["inner", "outer [inner] tail"]);
        assert_eq!(result, "[outer [inner] tail]");
    }

    #[test]
    fn unbalanced_opener_is_left_alone() {
        assert_eq!(reduce("a {{ dangling", "{{", "}}", |c| c.to_string()), "a {{ dangling");
    }

    #[test]
    fn multiple_sibling_pairs_each_reduce() {
        let result = reduce("[[a]] and [[b]]", "[[", "]]", |c| c.to_uppercase());
        assert_eq!(result, "A and B");
    }

    #[test]
    fn deepest_pair_wins_with_three_levels() {
        let mut seen = Vec::new();
        reduce("{{1 {{2 {{3}} }} }}", "{{", "}}", |c| {
            seen.push(c.trim().to_string());
            String::new()
        });
        assert_eq!(seen[0], "3");
    }
}
