//! Glob-style wildcard matching used for IP masks and name patterns.
//!
//! The syntax is the shell's `fnmatch`: `*` matches any (possibly empty) run
//! of characters, `?` matches exactly one, `[...]` matches one character from
//! a set of characters and ranges (`[!...]` or `[^...]` negates it) and `\`
//! makes the next character literal. An unterminated `[` is a literal.
//! Matching is ASCII case-insensitive since host names are.

/// Returns true if `text` matches `pattern` in full.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
            continue;
        }
        if p < pattern.len()
            && let Some(next) = match_one(&pattern, p, text[t])
        {
            p = next;
            t += 1;
            continue;
        }
        match backtrack {
            Some((star, absorbed)) => {
                p = star + 1;
                t = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match the single pattern element at `p` against `c`.
///
/// Returns the index of the following element on a match.
fn match_one(pattern: &[char], p: usize, c: char) -> Option<usize> {
    let (matched, next) = match pattern[p] {
        '?' => (true, p + 1),
        '[' => match_class(pattern, p + 1, c).unwrap_or((same(c, '['), p + 1)),
        '\\' if p + 1 < pattern.len() => (same(c, pattern[p + 1]), p + 2),
        literal => (same(c, literal), p + 1),
    };
    matched.then_some(next)
}

/// Match a bracket expression whose body starts at `start`.
///
/// Returns whether `c` is in the set and the index past the closing `]`,
/// or None when the expression is never closed.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start;
    let negated = matches!(pattern.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        let mut lo = *pattern.get(i)?;
        if lo == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;
        if lo == '\\' {
            i += 1;
            lo = *pattern.get(i)?;
        }
        i += 1;

        let mut hi = lo;
        if pattern.get(i) == Some(&'-') && pattern.get(i + 1).is_some_and(|&n| n != ']') {
            i += 1;
            if pattern[i] == '\\' {
                i += 1;
            }
            hi = *pattern.get(i)?;
            i += 1;
        }

        if in_range(c, lo, hi) {
            matched = true;
        }
    }
}

fn same(a: char, b: char) -> bool {
    a.eq_ignore_ascii_case(&b)
}

fn in_range(c: char, lo: char, hi: char) -> bool {
    let range = lo..=hi;
    range.contains(&c)
        || range.contains(&c.to_ascii_lowercase())
        || range.contains(&c.to_ascii_uppercase())
}
