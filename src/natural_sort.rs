// src/natural_sort.rs - Numeric-aware ordering for cell identifiers

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn split_runs(s: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                runs.push(make_run(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }

    if let Some(prev) = in_digits {
        runs.push(make_run(&s[start..], prev));
    }
    runs
}

fn make_run(text: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(text)
    } else {
        Run::Text(text)
    }
}

/// Compare digit runs by integer value without parsing, so arbitrarily long
/// runs cannot overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Natural ordering: `control_2` < `control_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let runs_a = split_runs(a);
    let runs_b = split_runs(b);

    for (ra, rb) in runs_a.iter().zip(runs_b.iter()) {
        let ord = match (ra, rb) {
            (Run::Digits(x), Run::Digits(y)) => compare_digits(x, y),
            (Run::Text(x), Run::Text(y)) => x.cmp(y),
            (Run::Digits(_), Run::Text(_)) => Ordering::Less,
            (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    runs_a
        .len()
        .cmp(&runs_b.len())
        .then_with(|| a.cmp(b))
}

/// Sort cell ids in place using natural ordering.
pub fn sort_cell_ids<S: AsRef<str>>(ids: &mut [S]) {
    ids.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
