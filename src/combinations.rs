// src/combinations.rs - Boolean contact combinations over a target set

use std::collections::BTreeSet;

/// Label of the sentinel combination with an empty required set.
pub const NO_CONTACT_LABEL: &str = "No_contact";

/// Largest target set a combination mask can describe.
pub const MAX_TARGETS: usize = 20;

/// One exclusive contact pattern: exactly the organelles in `required` are in
/// contact, every other target is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanCombination {
    pub label: String,
    /// Sorted member names.
    pub required: Vec<String>,
    /// Bit `i` set when the i-th sorted target is required.
    pub mask: u32,
}

impl BooleanCombination {
    pub fn is_no_contact(&self) -> bool {
        self.required.is_empty()
    }
}

/// Sort and de-duplicate target names.
pub fn sorted_targets<S: AsRef<str>>(targets: &[S]) -> Vec<String> {
    targets
        .iter()
        .map(|t| t.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Generate every exclusive contact combination for `targets`.
///
/// Subsets are enumerated by size, then lexicographically over the sorted
/// names: `A_only`, `B_only`, `A+B`, ... The `No_contact` sentinel is always
/// last, so `n` targets yield `2^n` combinations. Callers keep the set within
/// [`MAX_TARGETS`].
pub fn generate_boolean_combinations<S: AsRef<str>>(targets: &[S]) -> Vec<BooleanCombination> {
    let sorted = sorted_targets(targets);
    let n = sorted.len();
    let mut combinations = Vec::with_capacity(1usize << n.min(MAX_TARGETS));

    for r in 1..=n {
        let mut indices: Vec<usize> = (0..r).collect();
        loop {
            let required: Vec<String> = indices.iter().map(|&i| sorted[i].clone()).collect();
            let label = if r == 1 {
                format!("{}_only", required[0])
            } else {
                required.join("+")
            };
            let mask = indices.iter().fold(0u32, |m, &i| m | (1 << i));
            combinations.push(BooleanCombination { label, required, mask });

            if !next_combination(&mut indices, n) {
                break;
            }
        }
    }

    combinations.push(BooleanCombination {
        label: NO_CONTACT_LABEL.to_string(),
        required: Vec::new(),
        mask: 0,
    });

    combinations
}

/// Advance `indices` to the next r-subset of `0..n` in lexicographic order.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let r = indices.len();
    let mut i = r;
    while i > 0 {
        i -= 1;
        if indices[i] < n - r + i {
            indices[i] += 1;
            for j in i + 1..r {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
