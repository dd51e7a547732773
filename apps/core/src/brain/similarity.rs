//! Sequence similarity (Ratcliff/Obershelp).
//!
//! `ratio` is `2 * M / T`, where `T` is the combined character count and `M`
//! the number of characters in the matching blocks found by recursively
//! taking the longest common substring. Character indexing of the second
//! sequence drops "popular" characters once it reaches 200 characters, so long
//! inputs made of repeated letters do not dominate the score.

use std::collections::HashMap;

/// Sequences at least this long have popular characters removed from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Precomputed matcher for one pair of character sequences.
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// Positions of each character of `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
    ///
    /// Among equally long blocks the one starting earliest in `a` wins, then
    /// earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        // j -> length of the match ending at a[i - 1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // popular characters are missing from b2j; grow the block across them
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    /// Total number of characters covered by matching blocks.
    fn matched_chars(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    fn score(&self, matches: usize) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * matches as f64 / total as f64
    }

    pub fn ratio(&self) -> f64 {
        self.score(self.matched_chars())
    }

    /// Upper bound on `ratio` from shared character counts.
    pub fn quick_ratio(&self) -> f64 {
        let mut available: HashMap<char, isize> = HashMap::new();
        for c in &self.b {
            *available.entry(*c).or_insert(0) += 1;
        }
        let mut matches = 0;
        for c in &self.a {
            let slot = available.entry(*c).or_insert(0);
            if *slot > 0 {
                matches += 1;
            }
            *slot -= 1;
        }
        self.score(matches)
    }

    /// Upper bound on `ratio` from lengths alone.
    pub fn real_quick_ratio(&self) -> f64 {
        self.score(self.a.len().min(self.b.len()))
    }
}

/// Similarity of `a` and `b` in `0.0..=1.0`.
#[allow(dead_code)]
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}

/// `ratio(candidate, input)` if it reaches `cutoff`, checking the cheap upper bounds first.
pub fn score_at_least(candidate: &str, input: &str, cutoff: f64) -> Option<f64> {
    let matcher = SequenceMatcher::new(candidate, input);
    if matcher.real_quick_ratio() < cutoff || matcher.quick_ratio() < cutoff {
        return None;
    }
    let score = matcher.ratio();
    (score >= cutoff).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_known_ratios() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        assert!(approx(ratio("apple", "appel"), 0.8));
        assert!(approx(ratio("choking", "chokng"), 12.0 / 13.0));
        assert!(approx(ratio("snakebite", "snak bit"), 14.0 / 17.0));
    }

    #[test]
    fn test_identical_and_disjoint() {
        assert!(approx(ratio("burns", "burns"), 1.0));
        assert!(approx(ratio("burns", "xyz"), 0.0));
        assert!(approx(ratio("", ""), 1.0));
        assert!(approx(ratio("burns", ""), 0.0));
    }

    #[test]
    fn test_quick_ratios_bound_ratio() {
        let m = SequenceMatcher::new("apple", "appel");
        assert!(m.real_quick_ratio() >= m.quick_ratio());
        assert!(m.quick_ratio() >= m.ratio());
        assert!(approx(m.quick_ratio(), 1.0));
    }

    #[test]
    fn test_popular_characters_ignored_in_long_input() {
        let long_input = format!("ab{}", "x".repeat(300));
        assert!(approx(ratio("xxxxx", &long_input), 0.0));
    }

    #[test]
    fn test_non_ascii_counts_characters() {
        assert!(approx(ratio("brûlure", "brulure"), 12.0 / 14.0));
    }

    #[test]
    fn test_score_at_least_cutoff() {
        assert!(score_at_least("burns", "burn", 0.4).is_some());
        assert!(score_at_least("burns", "how to treat burns quickly", 0.4).is_none());
        let exact = score_at_least("ab", "a", 2.0 / 3.0).unwrap();
        assert!(approx(exact, 2.0 / 3.0));
    }
}
