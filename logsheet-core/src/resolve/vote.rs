use crate::consts::*;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// Both characters consumed.
    Diagonal,
    /// Character of `a` against a gap.
    GapInB,
    /// Character of `b` against a gap.
    GapInA,
}

const NEG: i32 = i32::MIN / 4;

fn best(candidates: [(i32, State); 3]) -> (i32, State) {
    // Earlier entries win ties
    candidates
        .into_iter()
        .fold((NEG, State::Diagonal), |acc, item| if item.0 > acc.0 { item } else { acc })
}

/// Global alignment of two strings with affine gap costs (Gotoh).
///
/// Scores are +1 for a match, 0 for a mismatch, -3 to open a gap and -1 to extend it.
/// Gaps are filled with spaces, so both returned strings have the same number of chars.
pub fn global_align(a: &str, b: &str) -> (String, String) {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    let (n, m) = (a.len(), b.len());

    let gap = |len: usize| ALIGN_GAP_OPEN + (len as i32 - 1) * ALIGN_GAP_EXTEND;
    let score = |i: usize, j: usize| {
        if a[i - 1] == b[j - 1] {
            ALIGN_MATCH
        } else {
            ALIGN_MISMATCH
        }
    };

    // diagonal[i][j]: a[..i] and b[..j] aligned, ending with a[i-1] against b[j-1]
    let mut diagonal = vec![vec![NEG; m + 1]; n + 1];
    let mut gap_in_b = vec![vec![NEG; m + 1]; n + 1];
    let mut gap_in_a = vec![vec![NEG; m + 1]; n + 1];
    diagonal[0][0] = 0;
    for i in 1..=n {
        gap_in_b[i][0] = gap(i);
    }
    for j in 1..=m {
        gap_in_a[0][j] = gap(j);
    }

    for i in 1..=n {
        for j in 1..=m {
            diagonal[i][j] = best([
                (diagonal[i - 1][j - 1], State::Diagonal),
                (gap_in_b[i - 1][j - 1], State::GapInB),
                (gap_in_a[i - 1][j - 1], State::GapInA),
            ])
            .0 + score(i, j);
            gap_in_b[i][j] = best([
                (diagonal[i - 1][j] + ALIGN_GAP_OPEN, State::Diagonal),
                (gap_in_b[i - 1][j] + ALIGN_GAP_EXTEND, State::GapInB),
                (gap_in_a[i - 1][j] + ALIGN_GAP_OPEN, State::GapInA),
            ])
            .0;
            gap_in_a[i][j] = best([
                (diagonal[i][j - 1] + ALIGN_GAP_OPEN, State::Diagonal),
                (gap_in_a[i][j - 1] + ALIGN_GAP_EXTEND, State::GapInA),
                (gap_in_b[i][j - 1] + ALIGN_GAP_OPEN, State::GapInB),
            ])
            .0;
        }
    }

    let mut aligned_a = Vec::with_capacity(n + m);
    let mut aligned_b = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    let mut state = best([
        (diagonal[n][m], State::Diagonal),
        (gap_in_b[n][m], State::GapInB),
        (gap_in_a[n][m], State::GapInA),
    ])
    .1;

    while i > 0 || j > 0 {
        match state {
            State::Diagonal if i > 0 && j > 0 => {
                let target = diagonal[i][j] - score(i, j);
                state = [State::Diagonal, State::GapInB, State::GapInA]
                    .into_iter()
                    .find(|previous| {
                        let table = match previous {
                            State::Diagonal => &diagonal,
                            State::GapInB => &gap_in_b,
                            State::GapInA => &gap_in_a,
                        };
                        table[i - 1][j - 1] == target
                    })
                    .unwrap_or(State::Diagonal);
                aligned_a.push(a[i - 1]);
                aligned_b.push(b[j - 1]);
                i -= 1;
                j -= 1;
            }
            State::GapInB if i > 0 => {
                let current = gap_in_b[i][j];
                state = if j == 0 || gap_in_b[i - 1][j] + ALIGN_GAP_EXTEND == current {
                    State::GapInB
                } else if diagonal[i - 1][j] + ALIGN_GAP_OPEN == current {
                    State::Diagonal
                } else {
                    State::GapInA
                };
                aligned_a.push(a[i - 1]);
                aligned_b.push(GAP_CHAR);
                i -= 1;
            }
            State::GapInA if j > 0 => {
                let current = gap_in_a[i][j];
                state = if i == 0 || gap_in_a[i][j - 1] + ALIGN_GAP_EXTEND == current {
                    State::GapInA
                } else if diagonal[i][j - 1] + ALIGN_GAP_OPEN == current {
                    State::Diagonal
                } else {
                    State::GapInB
                };
                aligned_a.push(GAP_CHAR);
                aligned_b.push(b[j - 1]);
                j -= 1;
            }
            // Borders: only one string has characters left
            _ if i > 0 => state = State::GapInB,
            _ => state = State::GapInA,
        }
    }

    (
        aligned_a.into_iter().rev().collect(),
        aligned_b.into_iter().rev().collect(),
    )
}

/// `a` with the gaps that align it against `b`.
pub fn align_pairwise(a: &str, b: &str) -> String {
    global_align(a, b).0
}

/// Character-wise majority vote over strings of (ideally) equal length.
///
/// Strings are padded with trailing spaces; at each position the most frequent character
/// wins. Counting runs over the inputs in sorted order, so a tie goes to the character
/// met first there and the result does not depend on the order of `strings`.
pub fn majority_vote<S: AsRef<str>>(strings: &[S]) -> String {
    let mut rows = strings
        .iter()
        .map(|s| s.as_ref().chars().collect::<Vec<_>>())
        .collect::<Vec<_>>();
    rows.sort();

    let max_length = rows.iter().map(Vec::len).max().unwrap_or(0);

    (0..max_length)
        .map(|position| {
            let mut counts: Vec<(char, usize)> = Vec::new();
            for row in &rows {
                let c = row.get(position).copied().unwrap_or(GAP_CHAR);
                match counts.iter_mut().find(|(seen, _)| *seen == c) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((c, 1)),
                }
            }
            counts
                .into_iter()
                .fold((GAP_CHAR, 0), |acc, item| if item.1 > acc.1 { item } else { acc })
                .0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_identical() {
        let (a, b) = global_align("Lagoon", "Lagoon");
        assert_eq!(a, "Lagoon");
        assert_eq!(b, "Lagoon");
    }

    #[test]
    fn test_align_inserts_gap() {
        let (a, b) = global_align("12.5", "125");
        assert_eq!(a.chars().count(), b.chars().count());
        assert_eq!(a, "12.5");
        assert_eq!(b, "12 5");
    }

    #[test]
    fn test_align_empty() {
        assert_eq!(global_align("", "abc"), ("   ".to_string(), "abc".to_string()));
        assert_eq!(global_align("ab", ""), ("ab".to_string(), "  ".to_string()));
        assert_eq!(global_align("", ""), (String::new(), String::new()));
    }

    #[test]
    fn test_align_preserves_characters() {
        let (a, b) = global_align("station 4", "stat1on  4b");
        assert_eq!(a.chars().count(), b.chars().count());
        assert_eq!(a.replace(GAP_CHAR, ""), "station4");
        assert_eq!(b.replace(GAP_CHAR, ""), "stat1on4b");
    }

    #[test]
    fn test_majority_vote_three() {
        assert_eq!(majority_vote(&["Lagoon", "Lag0on", "Lagoan"]), "Lagoon");
    }

    #[test]
    fn test_majority_vote_pads() {
        assert_eq!(majority_vote(&["abc", "ab", "abc"]), "abc");
        assert_eq!(majority_vote(&["ab", "ab", "abc"]), "ab ");
        assert_eq!(majority_vote::<&str>(&[]), "");
    }

    #[test]
    fn test_majority_vote_order_independent() {
        let inputs = ["s1te 4", "site 4", "sitc A"];
        let expected = majority_vote(&inputs);
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for permutation in permutations {
            let permuted = permutation.map(|index| inputs[index]);
            assert_eq!(majority_vote(&permuted), expected);
        }

        // Two inputs with a tie at every differing position
        assert_eq!(majority_vote(&["ab", "cd"]), majority_vote(&["cd", "ab"]));
    }
}
