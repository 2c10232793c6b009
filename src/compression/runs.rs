use super::MAX_COUNT;

pub const MIN_SINGLE: usize = 2;
pub const MIN_PATTERN: usize = 2;
/// Pairs carry one stream byte per pair, so short alternations do better as
/// a pattern or a literal.
pub const MIN_PAIRS: usize = 3;

/// Longest run under each RLE mode starting at a cursor, capped at [`MAX_COUNT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Runs {
    /// bytes equal to the first one
    pub single: usize,
    /// repetitions of the first two bytes
    pub pattern: usize,
    /// pairs whose first byte equals the first byte
    pub pairs: usize,
}

impl Runs {
    pub fn probe(raw: &[u8], cursor: usize) -> Self {
        let rest = raw.get(cursor..).unwrap_or_default();

        Self {
            single: single_run(rest),
            pattern: pattern_run(rest),
            pairs: pairs_run(rest),
        }
    }
}

fn single_run(rest: &[u8]) -> usize {
    let Some(&first) = rest.first() else {
        return 0;
    };

    rest.iter()
        .take(MAX_COUNT)
        .take_while(|&&value| value == first)
        .count()
}

fn pattern_run(rest: &[u8]) -> usize {
    let [first, second, ..] = rest else {
        return 0;
    };

    rest.chunks_exact(2)
        .take(MAX_COUNT)
        .take_while(|pair| pair[0] == *first && pair[1] == *second)
        .count()
}

fn pairs_run(rest: &[u8]) -> usize {
    let Some(&fixed) = rest.first() else {
        return 0;
    };

    rest.chunks_exact(2)
        .take(MAX_COUNT)
        .take_while(|pair| pair[0] == fixed)
        .count()
}
