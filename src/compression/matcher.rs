use super::{MAX_COUNT, MAX_OFFSET};

/// A one byte backref costs as much as a literal byte, so it is never worth it.
pub const MIN_MATCH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub length: usize,
    pub offset: usize,
}

/// Longest match for `raw[cursor..]` within the window, nearest offset on ties.
///
/// A match may run past `cursor` into bytes that are not emitted yet: the decoder
/// copies one byte at a time, so an offset shorter than the length replays the
/// bytes the same copy has just produced.
pub fn find_best_backref(raw: &[u8], cursor: usize) -> Option<Match> {
    let max_length = raw.len().saturating_sub(cursor).min(MAX_COUNT);
    if max_length < MIN_MATCH {
        return None;
    }

    let target = &raw[cursor..cursor + max_length];
    let mut best: Option<Match> = None;

    for offset in 1..=cursor.min(MAX_OFFSET) {
        let source = &raw[cursor - offset..];

        let length = target
            .iter()
            .zip(source)
            .take_while(|(a, b)| a == b)
            .count();

        if length > best.map_or(MIN_MATCH - 1, |best| best.length) {
            best = Some(Match { length, offset });

            if length == max_length {
                break;
            }
        }
    }

    best
}
