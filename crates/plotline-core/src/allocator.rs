//! Position allocation for newly admitted entrants.

use crate::entrant::Entrant;

/// Next free position at the end of the waitlist.
///
/// Returns one past the highest observed position, or `1` for an empty
/// waitlist. Gaps are not filled: `[1, 2, 5]` allocates `6`.
pub fn allocate(entrants: &[Entrant]) -> u32 {
    entrants
        .iter()
        .map(|e| e.line_position)
        .max()
        .map_or(1, |max| max + 1)
}
