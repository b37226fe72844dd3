//! Waitlist ordering and the contiguity invariant.
//!
//! At rest the positions of `N` entrants are exactly `{1, 2, ..., N}`.
//! Deletes are allowed to break this (they leave a gap); [`renormalize`]
//! is the explicit repair.

use crate::entrant::{Entrant, PositionUpdate};
use crate::error::{Error, Result};

/// Entrants in waitlist order.
///
/// Ties on position (only possible in a damaged waitlist) fall back to
/// admission time, then id, so the order is always total.
pub fn ordered(entrants: &[Entrant]) -> Vec<&Entrant> {
    let mut sorted: Vec<&Entrant> = entrants.iter().collect();
    sorted.sort_by(|a, b| {
        a.line_position
            .cmp(&b.line_position)
            .then(a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

/// Check that positions form `1..=N` with no gaps or duplicates.
pub fn check_contiguous(entrants: &[Entrant]) -> Result<()> {
    for (index, entrant) in ordered(entrants).into_iter().enumerate() {
        let expected = index as u32 + 1;
        if entrant.line_position < expected {
            return Err(Error::Inconsistent(format!(
                "position {} is held by more than one entrant",
                entrant.line_position
            )));
        }
        if entrant.line_position > expected {
            return Err(Error::Inconsistent(format!(
                "position {} is missing (next entrant {} is at {})",
                expected,
                entrant.id.short(),
                entrant.line_position
            )));
        }
    }
    Ok(())
}

/// Updates that close every gap and split every duplicate.
///
/// Relative order is preserved; only entrants whose position changes are
/// returned.
pub fn renormalize(entrants: &[Entrant]) -> Vec<PositionUpdate> {
    ordered(entrants)
        .into_iter()
        .enumerate()
        .filter_map(|(index, entrant)| {
            let position = index as u32 + 1;
            (entrant.line_position != position)
                .then(|| PositionUpdate::new(entrant.id.clone(), position))
        })
        .collect()
}
