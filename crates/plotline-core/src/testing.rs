//! Fixtures shared by the unit tests.

use crate::entrant::{Entrant, EntrantId, PositionUpdate, Profile};

/// Entrants named by `ids`, at positions `1..=ids.len()`.
pub(crate) fn waitlist(ids: &[&str]) -> Vec<Entrant> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| entrant(id, i as u32 + 1))
        .collect()
}

/// Entrants at explicit (possibly gapped) positions.
pub(crate) fn at_positions(rows: &[(&str, u32)]) -> Vec<Entrant> {
    rows.iter().map(|(id, pos)| entrant(id, *pos)).collect()
}

pub(crate) fn entrant(id: &str, line_position: u32) -> Entrant {
    let profile = Profile::new(id, format!("{}@example.com", id.to_lowercase()));
    Entrant::new(EntrantId::from(id), profile, line_position, u64::from(line_position))
}

/// Apply updates in place, the way the store would.
pub(crate) fn apply(entrants: &mut [Entrant], updates: &[PositionUpdate]) {
    for update in updates {
        if let Some(e) = entrants.iter_mut().find(|e| e.id == update.id) {
            e.line_position = update.line_position;
        }
    }
}

/// Entrant ids in waitlist order.
pub(crate) fn order(entrants: &[Entrant]) -> Vec<String> {
    let mut sorted: Vec<&Entrant> = entrants.iter().collect();
    sorted.sort_by_key(|e| e.line_position);
    sorted.iter().map(|e| e.id.to_string()).collect()
}
