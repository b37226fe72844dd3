//! Position re-sequencing.
//!
//! Moving an entrant from `old` to `target` shifts every entrant strictly
//! between them (plus the one at `target`) by exactly one slot toward the
//! vacated position:
//!
//! ```text
//! moving down (target > old):  (old, target]  -> position - 1
//! moving up   (target < old):  [target, old)  -> position + 1
//! ```
//!
//! The mover plus the shifted entrants are the whole update set, so a move
//! touches `|target - old| + 1` rows and nothing else. Functions here are
//! pure; applying the updates is the caller's job.

use crate::entrant::{Entrant, EntrantId, PositionUpdate};
use crate::error::{Error, Result};
use crate::sequence::ordered;
use std::fmt;
use std::str::FromStr;

/// How out-of-range target positions are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPolicy {
    /// Targets outside `1..=N` are an [`Error::InvalidTarget`].
    #[default]
    Reject,
    /// Targets outside `1..=N` snap to the nearest bound.
    Clamp,
}

impl fmt::Display for TargetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Clamp => f.write_str("clamp"),
        }
    }
}

impl FromStr for TargetPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("unknown target policy '{}' (expected reject or clamp)", other)),
        }
    }
}

/// Parse a typed target position.
pub fn parse_target(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| Error::InvalidTarget(format!("'{}' is not a whole number", trimmed)))
}

/// Compute the updates that move `moving_id` to `target`.
///
/// Returns an empty list when the entrant is already there.
pub fn compute_shift(
    entrants: &[Entrant],
    moving_id: &EntrantId,
    target: i64,
    policy: TargetPolicy,
) -> Result<Vec<PositionUpdate>> {
    let mover = entrants
        .iter()
        .find(|e| &e.id == moving_id)
        .ok_or_else(|| Error::NotFound(moving_id.clone()))?;
    let old = mover.line_position;

    if target == i64::from(old) {
        return Ok(Vec::new());
    }

    let target = resolve_target(target, entrants.len(), policy)?;
    if target == old {
        return Ok(Vec::new());
    }

    let mut updates: Vec<PositionUpdate> = ordered(entrants)
        .into_iter()
        .filter_map(|e| {
            let pos = e.line_position;
            if target > old && pos > old && pos <= target {
                Some(PositionUpdate::new(e.id.clone(), pos - 1))
            } else if target < old && pos >= target && pos < old {
                Some(PositionUpdate::new(e.id.clone(), pos + 1))
            } else {
                None
            }
        })
        .collect();
    updates.push(PositionUpdate::new(moving_id.clone(), target));

    Ok(updates)
}

/// Swap an entrant with the one directly ahead of it.
///
/// No-op for the first entrant.
pub fn move_up(entrants: &[Entrant], id: &EntrantId) -> Result<Vec<PositionUpdate>> {
    step(entrants, id, Step::Up)
}

/// Swap an entrant with the one directly behind it.
///
/// No-op for the last entrant.
pub fn move_down(entrants: &[Entrant], id: &EntrantId) -> Result<Vec<PositionUpdate>> {
    step(entrants, id, Step::Down)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Up,
    Down,
}

fn step(entrants: &[Entrant], id: &EntrantId, step: Step) -> Result<Vec<PositionUpdate>> {
    let line = ordered(entrants);
    let index = line
        .iter()
        .position(|e| &e.id == id)
        .ok_or_else(|| Error::NotFound(id.clone()))?;

    let neighbour = match step {
        Step::Up => index.checked_sub(1),
        Step::Down => Some(index + 1).filter(|&i| i < line.len()),
    };
    let Some(neighbour) = neighbour else {
        return Ok(Vec::new());
    };

    let (mover, other) = (line[index], line[neighbour]);
    Ok(vec![
        PositionUpdate::new(other.id.clone(), mover.line_position),
        PositionUpdate::new(mover.id.clone(), other.line_position),
    ])
}

fn resolve_target(target: i64, len: usize, policy: TargetPolicy) -> Result<u32> {
    // The mover is in the snapshot, so len >= 1.
    let upper = i64::try_from(len).unwrap_or(i64::MAX).min(i64::from(u32::MAX));
    let resolved = match policy {
        TargetPolicy::Reject if target < 1 || target > upper => {
            return Err(Error::InvalidTarget(format!(
                "position {} is outside 1..={}",
                target, upper
            )));
        }
        TargetPolicy::Reject => target,
        TargetPolicy::Clamp => target.clamp(1, upper),
    };
    u32::try_from(resolved)
        .map_err(|_| Error::InvalidTarget(format!("position {} is out of range", resolved)))
}
