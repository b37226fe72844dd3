//! Plotline Core - waitlist ordering for a community garden
//!
//! Pure computations over a snapshot of the waitlist. Nothing here performs
//! I/O; callers fetch the entrants, ask for the updates, and apply them.
//!
//! # Components
//!
//! - **Allocator**: [`allocate`] hands a new entrant the slot after the last one
//! - **Re-sequencer**: [`compute_shift`], [`move_up`], [`move_down`] compute the
//!   minimal position updates for a move
//! - **Sequence**: [`check_contiguous`] and [`renormalize`] guard the `1..N`
//!   invariant
//! - **Intake**: [`SignUpForm`], [`EntrantForm`] and [`EntrantPatch`] validate
//!   loosely-typed payloads into a [`Profile`]
//!
//! # Example
//!
//! ```
//! use plotline_core::{compute_shift, Entrant, EntrantId, Profile, TargetPolicy};
//!
//! let line: Vec<Entrant> = ["a", "b", "c"]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, id)| {
//!         let profile = Profile::new(*id, format!("{}@example.com", id));
//!         Entrant::new(EntrantId::from(*id), profile, i as u32 + 1, 0)
//!     })
//!     .collect();
//!
//! let updates = compute_shift(&line, &EntrantId::from("c"), 1, TargetPolicy::Reject).unwrap();
//! assert_eq!(updates.len(), 3);
//! ```

mod allocator;
mod entrant;
mod error;
mod intake;
mod resequencer;
mod sequence;

#[cfg(test)]
mod testing;

pub use allocator::allocate;
pub use entrant::{normalize_email, Entrant, EntrantId, ExperienceLevel, PositionUpdate, Profile};
pub use error::{Error, FieldError, Result};
pub use intake::{format_phone, EntrantForm, EntrantPatch, SignUpForm};
pub use resequencer::{compute_shift, move_down, move_up, parse_target, TargetPolicy};
pub use sequence::{check_contiguous, ordered, renormalize};
