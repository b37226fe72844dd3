//! Waitlist service - allocation and re-sequencing against the store.
//!
//! Every mutating operation runs fetch -> compute -> apply while holding a
//! single per-waitlist lock, so two admins (or an admin and the public
//! intake) never compute positions from the same stale snapshot.
//!
//! Entrants are addressed by full id or by any unique id prefix, which is
//! what the admin CLI shows.

use crate::error::{Error, Result};
use crate::storage::Storage;
use plotline_core::{
    allocate, check_contiguous, compute_shift, move_down, move_up, renormalize, Entrant,
    EntrantId, EntrantPatch, PositionUpdate, Profile, TargetPolicy,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The garden waitlist.
pub struct Waitlist {
    storage: Arc<Storage>,
    policy: TargetPolicy,
    write_lock: Mutex<()>,
}

impl Waitlist {
    /// Create a waitlist over `storage`.
    pub fn new(storage: Arc<Storage>, policy: TargetPolicy) -> Self {
        Self {
            storage,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    /// All entrants in waitlist order.
    pub fn entrants(&self) -> Result<Vec<Entrant>> {
        self.storage.list_entrants()
    }

    /// Number of entrants.
    pub fn len(&self) -> Result<usize> {
        self.storage.count_entrants()
    }

    /// Whether the waitlist is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Look up one entrant by id or unique id prefix.
    pub fn get(&self, id: &EntrantId) -> Result<Entrant> {
        let id = self.resolve(id)?;
        self.storage
            .get_entrant(&id)?
            .ok_or_else(|| Error::NotFound(format!("entrant {}", id)))
    }

    /// Admit a validated applicant at the end of the line.
    pub async fn admit(&self, profile: Profile) -> Result<Entrant> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.storage.list_entrants()?;
        let position = allocate(&snapshot);
        let entrant = self.storage.insert_entrant(profile, position)?;

        info!(
            id = %entrant.id.short(),
            line_position = entrant.line_position,
            "entrant_admitted"
        );
        Ok(entrant)
    }

    /// Move an entrant to `target`, shifting everyone in between.
    ///
    /// Gaps left by removals are closed in the same write, so `target` is
    /// always read against positions `1..=N`.
    pub async fn move_to(&self, id: &EntrantId, target: i64) -> Result<Vec<PositionUpdate>> {
        let _guard = self.write_lock.lock().await;

        let (snapshot, renumbered) = self.compact_snapshot()?;
        let id = resolve_in(&snapshot, id)?;
        let updates = compute_shift(&snapshot, &id, target, self.policy)?;
        self.apply_locked(&id, merge(renumbered, updates))
    }

    /// Swap an entrant with the one ahead of it.
    pub async fn move_up(&self, id: &EntrantId) -> Result<Vec<PositionUpdate>> {
        let _guard = self.write_lock.lock().await;

        let (snapshot, renumbered) = self.compact_snapshot()?;
        let id = resolve_in(&snapshot, id)?;
        let updates = move_up(&snapshot, &id)?;
        self.apply_locked(&id, merge(renumbered, updates))
    }

    /// Swap an entrant with the one behind it.
    pub async fn move_down(&self, id: &EntrantId) -> Result<Vec<PositionUpdate>> {
        let _guard = self.write_lock.lock().await;

        let (snapshot, renumbered) = self.compact_snapshot()?;
        let id = resolve_in(&snapshot, id)?;
        let updates = move_down(&snapshot, &id)?;
        self.apply_locked(&id, merge(renumbered, updates))
    }

    /// Edit profile fields. Position is untouched.
    pub async fn update_profile(&self, id: &EntrantId, patch: &EntrantPatch) -> Result<Entrant> {
        let _guard = self.write_lock.lock().await;

        let current = self.get(id)?;
        let profile = patch.apply(&current.profile)?;
        let entrant = self.storage.update_profile(&current.id, profile)?;

        info!(id = %entrant.id.short(), "entrant_updated");
        Ok(entrant)
    }

    /// Remove an entrant. The vacated position stays empty until [`Self::normalize`].
    pub async fn remove(&self, id: &EntrantId) -> Result<Entrant> {
        let _guard = self.write_lock.lock().await;

        let id = self.resolve(id)?;
        let entrant = self.storage.delete_entrant(&id)?;
        info!(
            id = %id.short(),
            line_position = entrant.line_position,
            "entrant_removed"
        );
        Ok(entrant)
    }

    /// Renumber the waitlist to `1..N`, closing gaps left by removals.
    pub async fn normalize(&self) -> Result<Vec<PositionUpdate>> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.storage.list_entrants()?;
        let updates = renormalize(&snapshot);
        if !updates.is_empty() {
            self.storage.apply_positions(&updates)?;
        }

        info!(changed = updates.len(), "waitlist_normalized");
        Ok(updates)
    }

    /// Verify the contiguity invariant.
    pub fn check(&self) -> Result<()> {
        check_contiguous(&self.storage.list_entrants()?)?;
        Ok(())
    }

    fn resolve(&self, id: &EntrantId) -> Result<EntrantId> {
        if self.storage.get_entrant(id)?.is_some() {
            return Ok(id.clone());
        }
        resolve_in(&self.storage.list_entrants()?, id)
    }

    /// Current entrants renumbered to `1..N` in memory, plus the updates
    /// that renumbering needs.
    fn compact_snapshot(&self) -> Result<(Vec<Entrant>, Vec<PositionUpdate>)> {
        let mut snapshot = self.storage.list_entrants()?;
        let renumbered = renormalize(&snapshot);
        if !renumbered.is_empty() {
            debug!(changed = renumbered.len(), "closing_gaps_before_move");
            for update in &renumbered {
                if let Some(entrant) = snapshot.iter_mut().find(|e| e.id == update.id) {
                    entrant.line_position = update.line_position;
                }
            }
        }
        Ok((snapshot, renumbered))
    }

    fn apply_locked(
        &self,
        id: &EntrantId,
        updates: Vec<PositionUpdate>,
    ) -> Result<Vec<PositionUpdate>> {
        if updates.is_empty() {
            debug!(id = %id.short(), "move_noop");
            return Ok(updates);
        }

        self.storage.apply_positions(&updates)?;
        info!(id = %id.short(), changed = updates.len(), "entrant_moved");

        self.reconcile();
        Ok(updates)
    }

    /// Re-read the waitlist after a write and flag any broken invariant.
    fn reconcile(&self) {
        match self.storage.list_entrants() {
            Ok(entrants) => {
                if let Err(e) = check_contiguous(&entrants) {
                    warn!(error = %e, "waitlist_integrity_warning");
                }
            }
            Err(e) => warn!(error = %e, "waitlist_reconcile_failed"),
        }
    }
}

/// Find the entrant `id` names: an exact id, else a unique id prefix.
fn resolve_in(entrants: &[Entrant], id: &EntrantId) -> Result<EntrantId> {
    if entrants.iter().any(|e| &e.id == id) {
        return Ok(id.clone());
    }

    let prefix = id.as_str();
    let mut matches = entrants
        .iter()
        .filter(|e| !prefix.is_empty() && e.id.as_str().starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only.id.clone()),
        (Some(_), Some(_)) => Err(Error::Ambiguous(format!(
            "'{}' matches more than one entrant",
            prefix
        ))),
        (None, _) => Err(Error::NotFound(format!("entrant {}", id))),
    }
}

/// Fold `later` over `earlier`; for an id in both, `later` wins.
fn merge(earlier: Vec<PositionUpdate>, later: Vec<PositionUpdate>) -> Vec<PositionUpdate> {
    let mut merged = earlier;
    for update in later {
        match merged.iter_mut().find(|u| u.id == update.id) {
            Some(existing) => existing.line_position = update.line_position,
            None => merged.push(update),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn waitlist(policy: TargetPolicy) -> (TempDir, Waitlist) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        (dir, Waitlist::new(storage, policy))
    }

    async fn admit_all(list: &Waitlist, names: &[&str]) -> Vec<EntrantId> {
        let mut ids = Vec::new();
        for name in names {
            let profile = Profile::new(*name, format!("{}@example.com", name.to_lowercase()));
            ids.push(list.admit(profile).await.unwrap().id);
        }
        ids
    }

    fn names(list: &Waitlist) -> Vec<String> {
        list.entrants()
            .unwrap()
            .into_iter()
            .map(|e| e.profile.name)
            .collect()
    }

    #[tokio::test]
    async fn admission_appends() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        admit_all(&list, &["A", "B", "C"]).await;

        let positions: Vec<u32> = list.entrants().unwrap().iter().map(|e| e.line_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(list.check().is_ok());
    }

    #[tokio::test]
    async fn move_persists_shift() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B", "C", "D", "E"]).await;

        let updates = list.move_to(&ids[3], 2).await.unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(names(&list), vec!["A", "D", "B", "C", "E"]);
        assert!(list.check().is_ok());
    }

    #[tokio::test]
    async fn rejected_target_changes_nothing() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B"]).await;

        let err = list.move_to(&ids[0], 5).await.unwrap_err();
        assert!(matches!(err, Error::Core(plotline_core::Error::InvalidTarget(_))));
        assert_eq!(names(&list), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn clamp_policy_moves_to_end() {
        let (_dir, list) = waitlist(TargetPolicy::Clamp);
        let ids = admit_all(&list, &["A", "B", "C"]).await;

        list.move_to(&ids[0], 50).await.unwrap();
        assert_eq!(names(&list), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn single_steps_and_boundaries() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B", "C"]).await;

        assert!(list.move_up(&ids[0]).await.unwrap().is_empty());
        assert!(list.move_down(&ids[2]).await.unwrap().is_empty());

        list.move_down(&ids[0]).await.unwrap();
        assert_eq!(names(&list), vec!["B", "A", "C"]);
        list.move_up(&ids[2]).await.unwrap();
        assert_eq!(names(&list), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn remove_leaves_gap_until_normalized() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B", "C"]).await;

        list.remove(&ids[1]).await.unwrap();
        assert!(list.check().is_err());

        // New entrants still go after the highest position.
        let d = admit_all(&list, &["D"]).await;
        assert_eq!(list.get(&d[0]).unwrap().line_position, 4);

        let updates = list.normalize().await.unwrap();
        assert_eq!(updates.len(), 2);
        assert!(list.check().is_ok());
        assert_eq!(names(&list), vec!["A", "C", "D"]);
        assert!(list.normalize().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_update_keeps_position() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B"]).await;

        let patch = EntrantPatch {
            name: Some("Bea".into()),
            experience: Some("Expert".into()),
            ..EntrantPatch::default()
        };
        let updated = list.update_profile(&ids[1], &patch).await.unwrap();
        assert_eq!(updated.line_position, 2);
        assert_eq!(updated.profile.name, "Bea");
        assert!(list.update_profile(&EntrantId::from("nope"), &patch).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_admissions_get_distinct_positions() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let list = Arc::new(list);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let list = Arc::clone(&list);
                tokio::spawn(async move {
                    let profile = Profile::new(format!("E{}", i), format!("e{}@example.com", i));
                    list.admit(profile).await.unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(list.len().unwrap(), 8);
        assert!(list.check().is_ok());
    }
    #[tokio::test]
    async fn moves_after_removal_close_the_gap() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B", "C", "D"]).await;
        list.remove(&ids[1]).await.unwrap();

        // Positions are now 1, 3, 4; a move reads them as 1..=3.
        assert!(matches!(
            list.move_to(&ids[0], 4).await.unwrap_err(),
            Error::Core(plotline_core::Error::InvalidTarget(_))
        ));
        assert!(list.check().is_err(), "rejected move writes nothing");

        list.move_to(&ids[0], 3).await.unwrap();
        assert_eq!(names(&list), vec!["C", "D", "A"]);
        assert!(list.check().is_ok());
    }

    #[tokio::test]
    async fn clamped_move_after_removal_reaches_the_end() {
        let (_dir, list) = waitlist(TargetPolicy::Clamp);
        let ids = admit_all(&list, &["A", "B", "C", "D"]).await;
        list.remove(&ids[1]).await.unwrap();

        list.move_to(&ids[0], 99).await.unwrap();
        assert_eq!(names(&list), vec!["C", "D", "A"]);
        let positions: Vec<u32> = list.entrants().unwrap().iter().map(|e| e.line_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn step_after_removal_closes_the_gap() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B", "C"]).await;
        list.remove(&ids[0]).await.unwrap();

        list.move_up(&ids[2]).await.unwrap();
        assert_eq!(names(&list), vec!["C", "B"]);
        assert!(list.check().is_ok());
    }

    #[tokio::test]
    async fn entrants_resolve_by_id_prefix() {
        let (_dir, list) = waitlist(TargetPolicy::Reject);
        let ids = admit_all(&list, &["A", "B"]).await;

        let short = EntrantId::from(ids[1].short());
        assert_eq!(list.get(&short).unwrap().id, ids[1]);

        let updates = list.move_up(&short).await.unwrap();
        assert!(updates.iter().all(|u| ids.contains(&u.id)));
        assert_eq!(names(&list), vec!["B", "A"]);

        assert!(matches!(
            list.get(&EntrantId::from("")).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn ambiguous_prefix_is_refused() {
        let entrants: Vec<Entrant> = ["abc1", "abc2", "xyz"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let profile = Profile::new(*id, format!("{}@example.com", id));
                Entrant::new(EntrantId::from(*id), profile, i as u32 + 1, 0)
            })
            .collect();

        assert!(matches!(
            resolve_in(&entrants, &EntrantId::from("abc")),
            Err(Error::Ambiguous(_))
        ));
        assert_eq!(resolve_in(&entrants, &EntrantId::from("abc2")).unwrap().as_str(), "abc2");
        assert_eq!(resolve_in(&entrants, &EntrantId::from("xy")).unwrap().as_str(), "xyz");
        assert!(matches!(
            resolve_in(&entrants, &EntrantId::from("q")),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_moves_keep_positions_contiguous() {
        let (_dir, list) = waitlist(TargetPolicy::Clamp);
        let ids = admit_all(&list, &["A", "B", "C", "D", "E", "F"]).await;
        let list = Arc::new(list);

        let handles: Vec<_> = (0..24)
            .map(|i| {
                let list = Arc::clone(&list);
                let id = ids[i % ids.len()].clone();
                tokio::spawn(async move {
                    match i % 3 {
                        0 => list.move_to(&id, (i % 7) as i64 + 1).await,
                        1 => list.move_up(&id).await,
                        _ => list.move_down(&id).await,
                    }
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(list.len().unwrap(), 6);
        assert!(list.check().is_ok());
    }
}
