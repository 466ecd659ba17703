//! Handles to stored users.
//!
//! A [`User`] is a cheap reference into the account store. Every accessor
//! reads the live record under its lock; every mutator applies its change to
//! a draft copy, persists the draft and only then commits it, so a failed
//! write leaves the record exactly as it was.

use std::fmt;
use std::sync::{Arc, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use super::{Flag, Flags, Uid, UserError, UserRecord};
use crate::{
    Result,
    constants::{DEFAULT_SECTION, MAX_HOME_DIR_LEN, NO_GROUP_GID},
    credential::{self, CredentialHash},
    group::{Gid, Group, GroupError},
    mask::{AccessMask, MaskAdd},
    store::{
        StoreError, StoreInner,
        index::{RecordCell, RecordState},
    },
    validate,
};

/// A reference to one user in an [`crate::AccountStore`].
///
/// Cloning a handle is cheap; all clones observe the same record. Once the
/// user is deleted every operation fails with a not-found error.
#[derive(Clone)]
pub struct User {
    uid: Uid,
    cell: Arc<RecordCell>,
    store: Arc<StoreInner>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User").field("uid", &self.uid).finish()
    }
}

impl User {
    pub(crate) fn new(uid: Uid, cell: Arc<RecordCell>, store: Arc<StoreInner>) -> Self {
        Self { uid, cell, store }
    }

    fn lock_live(&self) -> Result<MutexGuard<'_, RecordState>> {
        let state = self.cell.lock();
        if state.deleted {
            return Err(StoreError::UserDeleted { uid: self.uid }.into());
        }
        Ok(state)
    }

    fn read<T>(&self, f: impl FnOnce(&UserRecord) -> T) -> Result<T> {
        Ok(f(&self.lock_live()?.record))
    }

    /// Apply `f` to a draft, persist it if anything changed, then commit.
    fn mutate<T>(&self, op: &str, f: impl FnOnce(&mut UserRecord) -> Result<T>) -> Result<T> {
        self.store.check_writable()?;
        let mut state = self.lock_live()?;
        let mut draft = state.record.clone();
        let out = f(&mut draft)?;
        if draft != state.record {
            self.store.persist_user(&draft)?;
            state.record = draft;
            debug!(uid = self.uid, op, "updated user");
        }
        Ok(out)
    }

    // === Identity ===

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn name(&self) -> Result<String> {
        self.read(|r| r.name.clone())
    }

    /// A snapshot of every field.
    pub fn record(&self) -> Result<UserRecord> {
        self.read(UserRecord::clone)
    }

    /// Rename the user. Renaming to the current name is a no-op.
    ///
    /// Fails with `NameAlreadyTaken` if another user holds (or is being
    /// created or renamed to) `new_name`.
    pub fn rename(&self, new_name: &str) -> Result<()> {
        self.store.check_writable()?;
        validate::check_name(new_name, self.store.config.max_name_len).map_err(|reason| {
            UserError::InvalidName {
                name: new_name.to_string(),
                reason,
            }
        })?;

        let mut state = self.lock_live()?;
        let old_name = state.record.name.clone();
        if old_name == new_name {
            return Ok(());
        }

        self.store.index_mut().reserve_name(new_name, self.uid)?;

        let mut draft = state.record.clone();
        draft.name = new_name.to_string();
        if let Err(e) = self.store.persist_user(&draft) {
            self.store.index_mut().release_name(new_name, self.uid);
            return Err(e);
        }
        state.record = draft;
        self.store
            .index_mut()
            .commit_rename(&old_name, new_name, self.uid);

        info!(uid = self.uid, from = %old_name, to = %new_name, "renamed user");
        Ok(())
    }

    // === Credentials ===

    /// Replace the password. Hashing happens before the record is locked.
    pub fn set_password(&self, password: &str) -> Result<()> {
        let hash = credential::hash(password)?;
        self.mutate("set_password", |r| {
            r.credential = Some(hash);
            Ok(())
        })
    }

    pub fn has_password(&self) -> Result<bool> {
        self.read(|r| r.credential.is_some())
    }

    /// Check a password. The record lock is released before hashing.
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        let stored: Option<CredentialHash> = self.read(|r| r.credential.clone())?;
        Ok(credential::verify_optional(stored.as_ref(), password))
    }

    // === IP masks ===

    pub fn ip_masks(&self) -> Result<Vec<String>> {
        self.read(|r| r.ip_masks.to_strings())
    }

    /// Add a mask.
    ///
    /// A mask covered by one already held (including an identical one)
    /// changes nothing. A broader mask replaces the held masks it covers,
    /// which are listed in the outcome.
    pub fn add_ip_mask(&self, mask: &str) -> Result<MaskAdd> {
        let mask = AccessMask::parse(mask)?;
        let limit = self.store.config.max_ip_masks;
        self.mutate("add_ip_mask", |r| Ok(r.ip_masks.add(mask, limit)?))
    }

    /// Remove a mask by exact match. Removing an absent mask succeeds and
    /// returns `false`.
    pub fn remove_ip_mask(&self, mask: &str) -> Result<bool> {
        self.mutate("remove_ip_mask", |r| Ok(r.ip_masks.remove(mask)))
    }

    /// Remove the mask at `index` in [`Self::ip_masks`] order, returning it.
    pub fn remove_ip_mask_at(&self, index: usize) -> Result<String> {
        self.mutate("remove_ip_mask_at", |r| {
            Ok(r.ip_masks.remove_at(index)?.to_string())
        })
    }

    /// Remove every mask in one mutation, returning what was removed.
    pub fn clear_ip_masks(&self) -> Result<Vec<String>> {
        self.mutate("clear_ip_masks", |r| {
            Ok(r.ip_masks.clear().iter().map(ToString::to_string).collect())
        })
    }

    /// Does any of this user's masks admit `address` (`ip` or `ident@ip`)?
    pub fn matches_address(&self, address: &str) -> Result<bool> {
        self.read(|r| r.ip_masks.matches(address))
    }

    // === Groups ===

    pub fn primary_gid(&self) -> Result<Gid> {
        self.read(|r| r.primary_gid)
    }

    pub fn secondary_gids(&self) -> Result<Vec<Gid>> {
        self.read(|r| r.secondary_gids.clone())
    }

    pub fn primary_group(&self) -> Result<Group> {
        let gid = self.primary_gid()?;
        self.store.groups.resolve(gid)
    }

    pub fn secondary_groups(&self) -> Result<Vec<Group>> {
        self.secondary_gids()?
            .into_iter()
            .map(|gid| self.store.groups.resolve(gid))
            .collect()
    }

    /// Replace the primary group.
    ///
    /// A gid currently held as a secondary membership is promoted: it leaves
    /// the secondary set in the same mutation. The former primary is not
    /// added to the secondary set.
    pub fn set_primary_group(&self, gid: Gid) -> Result<()> {
        self.store.check_writable()?;
        let mut state = self.lock_live()?;
        let old = state.record.primary_gid;
        if old == gid {
            return Ok(());
        }

        self.store.groups.pin_primary(gid, self.uid)?;

        let mut draft = state.record.clone();
        draft.primary_gid = gid;
        let promoted = draft.secondary_gids.contains(&gid);
        draft.secondary_gids.retain(|g| *g != gid);

        if let Err(e) = self.store.persist_user(&draft) {
            self.store.groups.unpin_primary(gid, self.uid);
            return Err(e);
        }
        state.record = draft;
        self.store.groups.unpin_primary(old, self.uid);
        if promoted {
            self.store.groups.unpin_secondary(&[gid], self.uid);
        }

        debug!(uid = self.uid, from = old, to = gid, promoted, "changed primary group");
        Ok(())
    }

    /// Add secondary memberships, returning the gids actually added.
    ///
    /// Gids already held (as primary or secondary) are skipped. If any gid is
    /// unknown nothing is added and `UnknownGroup` is returned.
    pub fn add_secondary_groups(&self, gids: &[Gid]) -> Result<Vec<Gid>> {
        self.store.check_writable()?;
        reject_none(gids)?;
        for gid in gids {
            self.store.groups.resolve(*gid)?;
        }
        let mut state = self.lock_live()?;

        let mut added: Vec<Gid> = Vec::new();
        for gid in gids {
            if *gid != state.record.primary_gid
                && !state.record.secondary_gids.contains(gid)
                && !added.contains(gid)
            {
                added.push(*gid);
            }
        }
        if added.is_empty() {
            return Ok(added);
        }

        self.store.groups.pin_secondary(&added, self.uid)?;

        let mut draft = state.record.clone();
        draft.secondary_gids.extend(added.iter().copied());
        if let Err(e) = self.store.persist_user(&draft) {
            self.store.groups.unpin_secondary(&added, self.uid);
            return Err(e);
        }
        state.record = draft;

        debug!(uid = self.uid, ?added, "added secondary groups");
        Ok(added)
    }

    /// Drop secondary memberships, returning the gids actually removed.
    /// Gids the user does not hold are ignored.
    pub fn remove_secondary_groups(&self, gids: &[Gid]) -> Result<Vec<Gid>> {
        self.store.check_writable()?;
        let mut state = self.lock_live()?;

        let removed: Vec<Gid> = state
            .record
            .secondary_gids
            .iter()
            .copied()
            .filter(|g| gids.contains(g))
            .collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        let mut draft = state.record.clone();
        draft.secondary_gids.retain(|g| !removed.contains(g));
        self.store.persist_user(&draft)?;
        state.record = draft;
        self.store.groups.unpin_secondary(&removed, self.uid);

        debug!(uid = self.uid, ?removed, "removed secondary groups");
        Ok(removed)
    }

    /// Replace every membership: the first gid becomes the primary group and
    /// the rest secondary. An empty list leaves only the "none" primary.
    ///
    /// Repeated gids count once. If any gid is unknown (or is "none") nothing
    /// changes and `UnknownGroup` is returned.
    pub fn set_gids(&self, gids: &[Gid]) -> Result<()> {
        reject_none(gids)?;
        let mut ordered: Vec<Gid> = Vec::with_capacity(gids.len());
        for gid in gids {
            if !ordered.contains(gid) {
                ordered.push(*gid);
            }
        }
        self.store.check_writable()?;
        let state = self.lock_live()?;
        self.replace_groups(state, "set_gids", ordered)
    }

    /// Flip membership of each gid: held groups are dropped and the others
    /// appended. The first remaining group becomes primary, the rest secondary.
    pub fn toggle_gids(&self, gids: &[Gid]) -> Result<()> {
        reject_none(gids)?;
        self.store.check_writable()?;
        let state = self.lock_live()?;

        let current: Vec<Gid> = std::iter::once(state.record.primary_gid)
            .filter(|gid| *gid != NO_GROUP_GID)
            .chain(state.record.secondary_gids.iter().copied())
            .collect();
        let mut next: Vec<Gid> = current
            .iter()
            .copied()
            .filter(|gid| !gids.contains(gid))
            .collect();
        for gid in gids {
            if !current.contains(gid) && !next.contains(gid) {
                next.push(*gid);
            }
        }
        self.replace_groups(state, "toggle_gids", next)
    }

    /// Persist a new primary/secondary split, pinning new references first
    /// and unpinning dropped ones after the write.
    fn replace_groups(
        &self,
        mut state: MutexGuard<'_, RecordState>,
        op: &str,
        gids: Vec<Gid>,
    ) -> Result<()> {
        let (primary, secondary) = match gids.split_first() {
            Some((first, rest)) => (*first, rest.to_vec()),
            None => (NO_GROUP_GID, Vec::new()),
        };
        let old_primary = state.record.primary_gid;
        if primary == old_primary && secondary == state.record.secondary_gids {
            return Ok(());
        }

        let groups = &self.store.groups;
        let primary_changed = primary != old_primary;
        let added: Vec<Gid> = secondary
            .iter()
            .copied()
            .filter(|gid| !state.record.secondary_gids.contains(gid))
            .collect();
        if primary_changed {
            groups.pin_primary(primary, self.uid)?;
        }
        let pinned = groups.pin_secondary(&added, self.uid);
        if let Err(e) = pinned {
            if primary_changed {
                groups.unpin_primary(primary, self.uid);
            }
            return Err(e);
        }

        let mut draft = state.record.clone();
        draft.primary_gid = primary;
        draft.secondary_gids = secondary;
        if let Err(e) = self.store.persist_user(&draft) {
            if primary_changed {
                groups.unpin_primary(primary, self.uid);
            }
            groups.unpin_secondary(&added, self.uid);
            return Err(e);
        }

        let dropped: Vec<Gid> = state
            .record
            .secondary_gids
            .iter()
            .copied()
            .filter(|gid| !draft.secondary_gids.contains(gid))
            .collect();
        state.record = draft;
        if primary_changed {
            groups.unpin_primary(old_primary, self.uid);
        }
        groups.unpin_secondary(&dropped, self.uid);

        debug!(uid = self.uid, op, primary, "replaced group memberships");
        Ok(())
    }

    // === Group administration ===

    pub fn gadmin_gids(&self) -> Result<Vec<Gid>> {
        self.read(|r| r.gadmin_gids.clone())
    }

    pub fn has_gadmin_gid(&self, gid: Gid) -> Result<bool> {
        self.read(|r| r.gadmin_gids.binary_search(&gid).is_ok())
    }

    /// Make the user an administrator of a group. Also sets the gadmin flag.
    pub fn add_gadmin_gid(&self, gid: Gid) -> Result<()> {
        self.update_gadmin(gid, |_| true).map(drop)
    }

    /// Stop administering a group. The gadmin flag goes with the last one.
    pub fn del_gadmin_gid(&self, gid: Gid) -> Result<()> {
        self.update_gadmin(gid, |_| false).map(drop)
    }

    /// Flip administration of a group, returning whether it is now administered.
    pub fn toggle_gadmin_gid(&self, gid: Gid) -> Result<bool> {
        self.update_gadmin(gid, |held| !held)
    }

    fn update_gadmin(&self, gid: Gid, wanted: impl FnOnce(bool) -> bool) -> Result<bool> {
        self.store.check_writable()?;
        let mut state = self.lock_live()?;
        let position = state.record.gadmin_gids.binary_search(&gid);
        let held = position.is_ok();
        let want = wanted(held);
        if want == held {
            return Ok(held);
        }

        let mut draft = state.record.clone();
        match position {
            Err(pos) => {
                self.store.groups.pin_gadmin(gid, self.uid)?;
                draft.gadmin_gids.insert(pos, gid);
                draft.flags.insert(Flag::Gadmin);
            }
            Ok(pos) => {
                draft.gadmin_gids.remove(pos);
                if draft.gadmin_gids.is_empty() {
                    draft.flags.remove(Flag::Gadmin);
                }
            }
        }

        if let Err(e) = self.store.persist_user(&draft) {
            if want {
                self.store.groups.unpin_gadmin(&[gid], self.uid);
            }
            return Err(e);
        }
        state.record = draft;
        if !want {
            self.store.groups.unpin_gadmin(&[gid], self.uid);
        }

        debug!(uid = self.uid, gid, administers = want, "changed group administration");
        Ok(want)
    }

    // === Credits ===

    pub fn get_default_credits(&self) -> Result<u64> {
        self.read(|r| r.credits.get_default())
    }

    /// Apply a signed delta to the default balance, returning the new balance.
    pub fn incr_default_credits(&self, delta: i64) -> Result<u64> {
        self.mutate("incr_default_credits", |r| Ok(r.credits.incr_default(delta)?))
    }

    pub fn get_section_credits(&self, section: &str) -> Result<u64> {
        self.read(|r| r.credits.get_section(section))
    }

    pub fn incr_section_credits(&self, section: &str, delta: i64) -> Result<u64> {
        self.mutate("incr_section_credits", |r| {
            Ok(r.credits.incr_section(section, delta)?)
        })
    }

    /// Take up to `amount` from the default balance; returns the amount taken.
    pub fn take_default_credits_saturating(&self, amount: u64) -> Result<u64> {
        self.mutate("take_default_credits", |r| {
            Ok(r.credits.take_default_saturating(amount))
        })
    }

    pub fn take_section_credits_saturating(&self, section: &str, amount: u64) -> Result<u64> {
        self.mutate("take_section_credits", |r| {
            Ok(r.credits.take_section_saturating(section, amount))
        })
    }

    /// Named section balances, ordered by section name.
    pub fn section_credits(&self) -> Result<Vec<(String, u64)>> {
        self.read(|r| {
            r.credits
                .sections()
                .map(|(name, balance)| (name.to_string(), balance))
                .collect()
        })
    }

    // === Ratios and allotments ===

    pub fn default_ratio(&self) -> Result<u32> {
        self.read(|r| r.ratios.default_ratio())
    }

    pub fn set_default_ratio(&self, ratio: u32) -> Result<()> {
        self.set_section_ratio(DEFAULT_SECTION, ratio)
    }

    /// The ratio set for a section, or None when it inherits the default.
    pub fn section_ratio(&self, section: &str) -> Result<Option<u32>> {
        self.read(|r| r.ratios.section(section))
    }

    /// The ratio charged in a section after falling back to the default.
    pub fn effective_ratio(&self, section: &str) -> Result<u32> {
        self.read(|r| r.ratios.effective(section))
    }

    pub fn set_section_ratio(&self, section: &str, ratio: u32) -> Result<()> {
        self.mutate("set_section_ratio", |r| {
            r.ratios.set(section, ratio);
            Ok(())
        })
    }

    /// Make a section inherit the default ratio again.
    pub fn clear_section_ratio(&self, section: &str) -> Result<bool> {
        self.mutate("clear_section_ratio", |r| Ok(r.ratios.clear(section)))
    }

    /// Sections with their own ratio, ordered by name.
    pub fn section_ratios(&self) -> Result<Vec<(String, u32)>> {
        self.read(|r| {
            r.ratios
                .sections()
                .map(|(name, ratio)| (name.to_string(), ratio))
                .collect()
        })
    }

    pub fn default_allotment(&self) -> Result<u64> {
        self.read(|r| r.allotments.default_allotment())
    }

    pub fn set_default_allotment(&self, amount: u64) -> Result<()> {
        self.set_section_allotment(DEFAULT_SECTION, amount)
    }

    pub fn section_allotment(&self, section: &str) -> Result<u64> {
        self.read(|r| r.allotments.section(section))
    }

    /// Set a weekly allotment; 0 removes a section's entry.
    pub fn set_section_allotment(&self, section: &str, amount: u64) -> Result<()> {
        self.mutate("set_section_allotment", |r| {
            r.allotments.set(section, amount);
            Ok(())
        })
    }

    pub fn section_allotments(&self) -> Result<Vec<(String, u64)>> {
        self.read(|r| {
            r.allotments
                .sections()
                .map(|(name, amount)| (name.to_string(), amount))
                .collect()
        })
    }

    // === Free text ===

    pub fn tagline(&self) -> Result<String> {
        self.read(|r| r.tagline.clone())
    }

    pub fn set_tagline(&self, tagline: &str) -> Result<()> {
        validate::check_text(tagline, self.store.config.max_tagline_len)
            .map_err(|reason| UserError::InvalidTagline { reason })?;
        self.mutate("set_tagline", |r| {
            r.tagline = tagline.to_string();
            Ok(())
        })
    }

    pub fn comment(&self) -> Result<String> {
        self.read(|r| r.comment.clone())
    }

    pub fn set_comment(&self, comment: &str) -> Result<()> {
        validate::check_text(comment, self.store.config.max_tagline_len)
            .map_err(|reason| UserError::InvalidComment { reason })?;
        self.mutate("set_comment", |r| {
            r.comment = comment.to_string();
            Ok(())
        })
    }

    // === Account limits ===

    pub fn home_dir(&self) -> Result<String> {
        self.read(|r| r.home_dir.clone())
    }

    pub fn set_home_dir(&self, path: &str) -> Result<()> {
        validate::check_home_dir(path, MAX_HOME_DIR_LEN).map_err(|reason| {
            UserError::InvalidHomeDir {
                path: path.to_string(),
                reason,
            }
        })?;
        self.mutate("set_home_dir", |r| {
            r.home_dir = path.to_string();
            Ok(())
        })
    }

    /// Idle timeout in seconds; None means the server default applies.
    pub fn idle_time(&self) -> Result<Option<u32>> {
        self.read(|r| r.idle_time)
    }

    pub fn set_idle_time(&self, seconds: Option<u32>) -> Result<()> {
        self.mutate("set_idle_time", |r| {
            r.idle_time = seconds;
            Ok(())
        })
    }

    pub fn expires(&self) -> Result<Option<NaiveDate>> {
        self.read(|r| r.expires)
    }

    pub fn set_expires(&self, date: Option<NaiveDate>) -> Result<()> {
        self.mutate("set_expires", |r| {
            r.expires = date;
            Ok(())
        })
    }

    /// True from the expiry date onwards, judged by the store clock in UTC.
    pub fn expired(&self) -> Result<bool> {
        let today = self.store.clock.now().date_naive();
        self.read(|r| r.expires.is_some_and(|date| today >= date))
    }

    /// Simultaneous logins allowed; None is unlimited.
    pub fn num_logins(&self) -> Result<Option<u32>> {
        self.read(|r| r.num_logins)
    }

    pub fn set_num_logins(&self, limit: Option<u32>) -> Result<()> {
        self.mutate("set_num_logins", |r| {
            r.num_logins = limit;
            Ok(())
        })
    }

    // === Flags ===

    pub fn flags(&self) -> Result<Flags> {
        self.read(|r| r.flags.clone())
    }

    pub fn set_flags(&self, flags: &str) -> Result<()> {
        let flags = Flags::parse(flags)?;
        self.mutate("set_flags", |r| {
            r.flags = flags;
            Ok(())
        })
    }

    pub fn add_flags(&self, flags: &str) -> Result<()> {
        let flags = Flags::parse(flags)?;
        self.mutate("add_flags", |r| {
            r.flags.insert_all(&flags);
            Ok(())
        })
    }

    pub fn del_flags(&self, flags: &str) -> Result<()> {
        let flags = Flags::parse(flags)?;
        self.mutate("del_flags", |r| {
            r.flags.remove_all(&flags);
            Ok(())
        })
    }

    pub fn has_flag(&self, flag: Flag) -> Result<bool> {
        self.read(|r| r.flags.contains(flag))
    }

    pub fn has_any_flag(&self, flags: &str) -> Result<bool> {
        let flags = Flags::parse(flags)?;
        self.read(|r| r.flags.contains_any(&flags))
    }

    // === Timestamps ===

    pub fn created(&self) -> Result<DateTime<Utc>> {
        self.read(|r| r.created)
    }

    /// None until the first recorded login.
    pub fn last_login(&self) -> Result<Option<DateTime<Utc>>> {
        self.read(|r| r.last_login)
    }

    /// Successful logins recorded so far.
    pub fn login_count(&self) -> Result<u64> {
        self.read(|r| r.login_count)
    }

    pub fn creator(&self) -> Result<Option<Uid>> {
        self.read(|r| r.creator)
    }

    /// Record a successful login, returning the stored timestamp.
    ///
    /// The timestamp is never earlier than the creation time.
    pub fn record_login(&self) -> Result<DateTime<Utc>> {
        let now = self.store.clock.now();
        self.mutate("record_login", |r| {
            let at = now.max(r.created);
            r.last_login = Some(at);
            r.login_count = r.login_count.saturating_add(1);
            Ok(at)
        })
    }
}

fn reject_none(gids: &[Gid]) -> Result<()> {
    if gids.contains(&NO_GROUP_GID) {
        return Err(GroupError::UnknownGroup { gid: NO_GROUP_GID }.into());
    }
    Ok(())
}
