//! The group registry and its membership index.
//!
//! Membership changes follow a pin/commit protocol driven by the account
//! store: before a user record referencing a gid is persisted the store pins
//! the uid under that gid (which fails if the gid is unknown), and after the
//! record write it unpins whatever the user no longer references. A group
//! with pinned members cannot be deleted, so a concurrent delete can never
//! leave a freshly persisted record pointing at a missing group.
//!
//! Registry changes that must be persisted (create, delete, rename) hold the
//! registry write lock across the `persist` callback, so the groups file is
//! written by one caller at a time and always reflects a registry state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Gid, Group, GroupError};
use crate::{
    Result,
    constants::NO_GROUP_GID,
    user::{Uid, UserRecord},
};

/// Uids referencing a group, as recorded by the membership index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembers {
    pub primary: Vec<Uid>,
    pub secondary: Vec<Uid>,
    /// Users administering the group, whether or not they are members
    pub gadmins: Vec<Uid>,
}

impl GroupMembers {
    /// Number of references, counting a user once per role.
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len() + self.gadmins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Primary and secondary members, ascending.
    pub fn member_uids(&self) -> Vec<Uid> {
        let mut uids: Vec<Uid> = self.primary.iter().chain(&self.secondary).copied().collect();
        uids.sort_unstable();
        uids.dedup();
        uids
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    by_gid: BTreeMap<Gid, Group>,
    by_name: HashMap<String, Gid>,
    primary: HashMap<Gid, BTreeSet<Uid>>,
    secondary: HashMap<Gid, BTreeSet<Uid>>,
    gadmin: HashMap<Gid, BTreeSet<Uid>>,
}

impl RegistryState {
    fn insert(&mut self, group: Group) {
        self.by_name.insert(group.name.clone(), group.gid);
        self.by_gid.insert(group.gid, group);
    }

    fn member_count(&self, gid: Gid) -> usize {
        [&self.primary, &self.secondary, &self.gadmin]
            .iter()
            .map(|index| index.get(&gid).map_or(0, BTreeSet::len))
            .sum()
    }

    /// All persisted groups (the built-in entry is implicit).
    fn persisted(&self) -> Vec<Group> {
        self.by_gid
            .values()
            .filter(|g| !g.is_none())
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct GroupRegistry {
    state: RwLock<RegistryState>,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// An empty registry holding only the built-in "none" group.
    pub fn new() -> Self {
        let mut state = RegistryState::default();
        state.insert(Group::none());
        Self {
            state: RwLock::new(state),
        }
    }

    /// Build a registry from persisted groups.
    ///
    /// Fails if two groups share a gid or a name, or a group claims the
    /// reserved gid.
    pub fn from_groups(groups: impl IntoIterator<Item = Group>) -> Result<Self> {
        let registry = Self::new();
        {
            let mut state = registry.write();
            for group in groups {
                if group.gid == NO_GROUP_GID {
                    return Err(GroupError::ReservedGroup { gid: group.gid }.into());
                }
                if state.by_gid.contains_key(&group.gid) {
                    return Err(GroupError::GidTaken { gid: group.gid }.into());
                }
                if state.by_name.contains_key(&group.name) {
                    return Err(GroupError::GroupNameTaken { name: group.name }.into());
                }
                state.insert(group);
            }
        }
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, gid: Gid) -> Option<Group> {
        self.read().by_gid.get(&gid).cloned()
    }

    /// Look up a group, failing with `UnknownGroup`.
    pub fn resolve(&self, gid: Gid) -> Result<Group> {
        self.get(gid)
            .ok_or_else(|| GroupError::UnknownGroup { gid }.into())
    }

    pub fn by_name(&self, name: &str) -> Option<Group> {
        let state = self.read();
        state
            .by_name
            .get(name)
            .and_then(|gid| state.by_gid.get(gid))
            .cloned()
    }

    pub fn contains(&self, gid: Gid) -> bool {
        self.read().by_gid.contains_key(&gid)
    }

    /// All groups ordered by gid, including the built-in entry.
    pub fn all(&self) -> Vec<Group> {
        self.read().by_gid.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().by_gid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the highest gid in use.
    pub fn next_free_gid(&self) -> Option<Gid> {
        self.read()
            .by_gid
            .keys()
            .next_back()
            .map_or(Some(NO_GROUP_GID + 1), |gid| gid.checked_add(1))
    }

    pub fn members(&self, gid: Gid) -> Result<GroupMembers> {
        let state = self.read();
        if !state.by_gid.contains_key(&gid) {
            return Err(GroupError::UnknownGroup { gid }.into());
        }
        let collect = |index: &HashMap<Gid, BTreeSet<Uid>>| {
            index
                .get(&gid)
                .map(|uids| uids.iter().copied().collect())
                .unwrap_or_default()
        };
        Ok(GroupMembers {
            primary: collect(&state.primary),
            secondary: collect(&state.secondary),
            gadmins: collect(&state.gadmin),
        })
    }

    // === Membership index ===

    /// Record a loaded user's group references without validation.
    pub(crate) fn index_user(&self, record: &UserRecord) {
        let mut state = self.write();
        let uid = record.uid;
        state.primary.entry(record.primary_gid).or_default().insert(uid);
        for gid in &record.secondary_gids {
            state.secondary.entry(*gid).or_default().insert(uid);
        }
        for gid in &record.gadmin_gids {
            state.gadmin.entry(*gid).or_default().insert(uid);
        }
    }

    /// Drop every group reference of a deleted user.
    pub(crate) fn unindex_user(&self, record: &UserRecord) {
        self.unpin_primary(record.primary_gid, record.uid);
        self.unpin_secondary(&record.secondary_gids, record.uid);
        self.unpin_gadmin(&record.gadmin_gids, record.uid);
    }

    pub(crate) fn pin_primary(&self, gid: Gid, uid: Uid) -> Result<()> {
        let mut state = self.write();
        if !state.by_gid.contains_key(&gid) {
            return Err(GroupError::UnknownGroup { gid }.into());
        }
        state.primary.entry(gid).or_default().insert(uid);
        Ok(())
    }

    pub(crate) fn unpin_primary(&self, gid: Gid, uid: Uid) {
        unpin(&mut self.write().primary, &[gid], uid);
    }

    /// Pin all of `gids` or none of them.
    ///
    /// The "none" sentinel is not a valid secondary group.
    pub(crate) fn pin_secondary(&self, gids: &[Gid], uid: Uid) -> Result<()> {
        let mut state = self.write();
        if let Some(&gid) = gids
            .iter()
            .find(|gid| **gid == NO_GROUP_GID || !state.by_gid.contains_key(gid))
        {
            return Err(GroupError::UnknownGroup { gid }.into());
        }
        for gid in gids {
            state.secondary.entry(*gid).or_default().insert(uid);
        }
        Ok(())
    }

    pub(crate) fn unpin_secondary(&self, gids: &[Gid], uid: Uid) {
        unpin(&mut self.write().secondary, gids, uid);
    }

    /// Pin an administered group. The "none" sentinel cannot be administered.
    pub(crate) fn pin_gadmin(&self, gid: Gid, uid: Uid) -> Result<()> {
        let mut state = self.write();
        if gid == NO_GROUP_GID || !state.by_gid.contains_key(&gid) {
            return Err(GroupError::UnknownGroup { gid }.into());
        }
        state.gadmin.entry(gid).or_default().insert(uid);
        Ok(())
    }

    pub(crate) fn unpin_gadmin(&self, gids: &[Gid], uid: Uid) {
        unpin(&mut self.write().gadmin, gids, uid);
    }

    // === Administration ===

    pub(crate) fn create(
        &self,
        group: Group,
        persist: impl FnOnce(&[Group]) -> Result<()>,
    ) -> Result<Group> {
        let mut state = self.write();
        if state.by_gid.contains_key(&group.gid) {
            return Err(GroupError::GidTaken { gid: group.gid }.into());
        }
        if state.by_name.contains_key(&group.name) {
            return Err(GroupError::GroupNameTaken { name: group.name }.into());
        }

        let mut snapshot = state.persisted();
        snapshot.push(group.clone());
        persist(&snapshot)?;

        state.insert(group.clone());
        Ok(group)
    }

    pub(crate) fn delete(
        &self,
        gid: Gid,
        persist: impl FnOnce(&[Group]) -> Result<()>,
    ) -> Result<Group> {
        let mut state = self.write();
        if gid == NO_GROUP_GID {
            return Err(GroupError::ReservedGroup { gid }.into());
        }
        let Some(group) = state.by_gid.get(&gid).cloned() else {
            return Err(GroupError::UnknownGroup { gid }.into());
        };
        let members = state.member_count(gid);
        if members > 0 {
            return Err(GroupError::GroupInUse { gid, members }.into());
        }

        let snapshot: Vec<Group> = state
            .persisted()
            .into_iter()
            .filter(|g| g.gid != gid)
            .collect();
        persist(&snapshot)?;

        state.by_gid.remove(&gid);
        state.by_name.remove(&group.name);
        Ok(group)
    }

    /// Replace a group's name and description in one persisted step.
    pub(crate) fn update(
        &self,
        gid: Gid,
        edit: impl FnOnce(&mut Group),
        persist: impl FnOnce(&[Group]) -> Result<()>,
    ) -> Result<Group> {
        let mut state = self.write();
        if gid == NO_GROUP_GID {
            return Err(GroupError::ReservedGroup { gid }.into());
        }
        let Some(current) = state.by_gid.get(&gid).cloned() else {
            return Err(GroupError::UnknownGroup { gid }.into());
        };

        let mut draft = current.clone();
        edit(&mut draft);
        draft.gid = gid;
        if draft == current {
            return Ok(current);
        }
        if draft.name != current.name && state.by_name.contains_key(&draft.name) {
            return Err(GroupError::GroupNameTaken { name: draft.name }.into());
        }

        let snapshot: Vec<Group> = state
            .persisted()
            .into_iter()
            .map(|g| if g.gid == gid { draft.clone() } else { g })
            .collect();
        persist(&snapshot)?;

        state.by_name.remove(&current.name);
        state.insert(draft.clone());
        Ok(draft)
    }
}

fn unpin(index: &mut HashMap<Gid, BTreeSet<Uid>>, gids: &[Gid], uid: Uid) {
    for gid in gids {
        if let Some(uids) = index.get_mut(gid) {
            uids.remove(&uid);
            if uids.is_empty() {
                index.remove(gid);
            }
        }
    }
}
