//! The account store
//!
//! [`AccountStore`] is the authoritative collection of users and the group
//! registry. It is `Send + Sync` and cheap to clone; every clone shares the
//! same state.
//!
//! ## Locking
//!
//! - each user record has its own mutex, so operations on different users
//!   never wait on each other;
//! - the name/uid index is an `RwLock` that create, rename and delete take
//!   only briefly, holding *reservations* while the record is persisted;
//! - the group registry has its own `RwLock`.
//!
//! Lock order is record, then index or registry. The index and registry
//! locks are never held together, and neither is held across a record write.
//!
//! ## Degraded mode
//!
//! If the persisted state cannot be indexed consistently (an unreadable group
//! registry, or two records claiming the same name or uid) the store still
//! serves reads but refuses every mutation with `IndexCorrupt`. A single
//! undecodable record only makes that uid unavailable.

pub mod errors;
pub(crate) mod index;
mod iter;

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info, warn};

pub use errors::{Identity, StoreError};
pub use iter::Users;

use self::index::{Index, RecordCell};
use crate::{
    Clock, Result, StoreConfig, SystemClock,
    backend::{Backend, FileBackend, InMemory, LoadedRecord},
    credential::{self, CredentialError},
    group::{Gid, Group, GroupError, GroupMembers, GroupRegistry},
    mask::wildcard_match,
    user::{Flag, Uid, User, UserError, UserRecord},
    validate,
};

/// State shared by the store and every [`User`] handle.
#[derive(Debug)]
pub(crate) struct StoreInner {
    pub backend: Box<dyn Backend>,
    pub config: StoreConfig,
    pub clock: Arc<dyn Clock>,
    pub groups: GroupRegistry,
    index: RwLock<Index>,
    degraded: Option<String>,
}

impl StoreInner {
    pub fn index(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn index_mut(&self) -> RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check_writable(&self) -> Result<()> {
        match &self.degraded {
            Some(reason) => Err(StoreError::IndexCorrupt {
                reason: reason.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    pub fn persist_user(&self, record: &UserRecord) -> Result<()> {
        self.backend.save_user(record).inspect_err(|e| {
            error!(uid = record.uid, error = %e, "failed to persist user record");
        })
    }

    fn persist_groups(&self, groups: &[Group]) -> Result<()> {
        self.backend.save_groups(groups).inspect_err(|e| {
            error!(error = %e, "failed to persist group registry");
        })
    }
}

/// A concurrent, durable store of user accounts.
#[derive(Debug, Clone)]
pub struct AccountStore {
    inner: Arc<StoreInner>,
}

impl AccountStore {
    // === Opening ===

    /// Open a store over `backend` with default limits and the system clock.
    pub fn open(backend: impl Backend) -> Result<Self> {
        Self::open_with(backend, StoreConfig::default(), Arc::new(SystemClock))
    }

    /// Open a store over a data directory, creating it if needed.
    pub fn open_dir(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(FileBackend::open(path)?)
    }

    /// Open a store over a data directory with explicit limits.
    pub fn open_dir_with(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::open_with(FileBackend::open(path)?, config, Arc::new(SystemClock))
    }

    /// An empty store that keeps everything in memory.
    pub fn in_memory() -> Result<Self> {
        Self::open(InMemory::new())
    }

    /// Open a store, loading every persisted record.
    pub fn open_with(
        backend: impl Backend,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut problems: Vec<String> = Vec::new();

        let groups = match backend.load_groups() {
            Ok(Some(groups)) => GroupRegistry::from_groups(groups).unwrap_or_else(|e| {
                problems.push(format!("group registry: {e}"));
                GroupRegistry::new()
            }),
            Ok(None) => GroupRegistry::new(),
            Err(e) if e.is_corruption() => {
                problems.push(e.to_string());
                GroupRegistry::new()
            }
            Err(e) => return Err(e),
        };

        let mut index = Index::default();
        for loaded in backend.load_users()? {
            match loaded {
                LoadedRecord::Valid(record) => match index.insert_loaded(&record) {
                    Ok(_) => {
                        let dangling: Vec<Gid> = std::iter::once(record.primary_gid)
                            .chain(record.secondary_gids.iter().copied())
                            .chain(record.gadmin_gids.iter().copied())
                            .filter(|gid| !groups.contains(*gid))
                            .collect();
                        if !dangling.is_empty() {
                            warn!(uid = record.uid, ?dangling, "user references unknown groups");
                        }
                        if record.ip_masks.len() > config.max_ip_masks {
                            warn!(
                                uid = record.uid,
                                masks = record.ip_masks.len(),
                                limit = config.max_ip_masks,
                                "user holds more ip masks than allowed"
                            );
                        }
                        groups.index_user(&record);
                    }
                    Err(problem) => problems.push(problem),
                },
                LoadedRecord::Corrupt {
                    uid: Some(uid),
                    location,
                    reason,
                } => {
                    warn!(uid, %location, %reason, "skipping corrupt user record");
                    if let Err(problem) = index.insert_corrupt(uid, reason) {
                        problems.push(problem);
                    }
                }
                LoadedRecord::Corrupt {
                    uid: None,
                    location,
                    reason,
                } => {
                    warn!(%location, %reason, "skipping unidentifiable user record");
                }
            }
        }

        let degraded = if problems.is_empty() {
            None
        } else {
            let reason = problems.join("; ");
            warn!(%reason, "account index is inconsistent; store is read-only");
            Some(reason)
        };

        info!(
            users = index.live_count(),
            groups = groups.len(),
            degraded = degraded.is_some(),
            "opened account store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                config,
                clock,
                groups,
                index: RwLock::new(index),
                degraded,
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    /// True if the store refused to accept mutations at open.
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.is_some()
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        self.inner.degraded.as_deref()
    }

    // === Creation and deletion ===

    fn check_new_name(&self, name: &str) -> Result<()> {
        validate::check_name(name, self.inner.config.max_name_len).map_err(|reason| {
            UserError::InvalidName {
                name: name.to_string(),
                reason,
            }
            .into()
        })
    }

    /// Create a user with no groups, masks or credits.
    ///
    /// Fails with `DuplicateIdentity` if the name or uid is in use.
    pub fn create(&self, name: &str, uid: Uid, password: Option<&str>) -> Result<User> {
        self.inner.check_writable()?;
        self.check_new_name(name)?;
        let credential = password.map(credential::hash).transpose()?;

        let mut record = UserRecord::new(uid, name, self.inner.clock.now());
        record.credential = credential;
        self.insert(record)
    }

    /// Create a user whose masks, groups, flags, credits, ratios, allotments,
    /// account limits, tagline and comment are copied from `template`.
    ///
    /// Group administration is not copied.
    pub fn create_from_template(
        &self,
        template: &str,
        name: &str,
        uid: Uid,
        password: Option<&str>,
        creator: Option<Uid>,
    ) -> Result<User> {
        self.inner.check_writable()?;
        self.check_new_name(name)?;
        let template = self.load_by_name(template)?.record()?;
        let credential = password.map(credential::hash).transpose()?;

        let mut record = UserRecord::new(uid, name, self.inner.clock.now());
        record.credential = credential;
        record.ip_masks = template.ip_masks;
        record.primary_gid = template.primary_gid;
        record.secondary_gids = template.secondary_gids;
        record.credits = template.credits;
        record.ratios = template.ratios;
        record.allotments = template.allotments;
        record.home_dir = template.home_dir;
        record.idle_time = template.idle_time;
        record.expires = template.expires;
        record.num_logins = template.num_logins;
        record.flags = template.flags;
        record.flags.remove(Flag::Gadmin);
        record.tagline = template.tagline;
        record.comment = template.comment;
        record.creator = creator;
        self.insert(record)
    }

    fn insert(&self, record: UserRecord) -> Result<User> {
        let inner = &self.inner;
        let (uid, name) = (record.uid, record.name.clone());

        inner.index_mut().reserve_identity(&name, uid)?;

        let pinned = inner
            .groups
            .pin_primary(record.primary_gid, uid)
            .and_then(|()| {
                inner
                    .groups
                    .pin_secondary(&record.secondary_gids, uid)
                    .inspect_err(|_| inner.groups.unpin_primary(record.primary_gid, uid))
            });
        if let Err(e) = pinned {
            inner.index_mut().release_identity(&name, uid);
            return Err(e);
        }

        if let Err(e) = inner.persist_user(&record) {
            inner.groups.unindex_user(&record);
            inner.index_mut().release_identity(&name, uid);
            return Err(e);
        }

        let cell = RecordCell::new(record);
        inner.index_mut().commit_identity(&name, uid, Arc::clone(&cell));
        info!(uid, %name, "created user");
        Ok(User::new(uid, cell, Arc::clone(inner)))
    }

    /// Delete a user and drop its group memberships.
    ///
    /// A uid whose record is corrupt can be deleted too; this removes the
    /// undecodable document.
    pub fn delete(&self, uid: Uid) -> Result<()> {
        self.inner.check_writable()?;
        let lookup = self.inner.index().cell(uid);
        let cell = match lookup {
            Ok(cell) => cell,
            Err(StoreError::CorruptRecord { .. }) => {
                self.inner.backend.remove_user(uid)?;
                self.inner.index_mut().remove(None, uid);
                info!(uid, "removed corrupt user record");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut state = cell.lock();
        if state.deleted {
            return Err(StoreError::UidNotFound { uid }.into());
        }
        self.inner.backend.remove_user(uid).inspect_err(|e| {
            error!(uid, error = %e, "failed to remove user record");
        })?;
        state.deleted = true;

        let record = &state.record;
        self.inner.index_mut().remove(Some(&record.name), uid);
        self.inner.groups.unindex_user(record);
        info!(uid, name = %record.name, "deleted user");
        Ok(())
    }

    // === Lookup ===

    pub fn load_by_name(&self, name: &str) -> Result<User> {
        let index = self.inner.index();
        let uid = index
            .uid_for_name(name)
            .ok_or_else(|| StoreError::UserNotFound {
                name: name.to_string(),
            })?;
        let cell = index.cell(uid)?;
        drop(index);
        Ok(User::new(uid, cell, Arc::clone(&self.inner)))
    }

    pub fn load_by_uid(&self, uid: Uid) -> Result<User> {
        let cell = self.inner.index().cell(uid)?;
        Ok(User::new(uid, cell, Arc::clone(&self.inner)))
    }

    pub fn uid_for_name(&self, name: &str) -> Option<Uid> {
        self.inner.index().uid_for_name(name)
    }

    pub fn name_for_uid(&self, uid: Uid) -> Option<String> {
        self.load_by_uid(uid).and_then(|user| user.name()).ok()
    }

    pub fn exists_name(&self, name: &str) -> bool {
        self.uid_for_name(name).is_some()
    }

    pub fn exists_uid(&self, uid: Uid) -> bool {
        self.inner.index().cell(uid).is_ok()
    }

    /// Uids of every loadable user, ascending.
    pub fn all_uids(&self) -> Vec<Uid> {
        self.inner.index().live().map(|(uid, _)| uid).collect()
    }

    /// Handles to every loadable user at the time of the call, in uid order.
    ///
    /// Each call takes a fresh snapshot.
    pub fn all_users(&self) -> Users {
        let cells = self
            .inner
            .index()
            .live()
            .map(|(uid, cell)| (uid, Arc::clone(cell)))
            .collect();
        Users::new(cells, Arc::clone(&self.inner))
    }

    pub fn total_count(&self) -> usize {
        self.inner.index().live_count()
    }

    /// Uids whose records could not be decoded at open.
    pub fn corrupt_uids(&self) -> Vec<Uid> {
        self.inner.index().corrupt_uids()
    }

    /// One past the highest uid in use (1 for an empty store).
    pub fn next_free_uid(&self) -> Result<Uid> {
        match self.inner.index().highest_uid() {
            None => Ok(1),
            Some(uid) => uid.checked_add(1).ok_or_else(|| StoreError::NoFreeUid.into()),
        }
    }

    /// Uids selected by a space-separated list of user specifiers, ascending
    /// and without repeats.
    ///
    /// Each token is one of:
    /// - `*`: every user;
    /// - `=group`: the primary and secondary members of a group;
    /// - a name, optionally containing `*`, `?` or `[...]` wildcards.
    ///
    /// A leading `-` on a name token is ignored. Tokens naming no user or
    /// group select nothing.
    pub fn uids_matching(&self, specifiers: &str) -> Vec<Uid> {
        let tokens: Vec<&str> = specifiers.split_whitespace().collect();
        if tokens.contains(&"*") {
            return self.all_uids();
        }

        let mut uids: Vec<Uid> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        for token in tokens {
            match token.strip_prefix('=') {
                Some(group) => {
                    if let Some(group) = self.inner.groups.by_name(group)
                        && let Ok(members) = self.inner.groups.members(group.gid)
                    {
                        uids.extend(members.member_uids());
                    }
                }
                None => names.push(token.strip_prefix('-').unwrap_or(token)),
            }
        }

        if !names.is_empty() {
            let index = self.inner.index();
            for pattern in names {
                if pattern.contains(['*', '?', '[']) {
                    uids.extend(
                        index
                            .names()
                            .filter(|(name, _)| wildcard_match(pattern, name))
                            .map(|(_, uid)| uid),
                    );
                } else if let Some(uid) = index.uid_for_name(pattern) {
                    uids.push(uid);
                }
            }
        }

        uids.sort_unstable();
        uids.dedup();
        uids
    }

    // === Authentication ===

    /// Does any user's IP mask admit `address`?
    ///
    /// This is the connection-admission check run before a user name is known.
    pub fn address_allowed(&self, address: &str) -> bool {
        self.all_users()
            .any(|user| user.matches_address(address).unwrap_or(false))
    }

    /// Authenticate a login attempt and record it.
    ///
    /// The address is checked against the user's masks, then the expiry date,
    /// before the password is verified.
    pub fn login(&self, name: &str, address: &str, password: &str) -> Result<User> {
        let user = self.load_by_name(name)?;
        if !user.matches_address(address)? {
            warn!(%name, %address, "login rejected by ip masks");
            return Err(StoreError::AddressRejected {
                address: address.to_string(),
            }
            .into());
        }
        if user.expired()? {
            warn!(%name, "login rejected: account expired");
            return Err(StoreError::AccountExpired {
                name: name.to_string(),
            }
            .into());
        }
        if !user.has_password()? {
            return Err(CredentialError::NoPasswordSet.into());
        }
        if !user.verify_password(password)? {
            warn!(%name, %address, "login rejected: bad password");
            return Err(CredentialError::InvalidPassword.into());
        }
        user.record_login()?;
        info!(%name, uid = user.uid(), "user logged in");
        Ok(user)
    }

    // === Groups ===

    /// The group registry, for lookups.
    pub fn groups(&self) -> &GroupRegistry {
        &self.inner.groups
    }

    pub fn group_members(&self, gid: Gid) -> Result<GroupMembers> {
        self.inner.groups.members(gid)
    }

    fn check_group_name(&self, name: &str) -> Result<()> {
        validate::check_name(name, self.inner.config.max_name_len).map_err(|reason| {
            GroupError::InvalidGroupName {
                name: name.to_string(),
                reason,
            }
            .into()
        })
    }

    pub fn create_group(&self, gid: Gid, name: &str) -> Result<Group> {
        self.inner.check_writable()?;
        self.check_group_name(name)?;
        let group = self
            .inner
            .groups
            .create(Group::new(gid, name), |all| self.inner.persist_groups(all))?;
        info!(gid, %name, "created group");
        Ok(group)
    }

    /// Delete a group. Refused while any user references it.
    pub fn delete_group(&self, gid: Gid) -> Result<Group> {
        self.inner.check_writable()?;
        let group = self
            .inner
            .groups
            .delete(gid, |all| self.inner.persist_groups(all))?;
        info!(gid, name = %group.name, "deleted group");
        Ok(group)
    }

    pub fn rename_group(&self, gid: Gid, new_name: &str) -> Result<Group> {
        self.inner.check_writable()?;
        self.check_group_name(new_name)?;
        let group = self.inner.groups.update(
            gid,
            |g| g.name = new_name.to_string(),
            |all| self.inner.persist_groups(all),
        )?;
        info!(gid, %new_name, "renamed group");
        Ok(group)
    }

    pub fn set_group_description(&self, gid: Gid, description: &str) -> Result<Group> {
        self.inner.check_writable()?;
        validate::check_text(description, self.inner.config.max_tagline_len)
            .map_err(|reason| GroupError::InvalidDescription { reason })?;
        self.inner.groups.update(
            gid,
            |g| g.description = description.to_string(),
            |all| self.inner.persist_groups(all),
        )
    }
}
