//! Snapshot iteration over users.

use std::sync::Arc;

use super::{StoreInner, index::RecordCell};
use crate::user::{Uid, User};

/// Users present when [`super::AccountStore::all_users`] was called,
/// in uid order.
///
/// The set of users is fixed at creation; field values are read live
/// through each yielded handle.
pub struct Users {
    cells: std::vec::IntoIter<(Uid, Arc<RecordCell>)>,
    store: Arc<StoreInner>,
}

impl Users {
    pub(crate) fn new(cells: Vec<(Uid, Arc<RecordCell>)>, store: Arc<StoreInner>) -> Self {
        Self {
            cells: cells.into_iter(),
            store,
        }
    }
}

impl Iterator for Users {
    type Item = User;

    fn next(&mut self) -> Option<User> {
        self.cells
            .next()
            .map(|(uid, cell)| User::new(uid, cell, Arc::clone(&self.store)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cells.size_hint()
    }
}

impl ExactSizeIterator for Users {}
