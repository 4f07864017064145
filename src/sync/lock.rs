//! Peripheral lock set
//!
//! Three independent binary locks, one per exclusive peripheral. A lock has
//! an owner word and a set of priorities pending on it; the executor parks a
//! task on the lock when its service tick finds it taken and readies it again
//! once the lock is free. Waiting is unbounded: a stuck holder stalls only the
//! tasks that need that one peripheral.
//!
//! An owner may hold at most one lock at a time. Acquiring a second lock while
//! holding one fails with [`OsError::LockOrder`] and is counted, so tests can
//! check the invariant dynamically.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::error::{OsError, OsResult};
use crate::prio::PrioSet;
use crate::types::Resource;

/// Lock owner identity. Tasks use their priority; callers outside the task
/// set use ids from [`EXTERNAL_OWNER_BASE`] upward.
pub type Owner = u8;

/// First owner id available to callers that are not executor tasks
pub const EXTERNAL_OWNER_BASE: Owner = 0x80;

const FREE: u8 = 0xFF;

/// One binary lock guarding one peripheral
pub struct PeripheralLock {
    owner: AtomicU8,
    waiters: AtomicU32,
    acquisitions: AtomicU32,
}

impl PeripheralLock {
    const fn new() -> Self {
        Self {
            owner: AtomicU8::new(FREE),
            waiters: AtomicU32::new(0),
            acquisitions: AtomicU32::new(0),
        }
    }

    /// Current holder, if any
    #[inline]
    pub fn holder(&self) -> Option<Owner> {
        match self.owner.load(Ordering::Acquire) {
            FREE => None,
            owner => Some(owner),
        }
    }

    /// Number of successful acquisitions so far
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Priorities currently pending on this lock
    pub fn waiters(&self) -> PrioSet {
        PrioSet::from_bits(self.waiters.load(Ordering::Acquire))
    }
}

/// The three peripheral locks
pub struct LockSet {
    locks: [PeripheralLock; 3],
    order_violations: AtomicU32,
}

impl LockSet {
    pub const fn new() -> Self {
        Self {
            locks: [PeripheralLock::new(), PeripheralLock::new(), PeripheralLock::new()],
            order_violations: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn lock(&self, resource: Resource) -> &PeripheralLock {
        &self.locks[resource.index()]
    }

    /// Resource currently held by `owner`
    pub fn held_by(&self, owner: Owner) -> Option<Resource> {
        Resource::ALL
            .into_iter()
            .find(|r| self.lock(*r).holder() == Some(owner))
    }

    /// Attempts to take a second lock while holding one
    pub fn order_violations(&self) -> u32 {
        self.order_violations.load(Ordering::Relaxed)
    }

    /// Take the lock without waiting
    pub fn try_acquire(&self, resource: Resource, owner: Owner) -> OsResult<LockGuard<'_>> {
        debug_assert!(owner != FREE);

        if let Some(held) = self.held_by(owner) {
            if held == resource {
                return Err(OsError::LockOwner);
            }
            self.order_violations.fetch_add(1, Ordering::Relaxed);
            crate::error!("owner {} holds {} while acquiring {}", owner, held.name(), resource.name());
            return Err(OsError::LockOrder);
        }

        let lock = self.lock(resource);
        lock.owner
            .compare_exchange(FREE, owner, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OsError::LockWouldBlock)?;
        lock.acquisitions.fetch_add(1, Ordering::Relaxed);

        Ok(LockGuard { set: self, resource, owner })
    }

    /// Take the lock, waiting as long as it takes.
    ///
    /// `wait` is called between attempts and should put the core to sleep
    /// until something changes (WFI on target). Only ordering errors are
    /// returned; there is no timeout.
    pub fn acquire<W: FnMut()>(&self, resource: Resource, owner: Owner, mut wait: W) -> OsResult<LockGuard<'_>> {
        loop {
            match self.try_acquire(resource, owner) {
                Err(OsError::LockWouldBlock) => wait(),
                other => return other,
            }
        }
    }

    /// Register `prio` as pending on `resource`
    pub fn pend(&self, resource: Resource, prio: u8) {
        let mut set = PrioSet::new();
        set.insert(prio);
        self.lock(resource).waiters.fetch_or(set.bits(), Ordering::AcqRel);
    }

    /// If the lock is free, clear and return its waiters
    pub fn take_waiters_if_free(&self, resource: Resource) -> PrioSet {
        let lock = self.lock(resource);
        if lock.holder().is_some() {
            return PrioSet::EMPTY;
        }
        PrioSet::from_bits(lock.waiters.swap(0, Ordering::AcqRel))
    }

    fn release(&self, resource: Resource, owner: Owner) -> OsResult<()> {
        self.lock(resource)
            .owner
            .compare_exchange(owner, FREE, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| OsError::LockNotOwner)
    }
}

impl Default for LockSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Held lock; released on drop
pub struct LockGuard<'a> {
    set: &'a LockSet,
    resource: Resource,
    owner: Owner,
}

impl LockGuard<'_> {
    #[inline]
    pub fn resource(&self) -> Resource {
        self.resource
    }

    #[inline]
    pub fn owner(&self) -> Owner {
        self.owner
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.set.release(self.resource, self.owner).is_err() {
            crate::error!("{} lock released by non-owner {}", self.resource.name(), self.owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let locks = LockSet::new();
        {
            let guard = locks.try_acquire(Resource::Audio, 3).unwrap();
            assert_eq!(guard.resource(), Resource::Audio);
            assert_eq!(locks.lock(Resource::Audio).holder(), Some(3));
        }
        assert_eq!(locks.lock(Resource::Audio).holder(), None);
        assert_eq!(locks.lock(Resource::Audio).acquisitions(), 1);
    }

    #[test]
    fn contended_lock_would_block() {
        let locks = LockSet::new();
        let _held = locks.try_acquire(Resource::Storage, EXTERNAL_OWNER_BASE).unwrap();
        assert_eq!(locks.try_acquire(Resource::Storage, 2).err(), Some(OsError::LockWouldBlock));
    }

    #[test]
    fn second_lock_is_refused_and_counted() {
        let locks = LockSet::new();
        let _display = locks.try_acquire(Resource::Display, 4).unwrap();
        assert_eq!(locks.try_acquire(Resource::Audio, 4).err(), Some(OsError::LockOrder));
        assert_eq!(locks.try_acquire(Resource::Display, 4).err(), Some(OsError::LockOwner));
        assert_eq!(locks.order_violations(), 1);
        assert_eq!(locks.lock(Resource::Audio).holder(), None);
    }

    #[test]
    fn waiters_only_taken_once_free() {
        let locks = LockSet::new();
        let held = locks.try_acquire(Resource::Storage, EXTERNAL_OWNER_BASE).unwrap();
        locks.pend(Resource::Storage, 2);
        assert!(locks.take_waiters_if_free(Resource::Storage).is_empty());
        drop(held);
        let woken = locks.take_waiters_if_free(Resource::Storage);
        assert_eq!(woken.highest(), Some(2));
        assert!(locks.lock(Resource::Storage).waiters().is_empty());
    }

    #[test]
    fn blocking_acquire_waits_until_free() {
        let locks = LockSet::new();
        let mut held = Some(locks.try_acquire(Resource::Audio, EXTERNAL_OWNER_BASE).unwrap());
        let mut waits = 0;
        let guard = locks
            .acquire(Resource::Audio, 3, || {
                waits += 1;
                if waits == 3 {
                    held.take();
                }
            })
            .unwrap();
        assert_eq!(waits, 3);
        assert_eq!(guard.owner(), 3);
    }
}
