//! Subsystems: exclusively claimable units of hardware or state
//!
//! A subsystem is identified by its handle, not by its contents. Two
//! subsystems of the same type with identical state are still distinct
//! claims in the requirement map.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SUBSYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique subsystem identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubsystemId(u64);

impl SubsystemId {
    fn next() -> Self {
        Self(NEXT_SUBSYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subsystem-{}", self.0)
    }
}

/// Subsystem capability
///
/// ## Lifecycle
///
/// 1. `init()` - called once, the first time the subsystem is registered
/// 2. `periodic()` - called once per cycle by the host, before commands run
pub trait Subsystem {
    fn init(&mut self) {}

    /// Housekeeping reads, independent of which command holds the subsystem
    fn periodic(&mut self) {}

    fn name(&self) -> &str {
        std::any::type_name::<Self>().rsplit("::").next().unwrap_or("subsystem")
    }
}

/// Shared handle to a subsystem
///
/// Cloning the handle shares the subsystem; equality and hashing follow the
/// identity assigned when the handle was created.
#[derive(Clone)]
pub struct SubsystemHandle {
    id: SubsystemId,
    name: Rc<str>,
    inner: Rc<RefCell<dyn Subsystem>>,
}

impl SubsystemHandle {
    pub fn new<S: Subsystem + 'static>(subsystem: S) -> Self {
        Self::from_shared(Rc::new(RefCell::new(subsystem)))
    }

    /// Wrap a subsystem the caller keeps typed access to
    ///
    /// Each call creates a new identity, so wrap a given subsystem once and
    /// clone the resulting handle.
    pub fn from_shared<S: Subsystem + 'static>(shared: Rc<RefCell<S>>) -> Self {
        let name: Rc<str> = Rc::from(shared.borrow().name());
        let inner: Rc<RefCell<dyn Subsystem>> = shared;
        Self {
            id: SubsystemId::next(),
            name,
            inner,
        }
    }

    pub fn id(&self) -> SubsystemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn init(&self) {
        self.inner.borrow_mut().init();
    }

    pub(crate) fn periodic(&self) {
        self.inner.borrow_mut().periodic();
    }
}

impl PartialEq for SubsystemHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubsystemHandle {}

impl std::hash::Hash for SubsystemHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SubsystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}
