//! Handle registry
//!
//! Maps opaque handle values to live connections and file sessions. Each
//! kind lives in its own generational arena, so a connection id can never
//! resolve to a session and a closed id never resolves again, even after its
//! slot has been recycled.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::connection::Connection;
use crate::error::{Result, SmbError};
use crate::session::FileSession;

/// Marker trait naming a handle kind in diagnostics
pub trait HandleKind {
    const NAME: &'static str;
}

/// Marker for connection handles
#[derive(Debug)]
pub enum ConnectionKind {}

/// Marker for file session handles
#[derive(Debug)]
pub enum SessionKind {}

impl HandleKind for ConnectionKind {
    const NAME: &'static str = "connection";
}

impl HandleKind for SessionKind {
    const NAME: &'static str = "session";
}

/// Typed generational index
///
/// The raw form packs `generation << 32 | index`. Generations start at 1,
/// so a valid raw handle is never zero.
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

pub type ConnectionId = Handle<ConnectionKind>;
pub type SessionId = Handle<SessionKind>;

impl<K> Handle<K> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Opaque value handed across the C boundary
    pub fn to_raw(&self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Rebuild a handle from its raw value; zero is never valid
    pub fn from_raw(raw: u64) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self::new(raw as u32, generation))
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", K::NAME, self.index, self.generation)
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.to_raw())
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena
///
/// Removing a value bumps the slot generation, invalidating every handle
/// issued for it before the slot is reused.
pub struct Arena<T, K> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<T, K: HandleKind> Arena<T, K> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _kind: PhantomData,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle<K> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        Handle::new(index, 1)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        // A slot whose generation would wrap is retired instead of reused.
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(handle.index);
            }
            None => slot.generation = 0,
        }
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }
}

impl<T, K: HandleKind> Default for Arena<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection entry shared between the registry and in-flight calls
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Session entry shared between the registry and in-flight calls
pub type SharedSession = Arc<Mutex<FileSession>>;

struct SessionSlot {
    owner: ConnectionId,
    session: SharedSession,
}

/// Single source of truth resolving handle ids to live objects
///
/// Locks are held only for the map operation itself; the returned `Arc`s
/// are locked separately by the caller for remote I/O.
#[derive(Default)]
pub struct HandleRegistry {
    connections: Mutex<Arena<SharedConnection, ConnectionKind>>,
    sessions: Mutex<Arena<SessionSlot, SessionKind>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(&self, connection: Connection) -> (ConnectionId, SharedConnection) {
        let shared = Arc::new(Mutex::new(connection));
        let id = lock(&self.connections).insert(shared.clone());
        (id, shared)
    }

    pub fn resolve_connection(&self, id: ConnectionId) -> Result<SharedConnection> {
        lock(&self.connections)
            .get(id)
            .cloned()
            .ok_or(SmbError::StaleHandle {
                kind: ConnectionKind::NAME,
                raw: id.to_raw(),
            })
    }

    pub fn unregister_connection(&self, id: ConnectionId) -> Option<SharedConnection> {
        lock(&self.connections).remove(id)
    }

    pub fn register_session(&self, owner: ConnectionId, session: FileSession) -> SessionId {
        lock(&self.sessions).insert(SessionSlot {
            owner,
            session: Arc::new(Mutex::new(session)),
        })
    }

    pub fn resolve_session(&self, id: SessionId) -> Result<SharedSession> {
        lock(&self.sessions)
            .get(id)
            .map(|slot| slot.session.clone())
            .ok_or(SmbError::StaleHandle {
                kind: SessionKind::NAME,
                raw: id.to_raw(),
            })
    }

    /// Connection that opened the given session
    pub fn session_owner(&self, id: SessionId) -> Result<ConnectionId> {
        lock(&self.sessions)
            .get(id)
            .map(|slot| slot.owner)
            .ok_or(SmbError::StaleHandle {
                kind: SessionKind::NAME,
                raw: id.to_raw(),
            })
    }

    pub fn unregister_session(&self, id: SessionId) -> Option<SharedSession> {
        lock(&self.sessions).remove(id).map(|slot| slot.session)
    }

    /// Remove every session owned by `owner`, returning them for closing
    pub fn unregister_sessions_of(&self, owner: ConnectionId) -> Vec<(SessionId, SharedSession)> {
        let mut sessions = lock(&self.sessions);
        let owned: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, slot)| slot.owner == owner)
            .map(|(id, _)| id)
            .collect();
        owned
            .into_iter()
            .filter_map(|id| sessions.remove(id).map(|slot| (id, slot.session)))
            .collect()
    }

    /// Number of open sessions per connection
    pub fn sessions_per_connection(&self) -> HashMap<ConnectionId, usize> {
        let mut counts = HashMap::new();
        for (_, slot) in lock(&self.sessions).iter() {
            *counts.entry(slot.owner).or_insert(0) += 1;
        }
        counts
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.connections).len()
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }
}
