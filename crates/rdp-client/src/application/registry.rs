//! Owning arena of sessions addressed by generation-checked handles.
//!
//! # Why not hand the host a pointer? (for beginners)
//!
//! The obvious way to give a foreign host "a session" is to box it and hand
//! out the raw pointer.  Then a host that calls `free` twice, or calls
//! `write` after `free`, makes this crate read freed memory.
//!
//! Instead the arena owns every session.  The host holds a
//! [`SessionHandle`]: a slot index plus the slot's *generation* at the time
//! the session was inserted.  Removing a session bumps the slot's
//! generation, so every handle issued for the old occupant stops matching:
//!
//! ```text
//! slot 3: gen 1, session A      handle {3, 1} -> A
//! free({3, 1})                  slot 3: gen 2, empty
//! connect() reuses slot 3       slot 3: gen 2, session B
//! write({3, 1})                 generation mismatch -> stale handle error
//! ```
//!
//! A slot whose generation would wrap is retired instead of reused, so a
//! handle can never alias a later session.
//!
//! The arena lock is held only to look up, insert, or remove an `Arc`; no
//! engine I/O ever happens under it.

use std::sync::{Arc, Mutex, PoisonError};

use crate::application::error::ClientError;
use crate::application::session::Session;

/// Host-facing reference to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    index: u32,
    generation: u32,
}

impl SessionHandle {
    /// Slot index in the arena.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.  Never 0.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Packs the handle into a non-zero `u64` for the C ABI.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Unpacks a value produced by [`to_raw`](Self::to_raw).
    ///
    /// Returns `None` for 0 (the null handle) and for any value whose
    /// generation half is 0, since no issued handle has one.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: raw as u32,
            generation,
        })
    }
}

struct Slot {
    generation: u32,
    session: Option<Arc<Session>>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    live: usize,
}

/// Thread-safe arena of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    arena: Mutex<Arena>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session and returns its handle.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] if every one of the `u32::MAX` slots is in use
    /// or retired.
    pub fn insert(&self, session: Arc<Session>) -> Result<SessionHandle, ClientError> {
        let mut arena = self.lock();

        let index = match arena.vacant.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(arena.slots.len())
                    .ok()
                    .filter(|i| *i < u32::MAX)
                    .ok_or_else(|| ClientError::Usage("session arena is full".to_string()))?;
                arena.slots.push(Slot {
                    generation: 1,
                    session: None,
                });
                index
            }
        };

        let slot = &mut arena.slots[index as usize];
        slot.session = Some(session);
        let generation = slot.generation;
        arena.live += 1;

        Ok(SessionHandle { index, generation })
    }

    /// Resolves a handle to its session, if the handle is still current.
    pub fn get(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        let arena = self.lock();
        arena
            .slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.clone())
    }

    /// Removes a session and invalidates every handle to it.
    ///
    /// Returns `None` if the handle was already stale; calling this twice
    /// with the same handle is therefore harmless.
    pub fn remove(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        let mut arena = self.lock();
        let slot = arena
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let session = slot.session.take()?;

        let retired = slot.generation == u32::MAX;
        slot.generation = slot.generation.wrapping_add(1);
        arena.live -= 1;
        if !retired {
            arena.vacant.push(handle.index);
        }
        Some(session)
    }

    /// Removes every session, returning them for teardown.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        let mut arena = self.lock();
        let mut drained = Vec::with_capacity(arena.live);
        let mut freed = Vec::new();
        for (index, slot) in arena.slots.iter_mut().enumerate() {
            if let Some(session) = slot.session.take() {
                let retired = slot.generation == u32::MAX;
                slot.generation = slot.generation.wrapping_add(1);
                if !retired {
                    freed.push(index as u32);
                }
                drained.push(session);
            }
        }
        arena.vacant.extend(freed);
        arena.live = 0;
        drained
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().live
    }

    /// Returns `true` if no session is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
