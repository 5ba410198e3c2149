//! Compiled-program cache keyed by (signature bytes, dialect).
//!
//! Each key owns a slot with its own lock, so a second request for a
//! program mid-compile blocks on that slot instead of recompiling, while
//! requests for other keys proceed. Failed compiles leave the slot empty
//! and the error propagates to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::context::Dialect;
use crate::emit::ProgramBundle;
use crate::error::CompileError;
use crate::schedule::Allocation;
use crate::signature::Signature;

/// A finished compilation: the text plus everything a renderer needs to
/// bind it.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub signature: Signature,
    pub dialect: Dialect,
    pub bundle: ProgramBundle,
    pub allocation: Allocation,
}

#[derive(Default)]
struct Slot {
    program: Mutex<Option<Arc<CompiledProgram>>>,
}

#[derive(Default)]
pub struct ProgramCache {
    slots: Mutex<HashMap<(Vec<u8>, Dialect), Arc<Slot>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Returns the cached program for `signature`, compiling it with
    /// `build` on a miss. The second tuple element reports whether this was
    /// a hit. At most one caller runs `build` per key.
    pub fn get_or_compile<F>(
        &self,
        signature: &Signature,
        dialect: Dialect,
        build: F,
    ) -> Result<(Arc<CompiledProgram>, bool), CompileError>
    where
        F: FnOnce() -> Result<CompiledProgram, CompileError>,
    {
        let key = (signature.to_bytes(), dialect);
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key).or_default())
        };

        let mut program = lock(&slot.program);
        if let Some(cached) = program.as_ref() {
            debug!(words = signature.words().len(), "program cache hit");
            return Ok((Arc::clone(cached), true));
        }
        debug!(words = signature.words().len(), "program cache miss");
        let compiled = Arc::new(build()?);
        *program = Some(Arc::clone(&compiled));
        Ok((compiled, false))
    }
}
