use crate::error::TechnicalException;
use dashmap::DashMap;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// An opaque, engine-specific compiled artifact.
///
/// Engines store whatever they need behind the handle and get it back with
/// [`CompiledUnit::downcast_ref`].
#[derive(Clone)]
pub struct CompiledUnit {
    description: Arc<str>,
    handle: Arc<dyn Any + Send + Sync>,
}

impl CompiledUnit {
    pub fn new<T>(description: impl Into<Arc<str>>, handle: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            description: description.into(),
            handle: Arc::new(handle),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl Debug for CompiledUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// State of a [`CompileCell`].
#[derive(Debug, Clone)]
pub enum CellState {
    Uninitialized,
    InProgress,
    Ready(CompiledUnit),
    Failed(TechnicalException),
}

impl CellState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CellState::Uninitialized => "uninitialized",
            CellState::InProgress => "in-progress",
            CellState::Ready(_) => "ready",
            CellState::Failed(_) => "failed",
        }
    }
}

/// Lazily compiled, write-once slot for one component's artifact.
#[derive(Debug)]
pub struct CompileCell {
    key: Arc<str>,
    state: Mutex<CellState>,
    settled: Condvar,
    compilations: AtomicUsize,
}

/// Marks the cell failed if the compiling caller unwinds before settling it.
struct InProgressGuard<'a> {
    cell: &'a CompileCell,
    settled: bool,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let err = TechnicalException::new(format!(
                "compilation of {} was aborted by a panic",
                self.cell.key
            ));
            self.cell.settle(CellState::Failed(err));
        }
    }
}

impl CompileCell {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(CellState::Uninitialized),
            settled: Condvar::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, state: CellState) {
        *self.lock() = state;
        self.settled.notify_all();
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CellState {
        self.lock().clone()
    }

    /// Number of times `compile` actually ran. At most one for a given cell.
    #[must_use]
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Acquire)
    }

    /// Return the compiled artifact, compiling it with `compile` if no caller did yet.
    ///
    /// # Arguments
    ///
    /// * `compile` - Called at most once over the lifetime of the cell
    ///
    /// # Returns
    ///
    /// The shared artifact, or the compilation error. Every caller sees the same outcome.
    pub fn get_or_compile<F>(&self, compile: F) -> Result<CompiledUnit, TechnicalException>
    where
        F: FnOnce() -> Result<CompiledUnit, TechnicalException>,
    {
        {
            let mut state = self.lock();
            loop {
                match &*state {
                    CellState::Ready(unit) => return Ok(unit.clone()),
                    CellState::Failed(err) => return Err(err.clone()),
                    CellState::InProgress => {
                        debug!(key = %self.key, "Waiting for in-flight compilation");
                        state = self
                            .settled
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    CellState::Uninitialized => {
                        *state = CellState::InProgress;
                        break;
                    }
                }
            }
        }

        let mut guard = InProgressGuard {
            cell: self,
            settled: false,
        };
        self.compilations.fetch_add(1, Ordering::AcqRel);
        let outcome = compile();
        let next = match &outcome {
            Ok(unit) => CellState::Ready(unit.clone()),
            Err(err) => {
                warn!(key = %self.key, error = %err, "Compilation failed, cell is now permanently failed");
                CellState::Failed(err.clone())
            }
        };
        self.settle(next);
        guard.settled = true;
        outcome
    }
}

/// Counts of cells per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub uninitialized: usize,
    pub in_progress: usize,
    pub ready: usize,
    pub failed: usize,
}

/// Registry of compile cells for one application, keyed by component identity.
///
/// Cells are created once, when the descriptor is loaded. The registry itself is only
/// read on the request path.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    cells: DashMap<String, Arc<CompileCell>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `key`, created on first use.
    pub fn cell(&self, key: &str) -> Arc<CompileCell> {
        let entry = self
            .cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(CompileCell::new(key)));
        Arc::clone(entry.value())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<CompileCell>> {
        self.cells.get(key).map(|c| Arc::clone(c.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.cells.iter() {
            match entry.value().state() {
                CellState::Uninitialized => stats.uninitialized += 1,
                CellState::InProgress => stats.in_progress += 1,
                CellState::Ready(_) => stats.ready += 1,
                CellState::Failed(_) => stats.failed += 1,
            }
        }
        stats
    }
}
