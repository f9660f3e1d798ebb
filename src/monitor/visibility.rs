//! Home screen visibility probing.
//!
//! # Responsibilities
//! - Define the seam a GUI layer implements to answer "is the home view showing?"
//! - Fold probe results into a tri-state so failures stay distinguishable
//!
//! # Design Decisions
//! - Probe errors and panics are contained here and never reach the caller
//!   of the monitor
//! - A missing or unmounted context is a definite "not visible", not "unknown"

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VisibilityError;

/// Handle to the GUI's home view, assigned by the GUI layer.
pub trait HomeScreenContext: Send + Sync {
    /// Whether the view still exists (mounted in the view tree).
    fn is_mounted(&self) -> bool;

    /// Whether the view is the active top-level view.
    fn is_current(&self) -> Result<bool, VisibilityError>;
}

/// Outcome of a visibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Visible,
    #[default]
    NotVisible,
    /// The context was present but could not be queried.
    Unknown,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

/// Ask the context whether the home view is showing.
///
/// A context that panics is treated like one that returned an error.
pub fn probe(context: Option<&dyn HomeScreenContext>) -> Visibility {
    let Some(context) = context else {
        return Visibility::NotVisible;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| query(context))) {
        Ok(visibility) => visibility,
        Err(_) => {
            tracing::warn!("Home screen context panicked during visibility probe");
            Visibility::Unknown
        }
    }
}

fn query(context: &dyn HomeScreenContext) -> Visibility {
    if !context.is_mounted() {
        return Visibility::NotVisible;
    }

    match context.is_current() {
        Ok(true) => Visibility::Visible,
        Ok(false) => Visibility::NotVisible,
        Err(e) => {
            tracing::debug!(error = %e, "Home screen visibility probe failed");
            Visibility::Unknown
        }
    }
}

/// Flag-backed context for GUI layers that track navigation themselves.
#[derive(Debug, Default)]
pub struct NavigationState {
    mounted: AtomicBool,
    current: AtomicBool,
}

impl NavigationState {
    pub fn new(mounted: bool, current: bool) -> Self {
        Self {
            mounted: AtomicBool::new(mounted),
            current: AtomicBool::new(current),
        }
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::Relaxed);
    }

    pub fn set_current(&self, current: bool) {
        self.current.store(current, Ordering::Relaxed);
    }
}

impl HomeScreenContext for NavigationState {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Relaxed)
    }

    fn is_current(&self) -> Result<bool, VisibilityError> {
        Ok(self.current.load(Ordering::Relaxed))
    }
}
