use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tabscore_host::Callback;

/// Detection lifecycle.
///
/// `Unknown -> Loading -> Ready`, with `Unavailable` (no font subsystem)
/// and `GaveUp` (attempt limit reached) as the non-ready terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontState {
    #[default]
    Unknown,
    Loading,
    Ready,
    Unavailable,
    GaveUp,
}

impl FontState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Unavailable | Self::GaveUp)
    }

    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unknown, Self::Loading)
                | (Self::Unknown, Self::Unavailable)
                | (Self::Loading, Self::Ready)
                | (Self::Loading, Self::GaveUp)
        )
    }
}

impl fmt::Display for FontState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Unavailable => "unavailable",
            Self::GaveUp => "gave-up",
        })
    }
}

#[derive(Default)]
struct Inner {
    state: FontState,
    observers: Vec<Callback>,
}

/// Shared, single-threaded view of the font state.
///
/// Clones observe the same state. Detection callbacks hold one clone, the
/// environment another.
#[derive(Clone, Default)]
pub struct FontReadiness {
    inner: Rc<RefCell<Inner>>,
}

impl FontReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FontState {
        self.inner.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == FontState::Ready
    }

    /// Run `callback` once the font is ready; immediately if it already is.
    /// Never runs if detection ends in `Unavailable` or `GaveUp`.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        if self.is_ready() {
            callback();
        } else {
            self.inner.borrow_mut().observers.push(Box::new(callback));
        }
    }

    /// Move to `next` if the lifecycle permits it. Returns whether it moved.
    pub(crate) fn advance(&self, next: FontState) -> bool {
        let observers = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.allows(next) {
                tracing::trace!(from = %inner.state, to = %next, "font state transition refused");
                return false;
            }
            tracing::debug!(from = %inner.state, to = %next, "font state transition");
            inner.state = next;
            match next {
                FontState::Ready => std::mem::take(&mut inner.observers),
                s if s.is_terminal() => {
                    inner.observers.clear();
                    Vec::new()
                }
                _ => Vec::new(),
            }
        };
        for observer in observers {
            observer();
        }
        true
    }
}

impl fmt::Debug for FontReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FontReadiness")
            .field("state", &inner.state)
            .field("observers", &inner.observers.len())
            .finish()
    }
}
