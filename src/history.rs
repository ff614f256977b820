//! Three-generation history of main frame snapshots.
//!
//! Predictors compare the snapshot being logged against the one or two
//! snapshots logged before it. [`History`] keeps exactly three slots and
//! rotates the roles of the slots after every written frame instead of copying
//! snapshots around.

/// Ring of three snapshots: current, previous and the one before that.
#[derive(Debug, Clone)]
pub struct History<S> {
    ring: [S; 3],
    current: usize,
    previous: usize,
    before_previous: usize,
}

impl<S: Default> Default for History<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default> History<S> {
    pub fn new() -> Self {
        Self {
            ring: [S::default(), S::default(), S::default()],
            current: 0,
            previous: 1,
            before_previous: 2,
        }
    }
}

impl<S> History<S> {
    /// Snapshot being filled for this iteration.
    #[inline]
    pub fn current(&self) -> &S {
        &self.ring[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut S {
        &mut self.ring[self.current]
    }

    /// Snapshot of the last written frame.
    #[inline]
    pub fn previous(&self) -> &S {
        &self.ring[self.previous]
    }

    /// Snapshot of the frame before the last one.
    #[inline]
    pub fn before_previous(&self) -> &S {
        &self.ring[self.before_previous]
    }

    /// Rotate after an intra frame.
    ///
    /// Both history slots now refer to the snapshot just written, since an
    /// intra frame starts a new prediction chain.
    pub fn rotate_intra(&mut self) {
        self.previous = self.current;
        self.before_previous = self.current;
        self.current = (self.current + 1) % 3;
    }

    /// Rotate after an inter frame, keeping the three-deep chain.
    pub fn rotate_inter(&mut self) {
        self.before_previous = self.previous;
        self.previous = self.current;
        self.current = (self.current + 1) % 3;
    }
}

/// Mean of two values, truncating toward zero.
#[inline]
pub fn average2<T: Into<i64>>(a: T, b: T) -> i64 {
    (a.into() + b.into()) / 2
}
