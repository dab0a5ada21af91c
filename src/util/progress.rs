use atomic_counter::{AtomicCounter, RelaxedCounter};

/// Live counters, read by a progress reporter while the workers update them.
pub struct ProgressCounters {
    pub total: RelaxedCounter,
    pub reference: RelaxedCounter,
    pub approximation: RelaxedCounter,
    pub guessed: RelaxedCounter,
    pub evaluated: RelaxedCounter,
}

/// A point in time copy of the counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub reference: usize,
    pub approximation: usize,
    pub guessed: usize,
    pub evaluated: usize,
}

impl Stats {
    /// Pixels resolved so far, either way.
    pub fn resolved(&self) -> usize {
        self.guessed + self.evaluated
    }
}

impl ProgressCounters {
    pub fn new(total: usize) -> ProgressCounters {
        ProgressCounters {
            total: RelaxedCounter::new(total),
            reference: RelaxedCounter::new(0),
            approximation: RelaxedCounter::new(0),
            guessed: RelaxedCounter::new(0),
            evaluated: RelaxedCounter::new(0),
        }
    }

    // Total stays, it is fixed by the image size
    pub fn reset(&self) {
        self.reference.reset();
        self.approximation.reset();
        self.guessed.reset();
        self.evaluated.reset();
    }

    /// Overwrites the reference count, used when a cached orbit is reused.
    pub fn set_reference(&self, value: usize) {
        self.reference.reset();
        self.reference.add(value);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            total: self.total.get(),
            reference: self.reference.get(),
            approximation: self.approximation.get(),
            guessed: self.guessed.get(),
            evaluated: self.evaluated.get(),
        }
    }
}
