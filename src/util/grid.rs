use std::sync::atomic::{AtomicUsize, Ordering};

/// Grid value of a pixel that has not been resolved yet.
pub const UNKNOWN: usize = 0;

/// One iteration count per pixel, shared between the render workers.
///
/// Every task writes a disjoint set of cells, so relaxed atomics are enough;
/// the pass barrier in the renderer orders writes before later reads.
pub struct IterationGrid {
    width: usize,
    height: usize,
    cells: Vec<AtomicUsize>,
}

impl IterationGrid {
    pub fn new(width: usize, height: usize) -> Self {
        IterationGrid {
            width,
            height,
            cells: (0..(width * height)).map(|_| AtomicUsize::new(UNKNOWN)).collect()
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> usize {
        self.cells[y * self.width + x].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, x: usize, y: usize, value: usize) {
        self.cells[y * self.width + x].store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_known(&self, x: usize, y: usize) -> bool {
        self.get(x, y) != UNKNOWN
    }

    pub fn clear(&self) {
        for cell in &self.cells {
            cell.store(UNKNOWN, Ordering::Relaxed);
        }
    }

    pub fn unknown_count(&self) -> usize {
        self.cells.iter()
            .filter(|cell| cell.load(Ordering::Relaxed) == UNKNOWN)
            .count()
    }

    /// Copy of the grid in row major order.
    pub fn values(&self) -> Vec<usize> {
        self.cells.iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect()
    }
}

/// The value shared by two neighbours, if both are resolved and agree.
#[inline]
pub fn interpolate(first: usize, second: usize) -> Option<usize> {
    if first != UNKNOWN && first == second {
        Some(first)
    } else {
        None
    }
}
