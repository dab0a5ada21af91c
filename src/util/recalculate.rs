/// Which cached parts of a render are stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RecalculateFlags {
    pub reference: bool,
    pub approximation: bool,
    pub grid: bool,
}

impl Default for RecalculateFlags {
    fn default() -> Self {
        RecalculateFlags::all()
    }
}

impl RecalculateFlags {
    pub fn all() -> Self {
        RecalculateFlags {
            reference: true,
            approximation: true,
            grid: true
        }
    }

    pub fn reset(&mut self) {
        *self = RecalculateFlags::all();
    }

    #[inline]
    pub fn pan(&mut self) {
        self.reset();
    }

    #[inline]
    pub fn zoom(&mut self) {
        self.reset();
    }

    #[inline]
    pub fn jump(&mut self) {
        self.reset();
    }

    pub fn change_maximum_iteration(&mut self, previous: usize, next: usize) {
        // a lower limit only recolours, the cached orbit is long enough
        if next > previous {
            self.reset();
        }
    }

    #[inline]
    pub fn recolour(&mut self) {}

    pub fn is_clean(&self) -> bool {
        !(self.reference || self.approximation || self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> RecalculateFlags {
        RecalculateFlags {
            reference: false,
            approximation: false,
            grid: false
        }
    }

    #[test]
    fn spatial_changes_dirty_everything() {
        let mut flags = clean();
        flags.pan();
        assert_eq!(flags, RecalculateFlags::all());

        let mut flags = clean();
        flags.zoom();
        assert_eq!(flags, RecalculateFlags::all());

        let mut flags = clean();
        flags.jump();
        assert_eq!(flags, RecalculateFlags::all());
    }

    #[test]
    fn iteration_changes() {
        let mut flags = clean();
        flags.change_maximum_iteration(256, 1024);
        assert_eq!(flags, RecalculateFlags::all());

        let mut flags = clean();
        flags.change_maximum_iteration(1024, 256);
        assert!(flags.is_clean());

        let mut flags = clean();
        flags.change_maximum_iteration(256, 256);
        assert!(flags.is_clean());
    }

    #[test]
    fn recolour_keeps_flags() {
        let mut flags = clean();
        flags.recolour();
        assert!(flags.is_clean());

        let mut flags = RecalculateFlags::all();
        flags.recolour();
        assert_eq!(flags, RecalculateFlags::all());
    }
}
