use crate::util::{ComplexExtended, ComplexFixed, FloatExtended, HighPrecisionComplex};
use crate::util::progress::ProgressCounters;

use atomic_counter::AtomicCounter;
use std::sync::atomic::{AtomicBool, Ordering};

/// Orbit points larger than this end the reference.
pub const ESCAPE_RADIUS: f64 = 1000.0;

/// The high precision orbit of the view centre, downcast for the pixel loops.
///
/// Index i holds Z_i with Z_0 = 0, so the vector always has at least one entry.
#[derive(Clone)]
pub struct Reference {
    pub maximum_iteration: usize,
    pub digits: u32,
    pub reference_data: Vec<ComplexFixed<f64>>,
    pub reference_data_extended: Vec<ComplexExtended>,
}

impl Reference {
    pub fn new(maximum_iteration: usize, digits: u32) -> Reference {
        Reference {
            maximum_iteration,
            digits,
            reference_data: Vec::new(),
            reference_data_extended: Vec::new(),
        }
    }

    /// Iterates z = z^2 + c from zero at the centre's precision.
    ///
    /// Returns false when stopped early through the flag, leaving a partial orbit.
    pub fn run(&mut self, center: &HighPrecisionComplex, counters: &ProgressCounters, stop_flag: &AtomicBool) -> bool {
        let escape_radius = FloatExtended::from_parts(ESCAPE_RADIUS, 0);

        self.reference_data.clear();
        self.reference_data_extended.clear();

        let mut z = HighPrecisionComplex::zero(center.digits());

        for _ in 0..self.maximum_iteration {
            if stop_flag.load(Ordering::Relaxed) {
                return false;
            }

            let z_extended = z.to_extended();

            if z_extended.norm() > escape_radius {
                break;
            }

            self.reference_data.push(z.to_fixed());
            self.reference_data_extended.push(z_extended);

            z.square_add_mut(center);
            counters.reference.inc();
        }

        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.reference_data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reference_data.is_empty()
    }
}
