use crate::error::ArithmeticError;
use crate::math::reference::Reference;
use crate::util::{ComplexExtended, FloatExtended};
use crate::util::progress::ProgressCounters;

use atomic_counter::AtomicCounter;
use smallvec::{smallvec, SmallVec};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Largest accepted relative error between a probe and its series prediction.
pub const APPROXIMATION_TOLERANCE: f64 = 1e-5;

pub const DEFAULT_ORDER: usize = 6;

type Coefficients = SmallVec<[ComplexExtended; 8]>;

/// Power series in the pixel offset: delta_n(c) ~ a_1 c + a_2 c^2 + ... + a_K c^K.
///
/// After `valid_iterations` accepted steps the coefficients describe delta at that iteration.
#[derive(Clone, Debug)]
pub struct SeriesApproximation {
    pub order: usize,
    pub valid_iterations: usize,
    coefficients: Coefficients,
    previous_coefficients: Coefficients,
}

impl SeriesApproximation {
    /// A set that skips nothing.
    pub fn new(order: usize) -> Self {
        let order = order.max(1);

        SeriesApproximation {
            order,
            valid_iterations: 0,
            coefficients: smallvec![ComplexExtended::ZERO; order],
            previous_coefficients: smallvec![ComplexExtended::ZERO; order],
        }
    }

    pub fn coefficients(&self) -> &[ComplexExtended] {
        &self.coefficients
    }

    fn reset(&mut self) {
        self.valid_iterations = 0;

        for coefficient in self.coefficients.iter_mut().chain(self.previous_coefficients.iter_mut()) {
            *coefficient = ComplexExtended::ZERO;
        }
    }

    /// Advances the coefficients past orbit point z, keeping the old ones for `undo`.
    fn step(&mut self, z: ComplexExtended) {
        self.previous_coefficients.clone_from(&self.coefficients);

        let previous = &self.previous_coefficients;
        let two_z = z * 2.0;

        for k in 0..self.order {
            let mut next = two_z * previous[k];

            // the square of the series contributes every pair summing to degree k + 1
            for j in 0..k {
                next += previous[j] * previous[k - 1 - j];
            }

            if k == 0 {
                next.re += FloatExtended::ONE;
            }

            self.coefficients[k] = next;
        }
    }

    fn undo(&mut self) {
        self.coefficients.clone_from(&self.previous_coefficients);
    }

    /// Horner evaluation at the offset c.
    pub fn evaluate(&self, c: ComplexExtended) -> ComplexExtended {
        let mut approximation = ComplexExtended::ZERO;

        for coefficient in self.coefficients.iter().rev() {
            approximation = (approximation + *coefficient) * c;
        }

        approximation
    }

    /// Builds the coefficients along the orbit, checking each step against the probe offsets.
    ///
    /// Returns false only when stopped through the flag. Arithmetic failures leave a set that skips nothing.
    pub fn run(&mut self, reference: &Reference, probes: &[ComplexExtended], counters: &ProgressCounters, stop_flag: &AtomicBool) -> bool {
        self.reset();

        match self.derive(reference, probes, counters, stop_flag) {
            Ok(finished) => finished,
            Err(error) => {
                warn!("series approximation abandoned: {}", error);
                self.reset();
                true
            }
        }
    }

    fn derive(&mut self, reference: &Reference, probes: &[ComplexExtended], counters: &ProgressCounters, stop_flag: &AtomicBool) -> Result<bool, ArithmeticError> {
        let tolerance = FloatExtended::from_parts(APPROXIMATION_TOLERANCE, 0);
        let escape_radius_squared = FloatExtended::from_parts(4.0, 0);

        let orbit = &reference.reference_data_extended;
        let mut exact: SmallVec<[ComplexExtended; 4]> = smallvec![ComplexExtended::ZERO; probes.len()];

        for n in 0..orbit.len().saturating_sub(1) {
            if stop_flag.load(Ordering::Relaxed) {
                return Ok(false);
            }

            let z = orbit[n];
            self.step(z);

            for (current, probe) in exact.iter_mut().zip(probes) {
                *current = z * 2.0 * *current + current.square() + *probe;

                let approximation = self.evaluate(*probe);
                let relative_error = (approximation - *current).norm().try_div(current.norm())?;

                // current is the probe delta after this step, so it pairs with orbit[n + 1] like the pixel escape test
                if relative_error.mantissa.is_nan()
                    || relative_error > tolerance
                    || (orbit[n + 1] + *current).norm_square() > escape_radius_squared {
                    self.undo();
                    return Ok(true);
                }
            }

            self.valid_iterations = n + 1;
            counters.approximation.inc();
        }

        Ok(true)
    }
}
