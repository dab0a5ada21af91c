use crate::math::reference::Reference;
use crate::math::series_approximation::SeriesApproximation;
use crate::util::{ComplexExtended, ComplexFixed, FloatExtended};

/// Views at or below this scale start pixels in the extended range loop.
pub const EXTENDED_SCALE_LIMIT: f64 = 1e-300;

/// Deltas with a decimal exponent at or above this are safe as doubles.
pub const FIXED_EXPONENT_LIMIT: i32 = -160;

/// Series results are only used when they skip more than this.
pub const MINIMUM_SKIPPED: usize = 2;

/// Where an extended range loop stopped: either a final count or a state the double loop resumes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Progress {
    Finished(usize),
    HandOff {
        iteration: usize,
        reference_iteration: usize,
        delta: ComplexExtended,
    },
}

/// Per pixel escape time through perturbation around a shared reference orbit.
pub struct Perturbation<'a> {
    reference: &'a Reference,
    series: &'a SeriesApproximation,
    maximum_iteration: usize,
    extended: bool,
}

impl<'a> Perturbation<'a> {
    pub fn new(reference: &'a Reference, series: &'a SeriesApproximation, maximum_iteration: usize, scale: FloatExtended) -> Self {
        Perturbation {
            reference,
            series,
            maximum_iteration,
            extended: scale <= FloatExtended::from_parts(EXTENDED_SCALE_LIMIT, 0),
        }
    }

    #[inline]
    pub fn uses_extended(&self) -> bool {
        self.extended
    }

    /// Escape iteration of the point at offset c from the reference, or the maximum if it stays bounded.
    pub fn evaluate(&self, c: ComplexExtended) -> usize {
        if self.reference.is_empty() {
            return self.maximum_iteration;
        }

        let (iteration, delta) = if self.series.valid_iterations > MINIMUM_SKIPPED {
            (self.series.valid_iterations, self.series.evaluate(c))
        } else {
            (0, ComplexExtended::ZERO)
        };

        // the series may come from a render with a higher limit
        if iteration >= self.maximum_iteration {
            return self.maximum_iteration;
        }

        if !self.extended {
            return self.iterate_fixed(c.to_fixed(), delta.to_fixed(), iteration, iteration);
        }

        match self.iterate_extended(c, delta, iteration, iteration) {
            Progress::Finished(iteration) => iteration,
            Progress::HandOff { iteration, reference_iteration, delta } => {
                self.iterate_fixed(c.to_fixed(), delta.to_fixed(), iteration, reference_iteration)
            }
        }
    }

    /// The double precision loop, resuming at `iteration` with the orbit at `reference_iteration`.
    pub fn iterate_fixed(&self, c: ComplexFixed<f64>, mut delta: ComplexFixed<f64>, mut iteration: usize, mut reference_iteration: usize) -> usize {
        let orbit = &self.reference.reference_data;
        let last = orbit.len().saturating_sub(1);

        while iteration < self.maximum_iteration {
            let z = match orbit.get(reference_iteration) {
                Some(z) => *z,
                None => return self.maximum_iteration,
            };

            delta = z * delta * 2.0 + delta * delta + c;
            reference_iteration += 1;
            iteration += 1;

            let value = match orbit.get(reference_iteration) {
                Some(z) => z + delta,
                None => {
                    reference_iteration = 0;
                    delta
                }
            };

            let norm = value.norm_sqr();

            if norm > 4.0 {
                return iteration;
            }

            // rebase onto the start of the orbit
            if norm < delta.norm_sqr() || reference_iteration == last {
                delta = value;
                reference_iteration = 0;
            }
        }

        self.maximum_iteration
    }

    /// The extended range loop, used while the delta is too small for a double.
    pub fn iterate_extended(&self, c: ComplexExtended, mut delta: ComplexExtended, mut iteration: usize, mut reference_iteration: usize) -> Progress {
        let orbit = &self.reference.reference_data_extended;
        let last = orbit.len().saturating_sub(1);
        let escape_radius_squared = FloatExtended::from_parts(4.0, 0);

        while iteration < self.maximum_iteration {
            if fits_fixed(&delta) {
                return Progress::HandOff {
                    iteration,
                    reference_iteration,
                    delta
                };
            }

            let z = match orbit.get(reference_iteration) {
                Some(z) => *z,
                None => return Progress::Finished(self.maximum_iteration),
            };

            delta = z * 2.0 * delta + delta.square() + c;
            reference_iteration += 1;
            iteration += 1;

            let value = match orbit.get(reference_iteration) {
                Some(z) => *z + delta,
                None => {
                    reference_iteration = 0;
                    delta
                }
            };

            let norm = value.norm_square();

            if norm > escape_radius_squared {
                return Progress::Finished(iteration);
            }

            if norm < delta.norm_square() || reference_iteration == last {
                delta = value;
                reference_iteration = 0;
            }
        }

        Progress::Finished(self.maximum_iteration)
    }
}

#[inline]
fn fits_fixed(delta: &ComplexExtended) -> bool {
    (!delta.re.is_zero() && delta.re.exponent >= FIXED_EXPONENT_LIMIT)
        || (!delta.im.is_zero() && delta.im.exponent >= FIXED_EXPONENT_LIMIT)
}
