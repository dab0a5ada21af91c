use rug::ops::Pow;

pub mod float_extended;
pub mod complex_extended;
pub mod complex_arbitrary;
pub mod colouring;
pub mod grid;
pub mod image;
pub mod location;
pub mod progress;
pub mod recalculate;

pub use complex_extended::ComplexExtended;
pub use float_extended::FloatExtended;
pub use complex_arbitrary::HighPrecisionComplex;

pub type ComplexFixed<T> = num_complex::Complex<T>;
pub type ComplexArbitrary = rug::Complex;
pub type FloatArbitrary = rug::Float;

#[inline]
pub fn to_fixed(value: &ComplexArbitrary) -> ComplexFixed<f64> {
    let re = value.real().to_f64();
    let im = value.imag().to_f64();

    ComplexFixed::new(re, im)
}

/// Downcasts an arbitrary precision float, keeping its full exponent range.
pub fn float_to_extended(value: &FloatArbitrary) -> FloatExtended {
    // zero, infinities and NaN have no meaningful decimal exponent
    if !value.is_normal() {
        return FloatExtended::ZERO;
    }

    let approximate = value.to_f64();
    let magnitude = approximate.abs();

    if magnitude > 1e-300 && magnitude < 1e300 {
        return FloatExtended::from_parts(approximate, 0);
    }

    let exponent = FloatArbitrary::with_val(64, value.abs_ref())
        .log10()
        .floor()
        .to_i32_saturating()
        .unwrap_or(0);

    let mut scaled = value.clone();
    scaled /= FloatArbitrary::with_val(value.prec(), 10).pow(exponent);

    FloatExtended::from_parts(scaled.to_f64(), exponent)
}

pub fn to_extended(value: &ComplexArbitrary) -> ComplexExtended {
    ComplexExtended::new(
        float_to_extended(value.real()),
        float_to_extended(value.imag())
    )
}

pub fn extended_to_float(value: FloatExtended, precision: u32) -> FloatArbitrary {
    let power = FloatArbitrary::with_val(precision, 10).pow(value.exponent);
    FloatArbitrary::with_val(precision, value.mantissa) * power
}

pub fn extended_to_arbitrary(value: ComplexExtended, precision: u32) -> ComplexArbitrary {
    ComplexArbitrary::with_val(
        precision,
        (extended_to_float(value.re, precision), extended_to_float(value.im, precision))
    )
}
