use crate::error::LocationError;
use crate::util::{ComplexArbitrary, ComplexExtended, FloatArbitrary, FloatExtended, ComplexFixed, to_extended, to_fixed, extended_to_arbitrary};

use std::f64::consts::LOG2_10;

/// Digits kept beyond the scale exponent when deriving precision.
pub const PRECISION_MARGIN: i32 = 10;

/// Never drop below the precision of a double.
const MINIMUM_BITS: u32 = 64;

/// Significant decimal digits needed for a view of the given scale.
#[inline]
pub fn digits_for_scale(scale: FloatExtended) -> u32 {
    (PRECISION_MARGIN - scale.exponent).max(1) as u32
}

#[inline]
pub fn bits_for_digits(digits: u32) -> u32 {
    ((digits as f64 * LOG2_10).ceil() as u32).max(MINIMUM_BITS)
}

/// An arbitrary precision complex number tied to a significant digit count.
///
/// Whenever the value is replaced the digit count is applied again, so the
/// precision follows the view rather than whatever produced the value.
#[derive(Debug, Clone, PartialEq)]
pub struct HighPrecisionComplex {
    value: ComplexArbitrary,
    digits: u32,
}

impl HighPrecisionComplex {
    pub fn zero(digits: u32) -> Self {
        HighPrecisionComplex {
            value: ComplexArbitrary::new(bits_for_digits(digits)),
            digits
        }
    }

    /// Parses decimal text for each component.
    pub fn parse(real: &str, imaginary: &str, digits: u32) -> Result<Self, LocationError> {
        let bits = bits_for_digits(digits);

        // parse at the textual precision, rounding happens in set_digits
        let parse_bits = bits.max(bits_for_digits(real.len().max(imaginary.len()) as u32));

        let re = FloatArbitrary::parse(real.trim())
            .map_err(|_| LocationError::Coordinate(real.to_owned()))?;
        let im = FloatArbitrary::parse(imaginary.trim())
            .map_err(|_| LocationError::Coordinate(imaginary.to_owned()))?;

        let value = ComplexArbitrary::with_val(
            parse_bits,
            (FloatArbitrary::with_val(parse_bits, re), FloatArbitrary::with_val(parse_bits, im))
        );

        let mut output = HighPrecisionComplex {
            value,
            digits
        };
        output.set_digits(digits);
        Ok(output)
    }

    pub fn from_value(value: ComplexArbitrary, digits: u32) -> Self {
        let mut output = HighPrecisionComplex {
            value,
            digits
        };
        output.set_digits(digits);
        output
    }

    #[inline]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        bits_for_digits(self.digits)
    }

    pub fn set_digits(&mut self, digits: u32) {
        self.digits = digits;
        self.value.set_prec(bits_for_digits(digits));
    }

    #[inline]
    pub fn value(&self) -> &ComplexArbitrary {
        &self.value
    }

    #[inline]
    pub fn real(&self) -> &FloatArbitrary {
        self.value.real()
    }

    #[inline]
    pub fn imag(&self) -> &FloatArbitrary {
        self.value.imag()
    }

    /// Replaces the value, keeping the current digit count.
    pub fn replace(&mut self, value: ComplexArbitrary) {
        self.value = value;
        self.value.set_prec(self.bits());
    }

    /// Offsets the value by an extended precision delta at the current precision.
    pub fn add_extended(&self, delta: ComplexExtended) -> HighPrecisionComplex {
        let mut value = self.value.clone();
        value += extended_to_arbitrary(delta, self.bits());

        HighPrecisionComplex::from_value(value, self.digits)
    }

    /// z = z^2 + c, in place.
    #[inline]
    pub fn square_add_mut(&mut self, c: &HighPrecisionComplex) {
        self.value.square_mut();
        self.value += &c.value;
    }

    #[inline]
    pub fn to_extended(&self) -> ComplexExtended {
        to_extended(&self.value)
    }

    #[inline]
    pub fn to_fixed(&self) -> ComplexFixed<f64> {
        to_fixed(&self.value)
    }

    /// Decimal text for each component, precise enough to rebuild the same binary value.
    pub fn to_strings(&self) -> (String, String) {
        (
            self.value.real().to_string_radix(10, None),
            self.value.imag().to_string_radix(10, None)
        )
    }
}
