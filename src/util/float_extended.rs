use crate::error::ArithmeticError;

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::OnceLock;

const MINIMUM_POWER: i32 = -324;
const MAXIMUM_POWER: i32 = 308;

/// Operands whose decimal exponents differ by more than this are not combined;
/// the larger one is returned as is.
pub const DROP_THRESHOLD: i32 = 16;

static POWERS_OF_TEN: OnceLock<Vec<f64>> = OnceLock::new();

fn power_table() -> &'static [f64] {
    POWERS_OF_TEN.get_or_init(|| {
        // parsing gives the correctly rounded power, powi does not
        (MINIMUM_POWER..=MAXIMUM_POWER)
            .map(|exponent| format!("1e{}", exponent).parse::<f64>().unwrap_or(0.0))
            .collect()
    })
}

/// 10^exponent as a double, saturating to 0 and infinity outside the double range.
#[inline]
pub fn power_of_ten(exponent: i32) -> f64 {
    if exponent < MINIMUM_POWER {
        0.0
    } else if exponent > MAXIMUM_POWER {
        f64::INFINITY
    } else {
        power_table()[(exponent - MINIMUM_POWER) as usize]
    }
}

/// value * 10^exponent, stepping through large exponents so intermediate
/// factors stay representable.
#[inline]
fn shift(mut value: f64, mut exponent: i32) -> f64 {
    while exponent > 300 {
        value *= 1e300;
        exponent -= 300;
    }

    while exponent < -300 {
        value /= 1e300;
        exponent += 300;
    }

    if exponent >= 0 {
        value * power_of_ten(exponent)
    } else {
        value / power_of_ten(-exponent)
    }
}

/// A double with a separate decimal exponent: value = mantissa * 10^exponent.
///
/// Non-zero values keep `1 <= |mantissa| < 10`, zero is stored as `0e0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FloatExtended {
    pub mantissa: f64,
    pub exponent: i32,
}

impl FloatExtended {
    pub const ZERO: FloatExtended = FloatExtended { mantissa: 0.0, exponent: 0 };
    pub const ONE: FloatExtended = FloatExtended { mantissa: 1.0, exponent: 0 };

    /// Checked constructor, rejects NaN and infinite mantissas.
    pub fn new(mantissa: f64, exponent: i32) -> Result<Self, ArithmeticError> {
        if !mantissa.is_finite() {
            return Err(ArithmeticError::Construction { mantissa, exponent });
        }

        Ok(FloatExtended::from_parts(mantissa, exponent))
    }

    pub fn from_f64(value: f64) -> Result<Self, ArithmeticError> {
        FloatExtended::new(value, 0)
    }

    /// Builds and normalizes a value whose mantissa is already known to be finite.
    #[inline]
    pub(crate) fn from_parts(mantissa: f64, exponent: i32) -> Self {
        debug_assert!(mantissa.is_finite());

        let mut output = FloatExtended {
            mantissa,
            exponent
        };
        output.reduce();
        output
    }

    #[inline]
    pub fn reduce(&mut self) {
        if self.mantissa == 0.0 {
            self.mantissa = 0.0;
            self.exponent = 0;
            return;
        }

        let magnitude = self.mantissa.abs();

        if (1.0..10.0).contains(&magnitude) {
            return;
        }

        let added_exponent = magnitude.log10().floor() as i32;
        self.mantissa = shift(self.mantissa, -added_exponent);
        self.exponent = self.exponent.saturating_add(added_exponent);

        // log10 can land one decade off near exact powers
        let magnitude = self.mantissa.abs();

        if magnitude >= 10.0 {
            self.mantissa /= 10.0;
            self.exponent = self.exponent.saturating_add(1);
        } else if magnitude < 1.0 {
            self.mantissa *= 10.0;
            self.exponent = self.exponent.saturating_sub(1);
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }

    #[inline]
    pub fn abs(&self) -> FloatExtended {
        FloatExtended {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent
        }
    }

    #[inline]
    pub fn square(&self) -> FloatExtended {
        *self * *self
    }

    #[inline]
    pub fn sqrt(&self) -> Result<FloatExtended, ArithmeticError> {
        if self.mantissa < 0.0 {
            return Err(ArithmeticError::DomainError(self.to_string()));
        }

        Ok(self.sqrt_unchecked())
    }

    /// Square root of a value already known to be non-negative.
    #[inline]
    pub(crate) fn sqrt_unchecked(&self) -> FloatExtended {
        if self.mantissa == 0.0 {
            return FloatExtended::ZERO;
        }

        let (new_mantissa, new_exponent) = if self.exponent.rem_euclid(2) == 0 {
            (self.mantissa.abs().sqrt(), self.exponent.div_euclid(2))
        } else {
            ((10.0 * self.mantissa.abs()).sqrt(), (self.exponent - 1).div_euclid(2))
        };

        FloatExtended::from_parts(new_mantissa, new_exponent)
    }

    #[inline]
    pub fn try_div(&self, other: FloatExtended) -> Result<FloatExtended, ArithmeticError> {
        if other.mantissa == 0.0 {
            return Err(ArithmeticError::DivideByZero);
        }

        Ok(FloatExtended::from_parts(
            self.mantissa / other.mantissa,
            self.exponent.saturating_sub(other.exponent)
        ))
    }

    /// Converts to a double, saturating to infinity or flushing to zero outside its range.
    #[inline]
    pub fn to_float(&self) -> f64 {
        if self.mantissa == 0.0 {
            0.0
        } else if self.exponent > MAXIMUM_POWER + 1 {
            self.mantissa.signum() * f64::INFINITY
        } else if self.exponent < MINIMUM_POWER - 1 {
            0.0
        } else {
            shift(self.mantissa, self.exponent)
        }
    }

    /// Formats as `<mantissa>e<exponent>` with a fixed number of mantissa decimals.
    pub fn to_fixed(&self, digits: usize) -> String {
        let rounded = format!("{:.*}", digits, self.mantissa);

        match rounded.parse::<f64>() {
            // rounding carried the mantissa into the next decade
            Ok(value) if value.abs() >= 10.0 => {
                format!("{:.*}e{}", digits, self.mantissa / 10.0, self.exponent + 1)
            }
            _ => format!("{}e{}", rounded, self.exponent),
        }
    }

    #[inline]
    fn aligned_sum(self, other: FloatExtended) -> FloatExtended {
        if other.mantissa == 0.0 {
            return self;
        }

        if self.mantissa == 0.0 {
            return other;
        }

        let difference = self.exponent as i64 - other.exponent as i64;

        if difference > DROP_THRESHOLD as i64 {
            self
        } else if difference < -(DROP_THRESHOLD as i64) {
            other
        } else if difference >= 0 {
            FloatExtended::from_parts(
                self.mantissa + other.mantissa / power_of_ten(difference as i32),
                self.exponent
            )
        } else {
            FloatExtended::from_parts(
                other.mantissa + self.mantissa / power_of_ten(-difference as i32),
                other.exponent
            )
        }
    }
}

impl Default for FloatExtended {
    fn default() -> Self {
        FloatExtended::ZERO
    }
}

impl TryFrom<f64> for FloatExtended {
    type Error = ArithmeticError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        FloatExtended::from_f64(value)
    }
}

impl PartialOrd for FloatExtended {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        fn sign(value: f64) -> i8 {
            if value > 0.0 {
                1
            } else if value < 0.0 {
                -1
            } else {
                0
            }
        }

        if self.mantissa.is_nan() || other.mantissa.is_nan() {
            return None;
        }

        let self_sign = sign(self.mantissa);

        match self_sign.cmp(&sign(other.mantissa)) {
            Ordering::Equal => {},
            ordering => return Some(ordering),
        }

        if self_sign == 0 {
            return Some(Ordering::Equal);
        }

        let magnitude = match self.exponent.cmp(&other.exponent) {
            Ordering::Equal => self.mantissa.abs().partial_cmp(&other.mantissa.abs())?,
            ordering => ordering,
        };

        if self_sign > 0 {
            Some(magnitude)
        } else {
            Some(magnitude.reverse())
        }
    }
}

impl Neg for FloatExtended {
    type Output = FloatExtended;

    #[inline]
    fn neg(self) -> Self::Output {
        FloatExtended {
            mantissa: -self.mantissa,
            exponent: self.exponent
        }
    }
}

impl Add<FloatExtended> for FloatExtended {
    type Output = FloatExtended;

    #[inline]
    fn add(self, other: Self) -> Self::Output {
        self.aligned_sum(other)
    }
}

impl Sub<FloatExtended> for FloatExtended {
    type Output = FloatExtended;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        self.aligned_sum(-other)
    }
}

impl Mul<FloatExtended> for FloatExtended {
    type Output = FloatExtended;

    #[inline]
    fn mul(self, other: Self) -> Self::Output {
        if self.mantissa == 0.0 || other.mantissa == 0.0 {
            return FloatExtended::ZERO;
        }

        FloatExtended::from_parts(
            self.mantissa * other.mantissa,
            self.exponent.saturating_add(other.exponent)
        )
    }
}

impl Mul<f64> for FloatExtended {
    type Output = FloatExtended;

    #[inline]
    fn mul(self, other: f64) -> Self::Output {
        self * FloatExtended::from_parts(other, 0)
    }
}

impl Mul<FloatExtended> for f64 {
    type Output = FloatExtended;

    #[inline]
    fn mul(self, other: FloatExtended) -> Self::Output {
        FloatExtended::from_parts(self, 0) * other
    }
}

impl AddAssign for FloatExtended {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = self.aligned_sum(other);
    }
}

impl SubAssign for FloatExtended {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = self.aligned_sum(-other);
    }
}

impl MulAssign<FloatExtended> for FloatExtended {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl MulAssign<f64> for FloatExtended {
    #[inline]
    fn mul_assign(&mut self, other: f64) {
        *self = *self * other;
    }
}

impl FromStr for FloatExtended {
    type Err = ArithmeticError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();

        let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
            Some(index) => (&text[..index], &text[(index + 1)..]),
            None => (text, "0"),
        };

        let mantissa = mantissa.parse::<f64>()
            .map_err(|_| ArithmeticError::Parse(text.to_owned()))?;
        let exponent = exponent.parse::<i32>()
            .map_err(|_| ArithmeticError::Parse(text.to_owned()))?;

        FloatExtended::new(mantissa, exponent)
    }
}

impl fmt::Display for FloatExtended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(actual: f64, expected: f64, scale: f64) -> bool {
        (actual - expected).abs() <= 1e-14 * scale.max(f64::MIN_POSITIVE)
    }

    #[test]
    fn normalizes_into_decade() {
        let values = [1.0, -1.0, 0.5, 9.99, 10.0, 1e10, 1e-10, 123456.789, -0.000321];

        for value in values.iter() {
            let extended = FloatExtended::from_f64(*value).unwrap();
            let magnitude = extended.mantissa.abs();

            assert!((1.0..10.0).contains(&magnitude), "mantissa {} for {}", extended.mantissa, value);
            assert!(close(extended.to_float(), *value, value.abs()));
        }
    }

    #[test]
    fn zero_is_canonical() {
        let zero = FloatExtended::from_parts(0.0, 57);

        assert_eq!(zero, FloatExtended::ZERO);
        assert!(zero.is_zero());
        assert_eq!(zero.to_float(), 0.0);
    }

    #[test]
    fn rejects_non_finite_mantissa() {
        assert!(matches!(FloatExtended::new(f64::NAN, 0), Err(ArithmeticError::Construction { .. })));
        assert!(matches!(FloatExtended::new(f64::INFINITY, 3), Err(ArithmeticError::Construction { .. })));
        assert!(FloatExtended::try_from(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn addition_drops_negligible_operand() {
        let large = FloatExtended::new(1.0, 50).unwrap();
        let small = FloatExtended::new(1.0, 10).unwrap();

        assert_eq!(large + small, large);
        assert_eq!(small + large, large);
        assert_eq!(large - small, large);
        assert_eq!(small - large, -large);

        let mut accumulated = large;
        accumulated += small;
        assert_eq!(accumulated, large);
    }

    #[test]
    fn addition_keeps_operands_within_threshold() {
        let large = FloatExtended::new(1.0, 16).unwrap();
        let small = FloatExtended::new(1.0, 0).unwrap();

        assert_eq!(large + small, FloatExtended::from_parts(1.0 + 1e-16, 16));
        assert_ne!(FloatExtended::new(1.0, 10).unwrap() + small, FloatExtended::new(1.0, 10).unwrap());
    }

    #[test]
    fn values_beyond_double_range() {
        let tiny = FloatExtended::new(3.0, -400).unwrap();
        let product = tiny * tiny;

        assert_eq!(product.exponent, -799);
        assert!((product.mantissa - 9.0).abs() < 1e-12);
        assert_eq!(product.to_float(), 0.0);

        let huge = FloatExtended::new(5.0, 500).unwrap();
        assert_eq!(huge.to_float(), f64::INFINITY);
        assert!(huge > tiny);
        assert!(-huge < tiny);
    }

    #[test]
    fn division_by_zero_fails() {
        let value = FloatExtended::new(2.5, 3).unwrap();

        assert_eq!(value.try_div(FloatExtended::ZERO), Err(ArithmeticError::DivideByZero));
        assert_eq!(value.try_div(value).unwrap(), FloatExtended::ONE);
    }

    #[test]
    fn square_root() {
        let even = FloatExtended::new(4.0, 100).unwrap().sqrt().unwrap();
        assert_eq!(even.exponent, 50);
        assert!((even.mantissa - 2.0).abs() < 1e-15);

        let odd = FloatExtended::new(2.5, -301).unwrap().sqrt().unwrap();
        assert_eq!(odd.exponent, -151);
        assert!((odd.mantissa - 5.0).abs() < 1e-15);

        assert!(matches!(FloatExtended::new(-1.0, 4).unwrap().sqrt(), Err(ArithmeticError::DomainError(_))));
        assert_eq!(FloatExtended::ZERO.sqrt().unwrap(), FloatExtended::ZERO);
    }

    #[test]
    fn ordering_handles_signs_and_zero() {
        let negative_big = FloatExtended::new(-2.0, 10).unwrap();
        let negative_small = FloatExtended::new(-2.0, -10).unwrap();
        let positive = FloatExtended::new(1.0, -300).unwrap();

        assert!(negative_big < negative_small);
        assert!(negative_small < FloatExtended::ZERO);
        assert!(FloatExtended::ZERO < positive);
        assert!(positive > negative_big);
        assert_eq!(FloatExtended::ZERO.partial_cmp(&FloatExtended::ZERO), Some(Ordering::Equal));
    }

    #[test]
    fn parses_and_formats() {
        let value: FloatExtended = "1.5e-400".parse().unwrap();
        assert_eq!(value, FloatExtended::new(1.5, -400).unwrap());
        assert_eq!(value.to_string(), "1.5e-400");

        let unnormalized: FloatExtended = "250E3".parse().unwrap();
        assert_eq!(unnormalized.to_string(), "2.5e5");

        let plain: FloatExtended = "4".parse().unwrap();
        assert_eq!(plain, FloatExtended::new(4.0, 0).unwrap());

        assert!("abc".parse::<FloatExtended>().is_err());
        assert!("1e".parse::<FloatExtended>().is_err());
        assert!("NaN".parse::<FloatExtended>().is_err());
    }

    #[test]
    fn fixed_formatting_carries_rounding() {
        assert_eq!(FloatExtended::new(1.23456, 7).unwrap().to_fixed(2), "1.23e7");
        assert_eq!(FloatExtended::new(9.999, -3).unwrap().to_fixed(2), "1.00e-2");
    }

    #[test]
    fn in_place_operations_match_allocating() {
        let a = FloatExtended::new(3.25, -20).unwrap();
        let b = FloatExtended::new(-7.5, -22).unwrap();

        let mut sum = a;
        sum += b;
        assert_eq!(sum, a + b);

        let mut difference = a;
        difference -= b;
        assert_eq!(difference, a - b);

        let mut product = a;
        product *= b;
        assert_eq!(product, a * b);

        let mut scaled = a;
        scaled *= 2.0;
        assert_eq!(scaled, a * 2.0);
    }

    fn double() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1e100f64..1e100f64,
            -1e-3f64..1e-3f64,
            -10.0f64..10.0f64,
        ]
    }

    proptest! {
        #[test]
        fn addition_matches_doubles(a in double(), b in double()) {
            let sum = FloatExtended::from_f64(a).unwrap() + FloatExtended::from_f64(b).unwrap();
            prop_assert!(close(sum.to_float(), a + b, a.abs().max(b.abs())), "{} + {} = {}", a, b, sum);
        }

        #[test]
        fn subtraction_matches_doubles(a in double(), b in double()) {
            let difference = FloatExtended::from_f64(a).unwrap() - FloatExtended::from_f64(b).unwrap();
            prop_assert!(close(difference.to_float(), a - b, a.abs().max(b.abs())));
        }

        #[test]
        fn multiplication_matches_doubles(a in double(), b in double()) {
            let product = FloatExtended::from_f64(a).unwrap() * FloatExtended::from_f64(b).unwrap();
            prop_assert!(close(product.to_float(), a * b, (a * b).abs()));
        }

        #[test]
        fn division_matches_doubles(a in double(), b in double()) {
            prop_assume!(b != 0.0);
            let quotient = FloatExtended::from_f64(a).unwrap().try_div(FloatExtended::from_f64(b).unwrap()).unwrap();
            prop_assert!(close(quotient.to_float(), a / b, (a / b).abs()));
        }

        #[test]
        fn ordering_matches_doubles(a in double(), b in double()) {
            let ordering = FloatExtended::from_f64(a).unwrap().partial_cmp(&FloatExtended::from_f64(b).unwrap());
            prop_assert_eq!(ordering, a.partial_cmp(&b));
        }
    }
}
