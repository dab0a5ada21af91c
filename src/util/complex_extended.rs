use crate::error::ArithmeticError;
use crate::util::float_extended::FloatExtended;
use crate::util::ComplexFixed;

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::fmt::{Display, Formatter, Result};

/// Complex number with an extended range float on each axis.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ComplexExtended {
    pub re: FloatExtended,
    pub im: FloatExtended,
}

impl ComplexExtended {
    pub const ZERO: ComplexExtended = ComplexExtended {
        re: FloatExtended::ZERO,
        im: FloatExtended::ZERO
    };

    #[inline]
    pub fn new(re: FloatExtended, im: FloatExtended) -> Self {
        ComplexExtended {
            re,
            im
        }
    }

    /// Lossless for every finite double pair.
    #[inline]
    pub fn from_fixed(value: ComplexFixed<f64>) -> std::result::Result<Self, ArithmeticError> {
        Ok(ComplexExtended {
            re: FloatExtended::from_f64(value.re)?,
            im: FloatExtended::from_f64(value.im)?
        })
    }

    /// Lossy: components outside the double range saturate or flush to zero.
    #[inline]
    pub fn to_fixed(&self) -> ComplexFixed<f64> {
        ComplexFixed::new(self.re.to_float(), self.im.to_float())
    }

    #[inline]
    pub fn norm_square(&self) -> FloatExtended {
        self.re.square() + self.im.square()
    }

    #[inline]
    pub fn norm(&self) -> FloatExtended {
        self.norm_square().sqrt_unchecked()
    }

    #[inline]
    pub fn conj(&self) -> ComplexExtended {
        ComplexExtended {
            re: self.re,
            im: -self.im
        }
    }

    #[inline]
    pub fn square(&self) -> ComplexExtended {
        *self * *self
    }

    /// Smallest decimal exponent over the non-zero components, zero for the origin.
    #[inline]
    pub fn minimum_exponent(&self) -> i32 {
        match (self.re.is_zero(), self.im.is_zero()) {
            (true, true) => 0,
            (true, false) => self.im.exponent,
            (false, true) => self.re.exponent,
            (false, false) => self.re.exponent.min(self.im.exponent),
        }
    }

    /// Division through the conjugate: a / b = a * conj(b) / |b|^2.
    pub fn try_div(&self, other: ComplexExtended) -> std::result::Result<ComplexExtended, ArithmeticError> {
        let denominator = other.norm_square();
        let numerator = *self * other.conj();

        Ok(ComplexExtended {
            re: numerator.re.try_div(denominator)?,
            im: numerator.im.try_div(denominator)?
        })
    }
}

impl Neg for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn neg(self) -> Self::Output {
        ComplexExtended::new(-self.re, -self.im)
    }
}

impl Add<ComplexExtended> for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn add(self, other: Self) -> Self::Output {
        ComplexExtended::new(self.re + other.re, self.im + other.im)
    }
}

impl Sub<ComplexExtended> for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        ComplexExtended::new(self.re - other.re, self.im - other.im)
    }
}

impl Mul<ComplexExtended> for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn mul(self, other: Self) -> Self::Output {
        ComplexExtended::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re
        )
    }
}

impl Mul<FloatExtended> for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn mul(self, other: FloatExtended) -> Self::Output {
        ComplexExtended::new(self.re * other, self.im * other)
    }
}

impl Mul<f64> for ComplexExtended {
    type Output = ComplexExtended;

    #[inline]
    fn mul(self, other: f64) -> Self::Output {
        ComplexExtended::new(self.re * other, self.im * other)
    }
}

impl AddAssign for ComplexExtended {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.re += other.re;
        self.im += other.im;
    }
}

impl SubAssign for ComplexExtended {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.re -= other.re;
        self.im -= other.im;
    }
}

impl MulAssign<ComplexExtended> for ComplexExtended {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        let re = self.re * other.re - self.im * other.im;
        self.im = self.re * other.im + self.im * other.re;
        self.re = re;
    }
}

impl MulAssign<f64> for ComplexExtended {
    #[inline]
    fn mul_assign(&mut self, other: f64) {
        self.re *= other;
        self.im *= other;
    }
}

impl Display for ComplexExtended {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}+{}i", self.re, self.im)
    }
}
