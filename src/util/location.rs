use crate::error::LocationError;
use crate::util::complex_arbitrary::{digits_for_scale, HighPrecisionComplex};
use crate::util::FloatExtended;

use config::{Config, File, FileFormat};

/// The persisted parameters of a view: centre, scale and iteration limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub center: HighPrecisionComplex,
    pub scale: FloatExtended,
    pub maximum_iteration: usize,
}

impl Location {
    pub fn new(real: &str, imaginary: &str, scale: &str, maximum_iteration: usize) -> Result<Self, LocationError> {
        if maximum_iteration == 0 {
            return Err(LocationError::Iterations(0));
        }

        let scale = scale.parse::<FloatExtended>()?;
        let center = HighPrecisionComplex::parse(real, imaginary, digits_for_scale(scale))?;

        Ok(Location {
            center,
            scale,
            maximum_iteration
        })
    }

    /// Reads `real`, `imaginary`, `scale` and `iterations` from loaded settings.
    pub fn from_config(settings: &Config) -> Result<Self, LocationError> {
        let real = settings.get_str("real")?;
        let imaginary = settings.get_str("imaginary")?;
        let scale = settings.get_str("scale")?;
        let iterations = settings.get_int("iterations")?;

        if iterations < 1 {
            return Err(LocationError::Iterations(iterations));
        }

        Location::new(&real, &imaginary, &scale, iterations as usize)
    }

    pub fn from_toml(text: &str) -> Result<Self, LocationError> {
        let mut settings = Config::default();
        settings.merge(File::from_str(text, FileFormat::Toml))?;

        Location::from_config(&settings)
    }

    pub fn to_toml(&self) -> String {
        let (real, imaginary) = self.center.to_strings();

        format!(
            "real = \"{}\"\nimaginary = \"{}\"\nscale = \"{}\"\niterations = {}\n",
            real,
            imaginary,
            self.scale,
            self.maximum_iteration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip() {
        let location = Location::new(
            "-1.74999841099374081749002483162428393452822172335808534616943930976364725846655540417646727085571962736578151132907961927190726789896685696750162524460775546580822744596887978637416593715319388030232414667046419863755743802804780843375",
            "-0.00000000000000165712469295418692325810961981279189026504290127375760405334498110850956047368308707050735960323397389547038231194872482690340369921750514146922400928554011996123112902000856666847088788158433995358406779259404221904755",
            "2.5e-200",
            5000
        ).unwrap();

        let text = location.to_toml();
        let loaded = Location::from_toml(&text).unwrap();

        assert_eq!(loaded, location);
        assert_eq!(loaded.scale.exponent, -200);
        assert_eq!(loaded.center.digits(), 210);
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(Location::from_toml("real = \"0\"\nimaginary = \"0\"\nscale = \"x\"\niterations = 10\n").is_err());
        assert!(Location::from_toml("real = \"0\"\nimaginary = \"0\"\nscale = \"4\"\niterations = 0\n").is_err());
        assert!(Location::from_toml("real = \"0\"\nscale = \"4\"\niterations = 10\n").is_err());
        assert!(Location::from_toml("real = \"q\"\nimaginary = \"0\"\nscale = \"4\"\niterations = 10\n").is_err());
    }

    #[test]
    fn rejects_zero_iterations() {
        match Location::new("0", "0", "4", 0) {
            Err(LocationError::Iterations(0)) => {}
            other => panic!("expected an iteration count error, got {:?}", other),
        }

        assert!(Location::new("0", "0", "4", 1).is_ok());
    }
}
