pub mod error;
pub mod math;
pub mod renderer;
pub mod util;

pub use error::{ArithmeticError, LocationError, RenderError};
pub use renderer::{FractalRenderer, RenderOutcome};
pub use util::location::Location;
