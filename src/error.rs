use thiserror::Error;

/// Failures of the extended range arithmetic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivideByZero,

    #[error("square root of negative value {0}")]
    DomainError(String),

    #[error("invalid extended float: {mantissa} e {exponent}")]
    Construction { mantissa: f64, exponent: i32 },

    #[error("could not parse extended float from '{0}'")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid coordinate '{0}'")]
    Coordinate(String),

    #[error("invalid scale: {0}")]
    Scale(#[from] ArithmeticError),

    #[error("invalid iteration count {0}")]
    Iterations(i64),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image dimensions must be non-zero, got {0}x{1}")]
    Dimensions(usize, usize),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to start render thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error(transparent)]
    Location(#[from] LocationError),
}
