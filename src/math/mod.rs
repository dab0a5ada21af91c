pub mod reference;
pub mod perturbation;
pub mod series_approximation;

pub use reference::Reference;
pub use perturbation::Perturbation;
pub use series_approximation::SeriesApproximation;
