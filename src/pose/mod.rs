#[cfg(feature = "desktop")]
pub mod blazepose;
pub mod estimator;
pub mod landmark;
#[cfg(feature = "desktop")]
pub mod preprocess;
pub mod roi;
pub mod smoothing;
pub mod tracker;

#[cfg(feature = "desktop")]
pub use blazepose::BlazePoseModel;
pub use estimator::{EstimatorOptions, ModelComplexity, PoseEstimator};
pub use landmark::{Landmark, LandmarkError, LandmarkIndex, LandmarkSet};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_blazepose;
pub use roi::Roi;
pub use smoothing::LandmarkSmoother;
pub use tracker::{LandmarkModel, LandmarkOutput, PoseTracker};
