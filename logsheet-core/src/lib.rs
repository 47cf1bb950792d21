pub mod align;
pub mod analysis;
pub mod consts;
pub mod ensemble;
pub mod error;
pub mod layout;
pub mod process;
pub mod resolve;
pub mod visualise;

// Re-export commonly used types
pub use align::{AlignConfig, align};
pub use ensemble::Ensemble;
pub use error::LogsheetError;
pub use layout::{
    config::LogsheetConfig,
    element::{ContentType, Detection, Residual, Roi, Service, ServiceMap},
};
pub use process::{PageInput, PageReport, Processor};
pub use resolve::{CandidateValue, Candidates, ResolveConfig, RoiValue};
