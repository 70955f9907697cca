pub mod endpoint;
pub mod endpoint_config;
pub mod error;
pub mod listing;
pub mod model;
pub mod naming;
pub mod teardown;
pub mod telemetry;

pub use endpoint::{EndpointDescription, EndpointStatus, EndpointSummary};
pub use endpoint_config::{
    EndpointConfig, EndpointConfigDescription, VariantDescription, DEFAULT_INSTANCE_TYPE,
    DEFAULT_VARIANT_NAME,
};
pub use error::{PlatformError, PlatformResult};
pub use listing::{ListFilter, ListingResult};
pub use model::{ModelArtifact, ModelSpec, ModelSummary, DEFAULT_MODEL_ID, DEFAULT_MODEL_VERSION};
pub use teardown::{DeleteReport, DeleteStep, ResourceKind, StepOutcome};
