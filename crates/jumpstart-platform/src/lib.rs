pub mod catalog;
pub mod memory;
pub mod sagemaker;
pub mod types;

pub use catalog::{JumpStartCatalog, StaticCatalog};
pub use memory::{Call, MemoryPlatform};
pub use sagemaker::{SageMakerOptions, SageMakerPlatform};
pub use types::{CatalogQuery, ModelCatalog, Platform};
