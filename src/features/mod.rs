//! Features module - raw records, the shared transform, and batch cleaning.

pub mod fields;
pub mod normalize;
pub mod record;
pub mod transform;

pub use fields::{ENGINEERED_FEATURES, FEATURE_COUNT};
pub use normalize::{normalize, NormalizedBatch, RawRow};
pub use record::{EngineeredRecord, RawRecord};
pub use transform::{derive, resolve_total_delinquencies, ImputeStats};
