pub mod error;
pub mod filters;
pub mod livestock;
pub mod models;
pub mod nearest;
pub mod report;
pub mod risk;
pub mod rpg;
pub mod spatial;
pub mod synthesis;
pub mod text;

pub use error::{CoreError, GeocodeFailure};
pub use filters::{NetworkKind, ReportFilters};
pub use models::{
    CollectionTag, Feature, FeatureCollection, FeatureIdentity, FeatureTag, GeocodeSource,
    LayerKind, Location, RawPayload,
};
pub use nearest::{nearest, DistanceKeys, DEFAULT_DISTANCE_SENTINEL_M};
pub use report::{CommuneInfo, CommuneReport, LayerDiagnostics};
pub use risk::{RiskBundle, RiskCategory, RiskSlot};
pub use spatial::{haversine_distance, BoundingBox};
pub use synthesis::{synthesize, DepartmentSynthesis, DEFAULT_TOP_N};
