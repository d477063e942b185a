pub mod best_read;
pub mod coverage;
pub mod percentile;
pub mod reference_profile;
pub mod tiers;

pub use best_read::{best_hit_per_read, best_hit_per_read_nonempty};
pub use coverage::{coverage_bins, CoverageReport, ReferenceLengths};
pub use percentile::compute_thresholds;
pub use reference_profile::build_reference_profiles;
pub use tiers::build_tiers;
