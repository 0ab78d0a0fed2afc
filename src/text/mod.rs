pub mod bidi;
pub mod normalize;
pub mod rules;

pub use bidi::{repair, repair_with_stats, RepairStats};
pub use normalize::{normalize, normalize_with, EmptyDocument};
pub use rules::{CompiledRules, RuleSet};
