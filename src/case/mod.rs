pub mod group;
pub mod locate;
pub mod name;

pub use group::{discover, survey, CaseGroup, GroupShape, Groups, Member};
pub use name::{parse, ParsedCase};
