pub mod arrow;
pub mod project;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use project::{project, ProjectedTable};
pub use types::{CanonicalColumn, ColumnKind, SchoolType, PRESENT_CODE};
