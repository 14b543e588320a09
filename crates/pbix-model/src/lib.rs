pub mod error;
pub mod path;
pub mod reference;
pub mod request;
pub mod result;

pub use error::{Result, SpecError};
pub use path::{NodePath, PathSegment};
pub use reference::{FieldKind, FieldReference};
pub use request::RewriteRequest;
pub use result::{
    FieldOccurrence, OccurrenceForm, RewriteChange, RewriteResult, RewriteWarning, WarningKind,
};
