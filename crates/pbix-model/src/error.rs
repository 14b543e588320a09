use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    /// Field spec is not a `Table.Field` pair.
    #[error("invalid field reference '{spec}': expected Table.Field")]
    InvalidFieldSpec { spec: String },

    /// Hierarchy-level spec is not a `Table.Hierarchy.Level` triple.
    #[error("invalid hierarchy level '{spec}': expected Table.Hierarchy.Level")]
    InvalidLevelSpec { spec: String },

    /// Rename spec is not an `OLD=NEW` pair.
    #[error("invalid rename '{spec}': expected OLD=NEW")]
    InvalidRenameSpec { spec: String },

    /// Source and target of a rename are the same reference.
    #[error("rename '{spec}' maps a reference onto itself")]
    IdentityRename { spec: String },
}

pub type Result<T> = std::result::Result<T, SpecError>;
