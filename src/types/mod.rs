pub mod context_bundle;
pub mod identifiers;
pub mod library;

pub use context_bundle::{
    ContentFragment, DocumentationRequest, DocumentationResult, ResolutionResult, ValidatedRequest,
};
pub use identifiers::{LibraryId, LibraryIdError};
pub use library::{LibraryRecord, SourceKind, SourceSpec, DEFAULT_SOURCE_TTL_SECONDS};
