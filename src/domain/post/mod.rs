pub mod entity;
pub mod invariants;
pub mod transitions;

pub use entity::{MediaType, PostId, PostMetadata, PostRecord, PostStatus};
pub use invariants::validate_post;
pub use transitions::{can_transition, Reachability, TransitionOrigin, ValidationReport};
