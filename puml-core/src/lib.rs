//! PUML Core - Request, Identity and Error Types
//!
//! Pure data structures shared by every other crate in the workspace:
//! render requests, content-derived artifact identifiers, the injectable
//! clock used for access bookkeeping, the rendering seam, and the error
//! taxonomy.

pub mod clock;
pub mod error;
pub mod identity;
pub mod render;
pub mod request;

pub use clock::{duration_millis, Clock, ManualClock, SharedClock, SystemClock};
pub use error::{ConfigError, PumlError, PumlResult, RenderError, StorageError};
pub use identity::{identify, ArtifactId, ARTIFACT_ID_LEN};
pub use render::RenderGateway;
pub use request::{ArtifactBytes, OutputFormat, RenderRequest};
