mod buffer;
mod pipeline;
mod record;
mod session;
mod validation;

pub use buffer::BatchBuffer;
pub use pipeline::{IngestOutcome, StationIngest};
pub use record::{NormalizedRecord, RecordKind, METADATA_KEYS};
pub use session::{Fingerprint, SessionRule, SongSession, SongSessionTracker};
pub use validation::{FieldCheck, FieldRule, KeyPolicy, PayloadSchema, Schema};
