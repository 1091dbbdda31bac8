mod scheduler;
mod sink;

pub use scheduler::{upload_key, BatchUpload, FlushReport, UploadScheduler};
pub use sink::{BatchSink, ObjectStoreSink, SinkError};
