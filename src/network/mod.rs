//! Network subsystem: the inbound byte stream and its arrival queue

pub mod queue;
pub mod source;

pub use queue::{ChunkQueue, QueueStats, RawChunk};
pub use source::{ByteSource, TcpByteSource};
