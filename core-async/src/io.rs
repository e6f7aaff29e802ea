//! Async I/O traits and utilities.

pub use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite,
    AsyncWriteExt, BufReader, BufWriter, DuplexStream, ReadBuf,
};

/// In-memory pipe; handy for feeding byte streams in tests.
pub use tokio::io::duplex;

/// Boxed byte source handed across crate boundaries.
pub type DynAsyncRead = dyn AsyncRead + Send + Unpin;
