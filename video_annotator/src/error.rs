use std::path::PathBuf;

/// Why a single video could not be processed. None of these stop the batch.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("could not open {}: {source:#}", path.display())]
    SourceOpen { path: PathBuf, source: anyhow::Error },
    #[error("could not create output video {}: {source:#}", path.display())]
    SinkOpen { path: PathBuf, source: anyhow::Error },
    #[error("decoding frame {frame} failed: {source:#}")]
    Read { frame: u64, source: anyhow::Error },
    #[error("resizing frame {frame} failed: {source:#}")]
    Resize { frame: u64, source: anyhow::Error },
    #[error("detection failed on frame {frame}: {source:#}")]
    Detect { frame: u64, source: anyhow::Error },
    #[error("writing frame {frame} failed: {source:#}")]
    Write { frame: u64, source: anyhow::Error },
    /// The output container could not be finalized after the last frame.
    #[error("finalizing {} failed: {source:#}", path.display())]
    Finalize { path: PathBuf, source: anyhow::Error },
}
