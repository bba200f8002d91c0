//! Machine construction and media errors.

use std::path::PathBuf;

use fujitsu_mb8876::ImageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Mbc200Error {
    #[error("{name}: expected {expected} bytes, got {actual}")]
    RomSize {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("disk image: {0}")]
    Disk(#[from] ImageError),

    #[error("no floppy drive {unit} on this model")]
    NoSuchDrive { unit: usize },
}
