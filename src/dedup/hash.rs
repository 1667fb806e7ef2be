//! Streaming content digest for duplicate detection.
//!
//! MD5 is sufficient here: the threat model is accidental duplication of
//! downloaded documents, not adversarial collisions.

use std::io;
use std::path::Path;

use tokio::io::AsyncReadExt;

/// Read buffer size for digest streaming.
const BUF_SIZE: usize = 64 * 1024;

/// Computes the hex-encoded MD5 digest of a file, streaming its contents.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be opened or read.
pub async fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}
