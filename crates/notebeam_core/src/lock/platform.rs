//! OS advisory lock through `fs2`: `flock` on unix, `LockFileEx` over the
//! whole file on windows.

use super::LockStrategy;
use fs2::FileExt;
use std::fs::File;
use std::io;

/// Whole-file exclusive lock, non-blocking.
///
/// On unix the lock belongs to the open file description, so two handles
/// opened by the same process still contend.
pub struct OsFileLock;

impl LockStrategy for OsFileLock {
    fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        // Fully qualified: newer std has inherent `File` lock methods.
        match FileExt::try_lock_exclusive(file) {
            Ok(()) => Ok(true),
            Err(err) if is_lock_contended(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn unlock(file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }
}

fn is_lock_contended(err: &io::Error) -> bool {
    match (err.raw_os_error(), fs2::lock_contended_error().raw_os_error()) {
        (Some(code), Some(contended)) => code == contended,
        _ => err.kind() == io::ErrorKind::WouldBlock,
    }
}
