//! Checksummed, atomically written value files.
//!
//! Every value written by the file backend carries an 8-byte footer:
//! `[payload][magic "HNS1"][u32 CRC32 BE]`. Writes go to a temp file that is
//! renamed over the target, so a crash never leaves a half-written value.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// Magic bytes placed before the CRC32 footer to distinguish checksummed files.
const FILE_CRC_MAGIC: &[u8; 4] = b"HNS1";
const FOOTER_LEN: usize = 8;

/// Appends the `[magic][CRC32 BE]` footer to `payload`.
pub fn encode_checked(payload: &[u8]) -> Vec<u8> {
    let crc = crc32fast::hash(payload);
    let mut output = Vec::with_capacity(payload.len() + FOOTER_LEN);
    output.extend_from_slice(payload);
    output.extend_from_slice(FILE_CRC_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());
    output
}

/// Strips and verifies the footer, returning the payload.
///
/// Files without a footer are accepted as legacy values. A footer whose CRC
/// does not match the payload is an `InvalidData` error.
pub fn decode_checked<'a>(raw: &'a [u8], path: &Path) -> io::Result<&'a [u8]> {
    let n = raw.len();
    if n < FOOTER_LEN || &raw[n - 8..n - 4] != FILE_CRC_MAGIC {
        tracing::warn!("{:?} has no CRC32 checksum (legacy format)", path);
        return Ok(raw);
    }

    let payload = &raw[..n - FOOTER_LEN];
    let stored_crc = u32::from_be_bytes([raw[n - 4], raw[n - 3], raw[n - 2], raw[n - 1]]);
    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "CRC32 mismatch: expected {:#010x}, got {:#010x}. File may be corrupted: {:?}",
                stored_crc, computed_crc, path
            ),
        ));
    }
    tracing::debug!("CRC32 verified for {:?}: {:#010x}", path, stored_crc);
    Ok(payload)
}

/// Creates `dir` (and parents) with owner-only permissions on unix.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }
    Ok(())
}

/// Writes `payload` with a checksum footer to `path` via temp file + rename.
///
/// The temp file is `.<name>.tmp` next to `path`. Collection keys cannot start
/// with a dot, so it never shadows a stored key.
pub fn write_checked(path: &Path, payload: &[u8]) -> io::Result<()> {
    let output = encode_checked(payload);
    let Some(file_name) = path.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{path:?} has no file name"),
        ));
    };
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    let tmp_path = tmp_path.as_path();

    fs::write(tmp_path, &output)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp_path, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(tmp_path, path)?;

    tracing::debug!(
        "Wrote {:?} ({} bytes, CRC32={:#010x})",
        path,
        payload.len(),
        crc32fast::hash(payload)
    );
    Ok(())
}

/// Reads and verifies the value at `path`. A missing file is `Ok(None)`.
pub fn read_checked(path: &Path) -> io::Result<Option<Vec<u8>>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let payload = decode_checked(&raw, path)?;
    Ok(Some(payload.to_vec()))
}
