// mpn-core/src/pipeline/output.rs
use std::fs;
use std::io::Write;
use std::path::Path;

use mpn_common::error::{MpnError, Result as MpnResult};
use mpn_common::pipeline::OutputFile;
use tempfile::NamedTempFile;
use tracing::{debug, error};

/// Writes every file with contents below `dest`. Stops at the first failure.
pub fn write_outputs(dest: &Path, files: &[OutputFile]) -> MpnResult<usize> {
    let mut written = 0;
    for file in files {
        let Some(contents) = file.contents.as_deref() else {
            continue;
        };
        let target = dest.join(&file.relative);
        write_file_atomic(&target, contents)?;
        written += 1;
    }
    debug!("Wrote {} files to {}", written, dest.display());
    Ok(written)
}

fn write_file_atomic(target: &Path, contents: &[u8]) -> MpnResult<()> {
    let dir = target.parent().ok_or_else(|| {
        MpnError::Generic(format!(
            "Cannot get parent directory for {}",
            target.display()
        ))
    })?;
    fs::create_dir_all(dir).map_err(|e| MpnError::write(dir, e))?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| MpnError::write(target, e))?;
    temp_file
        .write_all(contents)
        .and_then(|_| temp_file.flush())
        .map_err(|e| MpnError::write(target, e))?;

    temp_file.persist(target).map_err(|e| {
        error!(
            "Failed to persist temporary file over {}: {}",
            target.display(),
            e.error
        );
        MpnError::write(target, e.error)
    })?;
    Ok(())
}
