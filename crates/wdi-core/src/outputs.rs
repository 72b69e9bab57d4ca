use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;

/// Persist the final table as a CSV artifact. Callers only reach this once
/// every merge, fill, and reduction step has succeeded, so a partial
/// artifact is never written.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}
