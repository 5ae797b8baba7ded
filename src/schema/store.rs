// src/schema/store.rs

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

/// `.<name>.tmp` next to `path`; renamed over `path` once fully written.
fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Run `write` against a temporary sibling, then rename it over `path`.
pub fn write_atomic(path: &Path, write: impl FnOnce(&mut fs::File) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let tmp = tmp_path(path);
    let mut file = fs::File::create(&tmp).with_context(|| format!("creating {:?}", tmp))?;
    let written = write(&mut file).and_then(|()| Ok(file.flush()?));
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}

/// Read a comma-separated table with a header row into typed records.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize().enumerate() {
        let rec: T =
            rec.with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        out.push(rec);
    }
    debug!(path = %path.display(), rows = out.len(), "read table");
    Ok(out)
}

/// Write typed records as a comma-separated table, overwriting `path`.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    write_atomic(path, |file| {
        let mut wtr = csv::Writer::from_writer(file);
        for rec in records {
            wtr.serialize(rec)
                .with_context(|| format!("serializing row for {}", path.display()))?;
        }
        wtr.flush()?;
        Ok(())
    })?;
    debug!(path = %path.display(), rows = records.len(), "wrote table");
    Ok(())
}

/// Pretty JSON with a trailing newline, overwriting `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |file| {
        serde_json::to_writer_pretty(&mut *file, value)
            .with_context(|| format!("serializing {}", path.display()))?;
        file.write_all(b"\n")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{BirthRecord, SpendingRecord};
    use tempfile::tempdir;

    #[test]
    fn records_survive_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/df_births.csv");
        let rows = vec![
            BirthRecord { year: 2000, mun_code: 110001, births: 412 },
            BirthRecord { year: 2000, mun_code: 110002, births: 0 },
        ];
        write_records(&path, &rows)?;
        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("year,mun_code,births\n2000,110001,412\n"));
        let back: Vec<BirthRecord> = read_records(&path)?;
        assert_eq!(back, rows);
        assert!(!dir.path().join("nested/.df_births.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn failed_write_leaves_nothing_behind() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("df_final.csv");
        fs::write(&path, "old\n")?;
        let err = write_atomic(&path, |file| {
            file.write_all(b"partial")?;
            anyhow::bail!("encoder failed")
        })
        .unwrap_err();
        assert!(err.to_string().contains("encoder failed"));
        assert!(!dir.path().join(".df_final.csv.tmp").exists());
        assert_eq!(fs::read_to_string(&path)?, "old\n");
        Ok(())
    }

    #[test]
    fn bad_cell_reports_path() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("df_spend.csv");
        fs::write(&path, "year,mun_code,pc_spend\n2000,110001,abc\n")?;
        let err = read_records::<SpendingRecord>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("df_spend.csv"));
        Ok(())
    }
}
