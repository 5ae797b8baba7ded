// src/process/mortality.rs

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use rayon::prelude::*;
use std::{
    collections::{hash_map::Entry, HashMap},
    fs::File,
    io::Read,
    path::Path,
};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::process::icd::{is_amenable, CauseCategory};
use crate::process::utils::{clean_str, decode_text, parse_mun_code};
use crate::process::{Extracted, RejectedRow};
use crate::schema::types::MortalityRecord;

pub const SOURCE: &str = "mortality";

/// Columns read from the micro-data; everything else is ignored.
const COLUMNS: [&str; 4] = ["mun_res", "ano", "capcid_cau", "cid_cau"];

/// One death record, still as text.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRow {
    pub mun_res: String,
    pub ano: String,
    pub capcid_cau: String,
    pub cid_cau: String,
}

/// Buffer the first `.csv` entry of `zip_path` in memory.
pub fn read_zipped_csv(zip_path: &Path) -> Result<(String, Vec<u8>)> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, zip_path))?;
        let name = entry.name().to_string();
        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut buf)
                .with_context(|| format!("Failed to read {} into memory", name))?;
            debug!(entry = %name, bytes = buf.len(), "buffered micro-data");
            return Ok((name, buf));
        }
    }
    bail!("no CSV entry in {:?}", zip_path)
}

/// Parse the comma-separated micro-data (latin-1 unless valid UTF-8).
pub fn parse_deaths(bytes: &[u8]) -> Result<Vec<DeathRow>> {
    let text = decode_text(bytes);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers().context("reading micro-data header")?.clone();
    let mut idx = [0usize; 4];
    for (slot, name) in idx.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| clean_str(h) == name)
            .with_context(|| format!("micro-data is missing column `{}`", name))?;
    }

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("CSV parse error in micro-data at record {}", i))?;
        let field = |k: usize| clean_str(rec.get(idx[k]).unwrap_or(""));
        rows.push(DeathRow {
            mun_res: field(0),
            ano: field(1),
            capcid_cau: field(2),
            cid_cau: field(3),
        });
    }
    Ok(rows)
}

/// Key, cause bucket and amenable flag of one death.
fn classify(row: &DeathRow) -> std::result::Result<((u32, i32), Option<CauseCategory>, bool), RejectedRow> {
    let label = format!("{},{}", row.mun_res, row.ano);
    let mun_code = parse_mun_code(&row.mun_res)
        .ok_or_else(|| RejectedRow::new(SOURCE, None, &label, "unparseable municipality code"))?;
    let year = row
        .ano
        .parse::<i32>()
        .map_err(|_| RejectedRow::new(SOURCE, None, &label, "unparseable year"))?;
    Ok((
        (mun_code, year),
        CauseCategory::from_chapter(&row.capcid_cau),
        is_amenable(&row.cid_cau),
    ))
}

/// Per-thread counts, rejected rows and deaths with no cause bucket.
type Partial = (HashMap<(u32, i32), MortalityRecord>, Vec<RejectedRow>, usize);

/// Count deaths per (municipality, year), in parallel.
///
/// Every death adds to `im`; its chapter adds to at most one cause column
/// and an amenable code adds to `im_apc`. `im_napc` is derived last.
/// Also returns how many kept deaths matched no cause chapter.
pub fn aggregate_deaths(rows: &[DeathRow]) -> (Extracted<MortalityRecord>, usize) {
    let (counts, rejected, uncategorized): Partial = rows
        .par_iter()
        .fold(
            || (HashMap::new(), Vec::new(), 0),
            |(mut acc, mut rejected, mut uncategorized): Partial, row| {
                match classify(row) {
                    Ok(((mun_code, year), cause, amenable)) => {
                        let rec = acc
                            .entry((mun_code, year))
                            .or_insert_with(|| MortalityRecord::new(mun_code, year));
                        rec.im += 1;
                        match cause {
                            Some(cause) => *rec.cause_mut(cause) += 1,
                            None => uncategorized += 1,
                        }
                        if amenable {
                            rec.im_apc += 1;
                        }
                    }
                    Err(r) => rejected.push(r),
                }
                (acc, rejected, uncategorized)
            },
        )
        .reduce(
            || (HashMap::new(), Vec::new(), 0),
            |(mut left, mut left_rej, left_unc), (right, right_rej, right_unc)| {
                for (key, rec) in right {
                    match left.entry(key) {
                        Entry::Occupied(mut e) => e.get_mut().merge(&rec),
                        Entry::Vacant(e) => {
                            e.insert(rec);
                        }
                    }
                }
                left_rej.extend(right_rej);
                (left, left_rej, left_unc + right_unc)
            },
        );

    let mut records: Vec<MortalityRecord> = counts
        .into_values()
        .map(|mut rec| {
            rec.im_napc = rec.im - rec.im_apc;
            rec
        })
        .collect();
    records.sort_by_key(|r| (r.mun_code, r.year));
    (Extracted { records, rejected }, uncategorized)
}

#[instrument(level = "info", fields(path = %zip_path.display()))]
pub fn extract_mortality(zip_path: &Path) -> Result<Extracted<MortalityRecord>> {
    // 1) buffer the CSV out of the archive
    let (entry, bytes) = read_zipped_csv(zip_path)?;

    // 2) parse rows
    let rows = parse_deaths(&bytes).with_context(|| format!("parsing {}", entry))?;

    // 3) classify + aggregate
    let (out, uncategorized) = aggregate_deaths(&rows);
    if !out.rejected.is_empty() {
        warn!(count = out.rejected.len(), "dropped death records with bad keys");
    }
    info!(
        deaths = rows.len(),
        uncategorized,
        rows = out.records.len(),
        "aggregated mortality"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    use zip::write::SimpleFileOptions;

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,imrpanel::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn death(mun_res: &str, ano: &str, chapter: &str, icd: &str) -> DeathRow {
        DeathRow {
            mun_res: mun_res.into(),
            ano: ano.into(),
            capcid_cau: chapter.into(),
            cid_cau: icd.into(),
        }
    }

    fn zipped(name: &str, content: &[u8]) -> Result<NamedTempFile> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(name, SimpleFileOptions::default())?;
            zip.write_all(content)?;
            zip.finish()?;
        }
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(&buf)?;
        Ok(tmp)
    }

    #[test]
    fn amenable_deaths_split_im() {
        let rows = vec![
            death("110001", "2000", "Infectious and parasitic diseases", "A09"),
            death("110001", "2000", "Perinatal period conditions", "P071"),
            death("110001", "2000", "Pregnancy childbirth and puerperium", "O998"),
            death("355030", "2001", "Respiratory system diseases", "J181"),
        ];
        let (out, uncategorized) = aggregate_deaths(&rows);
        assert!(out.rejected.is_empty());
        assert_eq!(uncategorized, 1);
        assert_eq!(out.records.len(), 2);

        let r = &out.records[0];
        assert_eq!((r.mun_code, r.year), (110001, 2000));
        assert_eq!(r.im, 3);
        assert_eq!(r.im_infec, 1);
        assert_eq!(r.im_perinat, 1);
        assert_eq!(r.im_apc, 1);
        assert_eq!(r.im_napc, 2);
        assert_eq!(out.records[1].im_resp, 1);
        for r in &out.records {
            assert_eq!(r.im_napc, r.im - r.im_apc);
        }
    }

    #[test]
    fn bad_keys_are_reported() {
        let rows = vec![
            death("11000", "2000", "Neoplasms", "C719"),
            death("110001", "", "Neoplasms", "C719"),
            death("1100015", "2003", "Neoplasms", "C719"),
        ];
        let (out, uncategorized) = aggregate_deaths(&rows);
        assert_eq!(out.rejected.len(), 2);
        assert_eq!(uncategorized, 0);
        assert_eq!(out.rejected[0].reason, "unparseable municipality code");
        assert_eq!(out.rejected[1].reason, "unparseable year");
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].mun_code, 110001);
        assert_eq!(out.records[0].im_neop, 1);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let mut rows: Vec<DeathRow> = (0..500)
            .map(|i| {
                let code = if i % 3 == 0 { "110001" } else { "355030" };
                let icd = if i % 5 == 0 { "A09" } else { "Q249" };
                death(code, "2010", "Congenital malformations", icd)
            })
            .collect();
        let forward = aggregate_deaths(&rows);
        rows.reverse();
        let backward = aggregate_deaths(&rows);
        assert_eq!(forward, backward);
        assert_eq!(forward.0.records.iter().map(|r| r.im).sum::<u64>(), 500);
    }

    #[test]
    fn reads_latin1_csv_from_zip() -> Result<()> {
        init_test_logging();
        let mut content = b"mun_res,ano,sexo,capcid_cau,cid_cau\n".to_vec();
        content.extend_from_slice(b"110001,2000,M,Perinatal period conditions,P220\n");
        content.extend_from_slice(b"110001,2000,F,Afec\xe7\xf5es mal definidas,R99\n");
        content.extend_from_slice(b"Total,2000,F,Neoplasms,C719\n");
        let tmp = zipped("sim_microdata.csv", &content)?;

        let out = extract_mortality(tmp.path())?;
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.im, 2);
        assert_eq!(r.im_perinat, 1);
        assert_eq!(r.im_illdef, 0);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].source, "mortality");
        Ok(())
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = parse_deaths(b"mun_res,ano,cid_cau\n110001,2000,A09\n").unwrap_err();
        assert!(err.to_string().contains("capcid_cau"));
    }
}
