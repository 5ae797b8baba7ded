// src/process/municipality.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::process::utils::{clean_str, parse_mun_code};
use crate::schema::store::read_records;
use crate::schema::types::{Municipality, Region};

/// Row of `municipios.csv`; any other column is ignored.
#[derive(Debug, Deserialize)]
struct ReferenceRow {
    id_munic_6: String,
    id_estado: String,
    municipio: String,
    estado: String,
}

/// Load the reference municipality list. A malformed code aborts the load.
#[instrument(level = "info", fields(path = %path.display()))]
pub fn load_municipalities(path: &Path) -> Result<Vec<Municipality>> {
    let rows: Vec<ReferenceRow> = read_records(path)?;
    let mut out = Vec::with_capacity(rows.len());
    let mut without_region = 0usize;

    for (idx, row) in rows.into_iter().enumerate() {
        let code = parse_mun_code(&row.id_munic_6).with_context(|| {
            format!(
                "{} record {}: invalid municipality code `{}`",
                path.display(),
                idx,
                row.id_munic_6
            )
        })?;
        let state_code = clean_str(&row.id_estado);
        let region = Region::from_state_code(&state_code);
        if region.is_none() {
            warn!(code, state_code = %state_code, "state code maps to no region");
            without_region += 1;
        }
        out.push(Municipality {
            code,
            name: clean_str(&row.municipio),
            state: clean_str(&row.estado),
            state_code,
            region,
        });
    }

    info!(municipalities = out.len(), without_region, "loaded reference list");
    Ok(out)
}
