// src/process/price_index.rs

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info, instrument};

use crate::process::utils::{clean_str, decode_text, parse_decimal};
use crate::schema::types::PriceIndexRecord;

/// Where the period of a row comes from.
#[derive(Debug, Clone, Copy)]
enum PeriodColumns {
    /// ipeadata export: `Data` as `YYYY.MM` (or a bare year).
    Data(usize),
    /// `year` with an optional `month`.
    YearMonth(usize, Option<usize>),
}

fn find(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| clean_str(h).eq_ignore_ascii_case(n)))
}

/// `YYYY.MM`, `YYYY.M` or `YYYY` → first day of that month (December for a bare year).
pub fn parse_data_period(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    let (year, month) = match s.split_once('.') {
        Some((y, m)) => (y.parse().ok()?, m.parse().ok()?),
        None => (s.parse().ok()?, 12),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn parse_year_month(year: &str, month: Option<&str>) -> Option<NaiveDate> {
    let year: i32 = clean_str(year).parse().ok()?;
    let month: u32 = match month {
        Some(m) => clean_str(m).parse().ok()?,
        None => 12,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Read `(period, % variation)` pairs from a `;`-separated IPCA table.
pub fn parse_variations(text: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers().context("reading IPCA header")?.clone();

    let value_col = find(&headers, &["IPCA"]).context("IPCA table has no `IPCA` column")?;
    let period = match find(&headers, &["Data"]) {
        Some(i) => PeriodColumns::Data(i),
        None => PeriodColumns::YearMonth(
            find(&headers, &["year", "ano"])
                .context("IPCA table has neither a `Data` nor a `year` column")?,
            find(&headers, &["month", "mes", "mês"]),
        ),
    };

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("CSV parse error in IPCA table at record {}", i))?;
        if rec.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let date = match period {
            PeriodColumns::Data(c) => parse_data_period(rec.get(c).unwrap_or("")),
            PeriodColumns::YearMonth(y, m) => {
                parse_year_month(rec.get(y).unwrap_or(""), m.map(|m| rec.get(m).unwrap_or("")))
            }
        }
        .with_context(|| format!("IPCA record {}: unparseable period", i))?;
        let variation = parse_decimal(rec.get(value_col).unwrap_or(""))
            .with_context(|| format!("IPCA record {}: unparseable variation", i))?;
        out.push((date, variation));
    }
    Ok(out)
}

/// Chain the variations into a price level anchored at 1.0 on the last period:
/// `index[t] = index[t+1] / (1 + variation[t+1] / 100)`.
pub fn chain_index(mut periods: Vec<(NaiveDate, f64)>) -> Result<Vec<(NaiveDate, f64)>> {
    if periods.is_empty() {
        bail!("IPCA table has no rows");
    }
    periods.sort_by_key(|(d, _)| *d);
    if let Some(w) = periods.windows(2).find(|w| w[0].0 == w[1].0) {
        bail!("IPCA table has more than one row for period {}", w[0].0);
    }

    let n = periods.len();
    let mut index = vec![1.0; n];
    for i in (0..n - 1).rev() {
        index[i] = index[i + 1] / (1.0 + periods[i + 1].1 / 100.0);
    }
    Ok(periods.into_iter().map(|(d, _)| d).zip(index).collect())
}

/// One row per year: the index of the year's last period.
pub fn collapse_to_years(chained: &[(NaiveDate, f64)]) -> Vec<PriceIndexRecord> {
    let mut by_year: BTreeMap<i32, (NaiveDate, f64)> = BTreeMap::new();
    for &(date, index) in chained {
        let slot = by_year.entry(date.year()).or_insert((date, index));
        if date >= slot.0 {
            *slot = (date, index);
        }
    }
    by_year
        .into_iter()
        .map(|(year, (_, index))| PriceIndexRecord { year, index })
        .collect()
}

#[instrument(level = "info", fields(path = %path.display()))]
pub fn extract_price_index(path: &Path) -> Result<Vec<PriceIndexRecord>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let variations = parse_variations(&decode_text(&bytes))
        .with_context(|| format!("parsing {}", path.display()))?;
    debug!(periods = variations.len(), "read IPCA variations");
    let chained = chain_index(variations)?;
    let years = collapse_to_years(&chained);
    info!(years = years.len(), "built price index");
    Ok(years)
}
