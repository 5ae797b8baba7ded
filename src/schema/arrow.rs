// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{path::Path, sync::Arc};
use tracing::{info, instrument};

use super::store::write_atomic;
use crate::panel::{ColumnType, Panel};

/// Key and reference columns that lead every final row.
pub const KEY_COLUMNS: [&str; 5] = ["mun_code", "year", "region", "municipio", "estado"];

fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Int => DataType::Int64,
        ColumnType::Float => DataType::Float64,
    }
}

/// Schema of the final table: key columns, then the panel's columns in join order.
pub fn final_schema(panel: &Panel) -> SchemaRef {
    let [mun_code, year, names @ ..] = KEY_COLUMNS;
    let mut fields = vec![
        Field::new(mun_code, DataType::Int64, false),
        Field::new(year, DataType::Int64, false),
    ];
    fields.extend(names.iter().map(|n| Field::new(*n, DataType::Utf8, true)));
    fields.extend(
        panel
            .columns()
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(c.ty), true)),
    );
    Arc::new(Schema::new(fields))
}

/// Materialize the panel as a single `RecordBatch`.
pub fn panel_to_batch(panel: &Panel) -> Result<RecordBatch> {
    // 1) key columns, derived from the implicit row layout
    let mut mun_code = Vec::with_capacity(panel.len());
    let mut year = Vec::with_capacity(panel.len());
    let mut region = Vec::with_capacity(panel.len());
    let mut municipio = Vec::with_capacity(panel.len());
    let mut estado = Vec::with_capacity(panel.len());
    for (m, y) in panel.rows() {
        mun_code.push(m.code as i64);
        year.push(y as i64);
        region.push(m.region.map(|r| r.label()));
        municipio.push(Some(m.name.as_str()));
        estado.push(Some(m.state.as_str()));
    }
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(mun_code)),
        Arc::new(Int64Array::from(year)),
        Arc::new(StringArray::from(region)),
        Arc::new(StringArray::from(municipio)),
        Arc::new(StringArray::from(estado)),
    ];

    // 2) measures and derived columns
    for col in panel.columns() {
        let array: ArrayRef = match col.ty {
            ColumnType::Int => Arc::new(
                col.values
                    .iter()
                    .map(|v| v.map(|x| x.round() as i64))
                    .collect::<Int64Array>(),
            ),
            ColumnType::Float => Arc::new(col.values.iter().copied().collect::<Float64Array>()),
        };
        arrays.push(array);
    }

    RecordBatch::try_new(final_schema(panel), arrays).context("building final panel batch")
}

/// Comma-separated with a header row; missing cells are empty.
#[instrument(level = "info", skip(batch), fields(rows = batch.num_rows()))]
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer
            .write(batch)
            .with_context(|| format!("writing CSV {}", path.display()))?;
        Ok(())
    })?;
    info!(path = %path.display(), "final panel CSV written");
    Ok(())
}

#[instrument(level = "info", skip(batch), fields(rows = batch.num_rows()))]
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer for final panel")?;
        writer.write(batch).context("writing final panel batch")?;
        writer.close().context("closing final panel writer")?;
        Ok(())
    })?;
    info!(path = %path.display(), "final panel Parquet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::table::tests::municipality;
    use crate::panel::Column;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs;
    use tempfile::tempdir;

    fn small_panel() -> Result<Panel> {
        let mut unknown = municipality(990001, "XX", "99");
        unknown.region = None;
        let mut panel = Panel::balanced(vec![municipality(110001, "RO", "11"), unknown], 2000, 2001)?;
        panel.push_column(Column::new(
            "births",
            ColumnType::Int,
            vec![Some(12.0), Some(0.0), Some(3.0), Some(4.0)],
        ))?;
        panel.push_column(Column::new(
            "pc_spend",
            ColumnType::Float,
            vec![Some(10.5), None, None, Some(2.25)],
        ))?;
        Ok(panel)
    }

    #[test]
    fn batch_layout() -> Result<()> {
        let panel = small_panel()?;
        let batch = panel_to_batch(&panel)?;
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.num_columns(), 7);
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            ["mun_code", "year", "region", "municipio", "estado", "births", "pc_spend"]
        );
        assert_eq!(names[..KEY_COLUMNS.len()], KEY_COLUMNS);
        let region = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(region.value(0), "North");
        assert!(region.is_null(2));
        let spend = batch
            .column(6)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(spend.null_count(), 2);
        Ok(())
    }

    #[test]
    fn csv_has_empty_missing_cells() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("df_final.csv");
        write_csv(&panel_to_batch(&small_panel()?)?, &path)?;
        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("mun_code,year,region,municipio,estado,births,pc_spend")
        );
        assert_eq!(lines.next(), Some("110001,2000,North,Mun 110001,RO,12,10.5"));
        assert_eq!(lines.next(), Some("110001,2001,North,Mun 110001,RO,0,"));
        assert_eq!(lines.next(), Some("990001,2000,,Mun 990001,XX,3,"));
        Ok(())
    }

    #[test]
    fn parquet_reads_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("df_final.parquet");
        let batch = panel_to_batch(&small_panel()?)?;
        write_parquet(&batch, &path)?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(&path)?)?.build()?;
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>()?;
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 4);
        assert_eq!(batches[0].schema(), batch.schema());
        Ok(())
    }
}
