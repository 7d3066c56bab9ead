//! # Parquet persistence for PDF tables
//!
//! The output sink serializes a [`PdfTable`] as a single-batch Parquet file
//! whose key-value metadata carries the originating catalog path under the
//! [`CAT_FILE_KEY`] header entry.
//!
//! The write is **atomic**: the batch is serialized to a sibling temporary
//! file which is then renamed over the final path, so a crash mid-write never
//! leaves a partially-written output behind. [`read_pdf_table`] reloads a
//! persisted table, inferring the (T, G, K) layout from the fixed-size-list
//! column widths.
use std::fs::File;

use arrow_array::{Array, FixedSizeListArray, Float64Array, Int32Array, RecordBatch};
use arrow_schema::DataType;
use camino::{Utf8Path, Utf8PathBuf};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use crate::pdf::schema::{columns, RecordSchema};
use crate::pdf::table::{PdfRecord, PdfTable};
use crate::zpdf_errors::ZpdfError;

/// Header key holding the dataset's catalog path.
pub const CAT_FILE_KEY: &str = "cat_file";

/// Persist a table as Parquet, atomically.
///
/// Arguments
/// -----------------
/// * `table`: the assembled table; converted to one record batch.
/// * `path`: final output path. The temporary file `<path>.tmp` is written in
///   the same directory, then renamed into place.
///
/// Return
/// ----------
/// * `Ok(())` on success; any I/O, Arrow, or Parquet failure otherwise. On
///   failure the temporary file is removed and the final path is untouched.
pub fn write_pdf_table(table: &PdfTable, path: &Utf8Path) -> Result<(), ZpdfError> {
    let batch = table.to_record_batch()?;
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![KeyValue::new(
            CAT_FILE_KEY.to_string(),
            table.catalog_file().to_string(),
        )]))
        .build();

    let tmp_path = Utf8PathBuf::from(format!("{path}.tmp"));
    if let Err(err) = write_batch(&tmp_path, &batch, props) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_batch(
    path: &Utf8Path,
    batch: &RecordBatch,
    props: WriterProperties,
) -> Result<(), ZpdfError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Reload a persisted table.
///
/// The fixed (T, G, K) layout is inferred from the file's fixed-size-list
/// column widths and the catalog path is recovered from the [`CAT_FILE_KEY`]
/// metadata entry (empty when absent).
///
/// Return
/// ----------
/// * The reloaded [`PdfTable`], or an error when the file is unreadable or
///   its columns do not match the expected layout.
pub fn read_pdf_table(path: &Utf8Path) -> Result<PdfTable, ZpdfError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let catalog_file = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == CAT_FILE_KEY))
        .and_then(|kv| kv.value.clone())
        .unwrap_or_default();

    let file_schema = builder.schema().clone();
    let trials = list_width(&file_schema, columns::TRIAL_VALUES)?;
    let grid_size = list_width(&file_schema, columns::PDF_GRID)?;
    let components = list_width(&file_schema, columns::GMM_MU)?;
    let schema = RecordSchema::new(trials, grid_size, components)?;

    let reader = builder.build()?;
    let mut records = Vec::new();

    for maybe_batch in reader {
        let batch = maybe_batch?;

        let row_id = primitive_column::<Int32Array>(&batch, columns::ROW_ID)?;
        let z_spec = primitive_column::<Float64Array>(&batch, columns::Z_SPEC)?;
        let z_phot = primitive_column::<Float64Array>(&batch, columns::Z_PHOT)?;
        let trial_values = list_column(&batch, columns::TRIAL_VALUES)?;
        let pdf_grid = list_column(&batch, columns::PDF_GRID)?;
        let pdf_density = list_column(&batch, columns::PDF_DENSITY)?;
        let gmm_mu = list_column(&batch, columns::GMM_MU)?;
        let gmm_sigma = list_column(&batch, columns::GMM_SIGMA)?;
        let gmm_weight = list_column(&batch, columns::GMM_WEIGHT)?;

        for i in 0..batch.num_rows() {
            records.push(PdfRecord {
                row_id: row_id.value(i),
                z_spec: z_spec.value(i),
                z_phot: z_phot.value(i),
                trial_values: row_values(trial_values, i)?,
                pdf_grid: row_values(pdf_grid, i)?,
                pdf_density: row_values(pdf_density, i)?,
                gmm_mu: row_values(gmm_mu, i)?,
                gmm_sigma: row_values(gmm_sigma, i)?,
                gmm_weight: row_values(gmm_weight, i)?,
            });
        }
    }

    PdfTable::from_records(schema, catalog_file, records)
}

/// Width of a fixed-size-list column, from the file schema.
fn list_width(schema: &arrow_schema::Schema, name: &str) -> Result<usize, ZpdfError> {
    let field = schema.field_with_name(name)?;
    match field.data_type() {
        DataType::FixedSizeList(_, width) => Ok(*width as usize),
        other => Err(ZpdfError::InvalidTableFile(format!(
            "column '{name}' has type {other:?}, expected a fixed-size float list"
        ))),
    }
}

fn primitive_column<'a, A: 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a A, ZpdfError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<A>())
        .ok_or_else(|| {
            ZpdfError::InvalidTableFile(format!("missing or mistyped column '{name}'"))
        })
}

fn list_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a FixedSizeListArray, ZpdfError> {
    primitive_column::<FixedSizeListArray>(batch, name)
}

/// Extract row `i` of a fixed-size float list column as a plain vector.
fn row_values(list: &FixedSizeListArray, i: usize) -> Result<Vec<f64>, ZpdfError> {
    let row = list.value(i);
    let floats = row
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            ZpdfError::InvalidTableFile("fixed-size list items are not float64".into())
        })?;
    Ok((0..floats.len()).map(|j| floats.value(j)).collect())
}
