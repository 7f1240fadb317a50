use anyhow::{Context, Result, anyhow};
use std::path::Path;

/// Reads identifiers from a delimited file with a header row.
///
/// Takes `column` when given, otherwise the first column. `.tsv` and `.tab`
/// files are tab-separated, anything else comma-separated. Blank cells are skipped.
pub fn read_identifiers(path: &Path, column: Option<&str>) -> Result<Vec<String>> {
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let idx = match column {
        Some(name) => {
            let headers = rdr
                .headers()
                .with_context(|| format!("failed to read header of {}", path.display()))?;
            headers.iter().position(|h| h == name).ok_or_else(|| {
                anyhow!(
                    "column [{}] not found in {} (columns: {})",
                    name,
                    path.display(),
                    headers.iter().collect::<Vec<_>>().join(", ")
                )
            })?
        }
        None => 0,
    };

    let mut ids = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| {
            format!("failed to read record {} of {}", line + 1, path.display())
        })?;
        if let Some(v) = record.get(idx).filter(|v| !v.is_empty()) {
            ids.push(v.to_string());
        }
    }

    tracing::debug!(path = %path.display(), count = ids.len(), "read identifiers");
    Ok(ids)
}
