use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use ::csv::Writer;
use tracing::{debug, info};

use super::Sheet;
use crate::error::Error;

/// Spreadsheet applications need the byte order mark to read UTF-8 CSV.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// File name for a sheet: the sheet name with path separators replaced.
pub fn sheet_file_name(sheet: &Sheet) -> String {
    let stem: String = sheet
        .name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}.csv", stem)
}

pub fn write_sheet(sheet: &Sheet, path: &Path) -> Result<(), Error> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    let mut wtr = Writer::from_writer(file);
    wtr.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    debug!("Wrote {} row(s) to {}", sheet.rows.len(), path.display());
    Ok(())
}

/// Write every sheet as `<output_dir>/<sheet name>.csv`, creating the
/// directory if needed. Returns the written paths in sheet order.
pub fn write_sheets(sheets: &[Sheet], output_dir: &Path) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let path = output_dir.join(sheet_file_name(sheet));
        write_sheet(sheet, &path)?;
        written.push(path);
    }
    info!("Wrote {} report sheet(s) to {}", written.len(), output_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sheet() -> Sheet {
        Sheet {
            name: "作业统计报告".into(),
            headers: vec!["作业名称".into(), "完成率".into()],
            rows: vec![
                vec!["第一次作业".into(), "50.0%".into()],
                vec!["实验, 报告".into(), "0.0%".into()],
            ],
        }
    }

    #[test]
    fn test_write_sheets_creates_directory() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("reports");
        let written = write_sheets(&[sheet()], &out).unwrap();
        assert_eq!(written, vec![out.join("作业统计报告.csv")]);

        let bytes = fs::read(&written[0]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let mut reader = ::csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "作业名称");
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "实验, 报告");
    }

    #[test]
    fn test_sheet_file_name_sanitized() {
        let mut s = sheet();
        s.name = "a/b:c".into();
        assert_eq!(sheet_file_name(&s), "a_b_c.csv");
    }
}
