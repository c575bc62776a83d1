use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::ExportError;
use crate::record::{HEADER, Record};

/// File name offered for the CSV download
pub const CSV_FILE_NAME: &str = "treatment_records.csv";

/// File name offered for the XLSX download
pub const XLSX_FILE_NAME: &str = "treatment_records.xlsx";

/// Convert records to CSV format
///
/// The first line is the header; every record becomes one line with fields
/// in header order. Fields containing commas, quotes or newlines are quoted
/// by the writer.
///
/// # Arguments
/// * `records` - The records to export, in output order
///
/// # Returns
/// * `Result<String, ExportError>` - UTF-8 CSV content or an error
pub fn to_csv(records: &[&Record]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Convert records to XLSX format
///
/// Writes a single worksheet with a bold header row and every value as text.
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes or an error
pub fn to_xlsx(records: &[&Record]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    for (col, name) in HEADER.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, value) in record.to_row().iter().enumerate() {
            worksheet.write_string(row, col as u16, value.as_str())?;
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record {
                timestamp: "2025-04-01 10:00:00".into(),
                date: "01/04/2025".into(),
                station: "North".into(),
                product_name: "Fungicide-X".into(),
                dosage: "150".into(),
                note: "line one, with comma".into(),
                submitted_by: "ayse".into(),
                ..Record::default()
            },
            Record {
                timestamp: "2025-04-02 11:00:00".into(),
                date: "02/04/2025".into(),
                station: "Güney".into(),
                product_name: "Bakır \"oksiklorür\"".into(),
                dosage: "2 kg/da".into(),
                applicator: "Ömer".into(),
                submitted_by: "ayse".into(),
                ..Record::default()
            },
        ]
    }

    #[test]
    fn csv_has_header_plus_one_line_per_record() {
        let records = records();
        let refs: Vec<&Record> = records.iter().collect();

        let csv = to_csv(&refs).unwrap();
        assert_eq!(csv.lines().count(), refs.len() + 1);
        assert!(csv.starts_with("timestamp,date,station,product_name,dosage"));
    }

    #[test]
    fn csv_reparses_to_the_same_values() {
        let records = records();
        let refs: Vec<&Record> = records.iter().collect();
        let csv = to_csv(&refs).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(header, HEADER);

        let parsed: Vec<Record> = reader
            .records()
            .map(|row| {
                let row: Vec<String> = row.unwrap().iter().map(str::to_string).collect();
                Record::from_row(&header, &row)
            })
            .collect();
        assert_eq!(parsed, records);
    }

    #[test]
    fn multi_line_note_stays_one_record() {
        let record = Record {
            station: "North".into(),
            product_name: "Neem oil".into(),
            dosage: "30".into(),
            note: "line1\r\nline2".into(),
            ..Record::default()
        };
        let csv = to_csv(&[&record]).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|row| row.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(Record::from_row(&header, &rows[0]), record);
    }

    #[test]
    fn empty_export_is_header_only() {
        let csv = to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let records = records();
        let refs: Vec<&Record> = records.iter().collect();
        let bytes = to_xlsx(&refs).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
