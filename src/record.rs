use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column names of the records sheet, in storage order
pub const HEADER: [&str; 9] = [
    "timestamp",
    "date",
    "station",
    "product_name",
    "dosage",
    "plot_id",
    "applicator",
    "note",
    "submitted_by",
];

/// Format of the `timestamp` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the `date` column (day/month/year)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// One treatment application event
///
/// All fields are stored as text. Records written by this application always
/// carry a non-empty `product_name` and `dosage`; rows read back from the
/// store are coerced, so that invariant only holds for our own writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    pub date: String,
    pub station: String,
    pub product_name: String,
    pub dosage: String,
    pub plot_id: String,
    pub applicator: String,
    pub note: String,
    pub submitted_by: String,
}

impl Record {
    /// Cell values in `HEADER` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.date.clone(),
            self.station.clone(),
            self.product_name.clone(),
            self.dosage.clone(),
            self.plot_id.clone(),
            self.applicator.clone(),
            self.note.clone(),
            self.submitted_by.clone(),
        ]
    }

    /// Project a raw row onto the record schema using the sheet's header row.
    ///
    /// Columns are matched by name, so a reordered sheet still reads
    /// correctly. Missing columns and short rows become empty strings.
    pub fn from_row(header: &[String], row: &[String]) -> Self {
        let field = |name: &str| -> String {
            header
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|idx| row.get(idx))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        Record {
            timestamp: field("timestamp"),
            date: field("date"),
            station: field("station"),
            product_name: field("product_name"),
            dosage: field("dosage"),
            plot_id: field("plot_id"),
            applicator: field("applicator"),
            note: field("note"),
            submitted_by: field("submitted_by"),
        }
    }

    /// Whether the record satisfies the required-field invariant
    pub fn is_complete(&self) -> bool {
        !self.product_name.is_empty() && !self.dosage.is_empty()
    }
}

pub fn format_timestamp(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Header row as owned strings, ready to send to a store
pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|h| h.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            timestamp: "2025-03-14 09:30:00".into(),
            date: "14/03/2025".into(),
            station: "North".into(),
            product_name: "Fungicide-X".into(),
            dosage: "150".into(),
            plot_id: "P-7".into(),
            applicator: "Mehmet".into(),
            note: "windy, applied early".into(),
            submitted_by: "ayse".into(),
        }
    }

    #[test]
    fn row_follows_header_order() {
        let row = sample().to_row();
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[HEADER.iter().position(|h| *h == "station").unwrap()], "North");
        assert_eq!(row[8], "ayse");
    }

    #[test]
    fn from_row_matches_columns_by_name() {
        let header: Vec<String> = ["dosage", "product_name", "station", "unrelated"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row: Vec<String> = ["200 ml", " Herbicide ", "South", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let record = Record::from_row(&header, &row);
        assert_eq!(record.dosage, "200 ml");
        assert_eq!(record.product_name, "Herbicide");
        assert_eq!(record.station, "South");
        assert_eq!(record.note, "");
        assert_eq!(record.submitted_by, "");
    }

    #[test]
    fn from_row_pads_short_rows() {
        let header = header_row();
        let row = vec!["2025-01-01 10:00:00".to_string(), "01/01/2025".to_string()];

        let record = Record::from_row(&header, &row);
        assert_eq!(record.date, "01/01/2025");
        assert_eq!(record.station, "");
        assert!(!record.is_complete());
    }

    #[test]
    fn dates_use_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(format_date(date), "04/03/2025");

        let instant = date.and_hms_opt(7, 5, 9).unwrap();
        assert_eq!(format_timestamp(instant), "2025-03-04 07:05:09");
    }
}
