//! Owner's report view: filter all records, show them, export them.

#[cfg(feature = "web")]
use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::{Query, cookie::CookieJar};
use serde::{Deserialize, Serialize};

#[cfg(feature = "web")]
use crate::app::SharedState;
#[cfg(feature = "web")]
use crate::downloader::{self, CSV_FILE_NAME, XLSX_FILE_NAME};
#[cfg(feature = "web")]
use crate::error::{AppResult, StoreError};
#[cfg(feature = "web")]
use crate::login::{Role, Session, current_session, require_role};
use crate::record::Record;
#[cfg(feature = "web")]
use crate::store::TabularStore;

/// Column-based filter over the record set
///
/// An empty station list applies no station filter. An empty product text
/// applies no product filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub stations: Vec<String>,
    pub product: String,
}

impl ReportFilter {
    /// Keep the records passing both filters, in their original order
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        let needle = self.product.to_lowercase();
        records
            .iter()
            .filter(|r| self.stations.is_empty() || self.stations.contains(&r.station))
            .filter(|r| self.product.is_empty() || r.product_name.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Report query string: `applied=1&stations=A&stations=B&product=text`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    /// Set once the operator has submitted the filter form
    #[serde(default)]
    pub applied: Option<String>,
    #[serde(default)]
    pub stations: Vec<String>,
    #[serde(default)]
    pub product: String,
}

impl ReportQuery {
    /// Translate the query into a filter.
    ///
    /// Before the form is submitted every configured station is selected.
    pub fn to_filter(&self, configured: &[String]) -> ReportFilter {
        let stations = if self.applied.is_some() {
            self.stations.clone()
        } else {
            configured.to_vec()
        };
        ReportFilter {
            stations,
            product: self.product.clone(),
        }
    }

    /// Query string reproducing `filter`, used for the export links
    #[cfg(feature = "web")]
    pub fn encode(filter: &ReportFilter) -> String {
        let mut parts = vec!["applied=1".to_string()];
        for station in &filter.stations {
            parts.push(format!("stations={}", urlencoding::encode(station)));
        }
        if !filter.product.is_empty() {
            parts.push(format!("product={}", urlencoding::encode(&filter.product)));
        }
        parts.join("&")
    }
}

#[cfg(feature = "web")]
async fn load_filtered<S: TabularStore>(
    state: &SharedState<S>,
    query: &ReportQuery,
) -> Result<(Vec<Record>, ReportFilter), StoreError> {
    let table = state.adapter.ensure_table(&state.worksheet).await?;
    let records = state.adapter.fetch_all(&table).await?;
    Ok((records, query.to_filter(&state.stations)))
}

#[cfg(feature = "web")]
fn owner_session<S: TabularStore>(
    state: &SharedState<S>,
    jar: &CookieJar,
) -> Result<Session, Response> {
    require_role(current_session(&state.sessions, jar), Role::Owner)
        .map_err(IntoResponse::into_response)
}

/// Serve the filtered record table
#[cfg(feature = "web")]
pub async fn serve_report<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let session = match owner_session(&state, &jar) {
        Ok(session) => session,
        Err(response) => return Ok(response),
    };

    let (records, filter) = load_filtered(&state, &query).await?;
    let shown = filter.apply(&records);
    log::debug!(
        "report for {}: {} of {} records",
        session.username,
        shown.len(),
        records.len()
    );

    Ok(state
        .pages
        .report(&session, &state.stations, &filter, records.len(), &shown)?
        .into_response())
}

/// Download the filtered set as CSV
#[cfg(feature = "web")]
pub async fn export_csv<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    if let Err(response) = owner_session(&state, &jar) {
        return Ok(response);
    }

    let (records, filter) = load_filtered(&state, &query).await?;
    let csv = downloader::to_csv(&filter.apply(&records))?;
    Ok(attachment("text/csv; charset=utf-8", CSV_FILE_NAME, csv.into_bytes()))
}

/// Download the filtered set as an XLSX workbook
#[cfg(feature = "web")]
pub async fn export_xlsx<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    if let Err(response) = owner_session(&state, &jar) {
        return Ok(response);
    }

    let (records, filter) = load_filtered(&state, &query).await?;
    let xlsx = downloader::to_xlsx(&filter.apply(&records))?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        XLSX_FILE_NAME,
        xlsx,
    ))
}

#[cfg(feature = "web")]
fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Body::from(body),
    )
        .into_response()
}
