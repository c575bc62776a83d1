//! Data-entry view: collect one treatment record and append it.

#[cfg(feature = "web")]
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::CookieJar;
#[cfg(feature = "web")]
use chrono::Local;
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};

use crate::adapter::RecordAdapter;
#[cfg(feature = "web")]
use crate::app::SharedState;
#[cfg(feature = "web")]
use crate::error::AppError;
use crate::error::{AppResult, ValidationError};
#[cfg(feature = "web")]
use crate::login::{Role, current_session, require_role};
use crate::login::Session;
use crate::record::{Record, format_date, format_timestamp};
use crate::store::TabularStore;

/// Date format produced by an HTML date input
const FORM_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw entry form fields as submitted by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub station: String,
    /// `YYYY-MM-DD`; empty means today
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub plot_id: String,
    #[serde(default)]
    pub applicator: String,
    #[serde(default)]
    pub note: String,
}

impl EntryForm {
    /// A blank form with the first station and today's date preselected
    pub fn blank(stations: &[String], today: NaiveDate) -> Self {
        EntryForm {
            station: stations.first().cloned().unwrap_or_default(),
            date: today.format(FORM_DATE_FORMAT).to_string(),
            ..EntryForm::default()
        }
    }

    /// Validate the form and build the record to store
    ///
    /// Text fields are trimmed. `product_name` and `dosage` must be
    /// non-empty, the station must be a configured one and the date must
    /// parse (empty means `now`'s date).
    pub fn to_record(
        &self,
        stations: &[String],
        session: &Session,
        now: NaiveDateTime,
    ) -> Result<Record, ValidationError> {
        let product_name = self.product_name.trim();
        let dosage = self.dosage.trim();
        if product_name.is_empty() {
            return Err(ValidationError::MissingRequiredField("product_name"));
        }
        if dosage.is_empty() {
            return Err(ValidationError::MissingRequiredField("dosage"));
        }

        let station = self.station.trim();
        if !stations.iter().any(|s| s == station) {
            return Err(ValidationError::UnknownStation(station.to_string()));
        }

        let date = match self.date.trim() {
            "" => now.date(),
            text => NaiveDate::parse_from_str(text, FORM_DATE_FORMAT)
                .map_err(|_| ValidationError::InvalidDate(text.to_string()))?,
        };

        Ok(Record {
            timestamp: format_timestamp(now),
            date: format_date(date),
            station: station.to_string(),
            product_name: product_name.to_string(),
            dosage: dosage.to_string(),
            plot_id: self.plot_id.trim().to_string(),
            applicator: self.applicator.trim().to_string(),
            note: self.note.trim().to_string(),
            submitted_by: session.username.clone(),
        })
    }
}

/// Validate `form` and append it to the `worksheet` table.
///
/// Validation failures return before the store is touched.
pub async fn submit<S: TabularStore>(
    adapter: &RecordAdapter<S>,
    worksheet: &str,
    stations: &[String],
    session: &Session,
    form: &EntryForm,
    now: NaiveDateTime,
) -> AppResult<Record> {
    let record = form.to_record(stations, session, now)?;
    let table = adapter.ensure_table(worksheet).await?;
    adapter.append(&table, &record).await?;
    info!(
        "{} recorded {} at {} ({})",
        record.submitted_by, record.product_name, record.station, record.date
    );
    Ok(record)
}

/// Serve an empty entry form
#[cfg(feature = "web")]
pub async fn serve_entry_page<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> AppResult<Response> {
    let session = match require_role(current_session(&state.sessions, &jar), Role::Standard) {
        Ok(session) => session,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let form = EntryForm::blank(&state.stations, Local::now().date_naive());
    Ok(state
        .pages
        .entry(&session, &state.stations, &form, None)?
        .into_response())
}

/// Handle an entry form submission
///
/// Accepted: the record is appended and a cleared form is shown with a
/// confirmation. Rejected: nothing is written and the form comes back as
/// typed, with the warning.
#[cfg(feature = "web")]
pub async fn handle_entry<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
    Form(form): Form<EntryForm>,
) -> AppResult<Response> {
    use crate::pages::Notice;

    let session = match require_role(current_session(&state.sessions, &jar), Role::Standard) {
        Ok(session) => session,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let now = Local::now().naive_local();
    match submit(&state.adapter, &state.worksheet, &state.stations, &session, &form, now).await {
        Ok(_) => {
            let blank = EntryForm::blank(&state.stations, now.date());
            let notice = Notice::success("Record saved.");
            Ok(state
                .pages
                .entry(&session, &state.stations, &blank, Some(notice))?
                .into_response())
        }
        Err(AppError::Validation(err)) => {
            let notice = Notice::warning(&err.to_string());
            let page = state
                .pages
                .entry(&session, &state.stations, &form, Some(notice))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err),
    }
}
