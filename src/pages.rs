//! HTML rendering for the login, entry and report views.

use axum::http::StatusCode;
use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::entry::EntryForm;
use crate::error::AppError;
use crate::login::{LoginForm, Session};
use crate::record::{HEADER, Record};
use crate::report::{ReportFilter, ReportQuery};

/// Inline message shown above a form
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: &'static str,
    pub text: String,
}

impl Notice {
    pub fn success(text: &str) -> Self {
        Notice { kind: "success", text: text.to_string() }
    }

    pub fn warning(text: &str) -> Self {
        Notice { kind: "warning", text: text.to_string() }
    }

    pub fn error(text: &str) -> Self {
        Notice { kind: "error", text: text.to_string() }
    }

    pub fn info(text: &str) -> Self {
        Notice { kind: "info", text: text.to_string() }
    }
}

#[derive(Serialize)]
struct StationOption<'a> {
    name: &'a str,
    selected: bool,
}

/// Compiled page templates
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, AppError> {
        let mut registry = Handlebars::new();

        let sources = [
            ("layout_head", include_str!("./static/layout_head.html")),
            ("layout_foot", include_str!("./static/layout_foot.html")),
        ];
        for (name, source) in sources {
            registry
                .register_partial(name, source)
                .map_err(|e| AppError::Template(e.to_string()))?;
        }

        let templates = [
            ("login", include_str!("./static/login.html")),
            ("entry", include_str!("./static/entry.html")),
            ("report", include_str!("./static/report.html")),
        ];
        for (name, source) in templates {
            registry
                .register_template_string(name, source)
                .map_err(|e| AppError::Template(e.to_string()))?;
        }

        Ok(Pages { registry })
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<Html<String>, AppError> {
        self.registry
            .render(name, data)
            .map(Html)
            .map_err(|e| AppError::Template(e.to_string()))
    }

    pub fn login(&self, form: &LoginForm, error: Option<&str>) -> Result<Html<String>, AppError> {
        self.render(
            "login",
            &json!({
                "title": "Sign in",
                "username": form.username,
                "notice": error.map(Notice::error),
            }),
        )
    }

    pub fn entry(
        &self,
        session: &Session,
        stations: &[String],
        form: &EntryForm,
        notice: Option<Notice>,
    ) -> Result<Html<String>, AppError> {
        let options: Vec<StationOption> = stations
            .iter()
            .map(|name| StationOption { name, selected: *name == form.station })
            .collect();

        self.render(
            "entry",
            &json!({
                "title": "Add treatment record",
                "user": session.username,
                "stations": options,
                "form": form,
                "notice": notice,
            }),
        )
    }

    pub fn report(
        &self,
        session: &Session,
        stations: &[String],
        filter: &ReportFilter,
        total: usize,
        shown: &[&Record],
    ) -> Result<Html<String>, AppError> {
        let options: Vec<StationOption> = stations
            .iter()
            .map(|name| StationOption { name, selected: filter.stations.contains(name) })
            .collect();
        let rows: Vec<Vec<String>> = shown.iter().map(|r| r.to_row()).collect();
        let notice = (total == 0).then(|| Notice::info("No records yet."));

        self.render(
            "report",
            &json!({
                "title": "Treatment reports",
                "user": session.username,
                "stations": options,
                "product": filter.product,
                "has_records": total > 0,
                "total": total,
                "shown": rows.len(),
                "columns": HEADER,
                "rows": rows,
                "export_query": ReportQuery::encode(filter),
                "notice": notice,
            }),
        )
    }
}

/// Minimal error page, independent of the template registry
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let escaped = handlebars::html_escape(message);
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{status}</title>\
         <link rel=\"stylesheet\" href=\"/static/style.css\"></head>\
         <body><main><h1>{status}</h1><p class=\"notice error\">{escaped}</p>\
         <p><a href=\"/\">Back</a></p></main></body></html>"
    ))
}
