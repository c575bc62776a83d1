/*!
# Agrolog

A small web tool for logging pesticide and treatment applications at
agricultural stations. Records are kept in a Google Sheets spreadsheet.

## Overview

Operators sign in against a static user table from the configuration file.
A standard user gets the entry form: station, date, product, dosage, plot,
applicator and a note. The owner gets the report view: every record, filtered
by station and product name, with CSV and Excel downloads of the filtered set.

## Architecture

### Store Layer
- **store**: the `TabularStore` trait and an in-memory implementation
- **sheets**: Google Sheets v4 implementation (service-account auth)
- **adapter**: `RecordAdapter`, typed access to the records worksheet

### Domain
- **record**: the `Record` schema and its sheet header
- **login**: user table, sessions, role gate
- **entry**: entry form validation and submission
- **report**: report filtering
- **downloader**: CSV and XLSX export

### Web Layer (feature `web`)
- **pages**: handlebars templates
- **app**: routing and server startup

## Records Sheet

The worksheet has a fixed header row:

`timestamp, date, station, product_name, dosage, plot_id, applicator, note, submitted_by`

It is created on first use. Rows are only ever appended.

## Routes

- `GET /login`, `POST /login`, `POST /logout` - sign in and out
- `GET /entry`, `POST /entry` - entry form (standard role)
- `GET /report` - filtered table (owner role)
- `GET /report/export.csv`, `GET /report/export.xlsx` - downloads (owner role)
*/

pub mod adapter;
pub mod config;
pub mod downloader;
pub mod entry;
pub mod error;
pub mod login;
pub mod record;
pub mod report;
pub mod store;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod pages;
#[cfg(feature = "web")]
pub mod sheets;

pub use adapter::RecordAdapter;
pub use error::{AppError, AuthError, StoreError, ValidationError};
pub use login::{Role, Session, UserTable};
pub use record::Record;
pub use report::ReportFilter;
pub use store::{MemoryStore, TableHandle, TabularStore};
