use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use hypertext::prelude::*;

use crate::{
    app_config::AppConfig,
    auth::User,
    feedback::{
        config_store::load_schema,
        export::{ExportError, csv_report::to_csv, pdf_report::PdfExporter},
        store::{FeedbackStore, ReadGrant},
    },
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, download, err_not_found},
    widgets::alert::ErrorAlert,
};

/// Lets spreadsheet programs recognise the download as UTF-8.
const UTF8_BOM: &str = "\u{feff}";

fn export_failed(
    user: User<false>,
    config: &AppConfig,
    e: ExportError,
) -> FailureResponse {
    tracing::error!("{e}");
    FailureResponse::ServerError(Some(
        Page::new()
            .user(user)
            .site_name(&config.site_name)
            .title("Export failed")
            .body(maud! {
                ErrorAlert msg=(&e);
                a class="btn btn-outline-primary" href="/admin/feedback" { "Back to all responses" }
            })
            .render(),
    ))
}

fn dated(stem: &str, extension: &str) -> String {
    format!("{stem}-{}.{extension}", Utc::now().format("%Y-%m-%d"))
}

pub async fn export_csv(
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let grant = ReadGrant::for_admin(&user);
    let records = FeedbackStore::new(&mut *conn).load_all(&grant)?;
    let schema = load_schema(&mut *conn)?;

    let csv = match to_csv(&records, &schema) {
        Ok(csv) => csv,
        Err(e) => return Err(export_failed(user, &config, e)),
    };
    tracing::info!("{} exported {} responses as CSV", user.username, records.len());

    download(
        "text/csv; charset=utf-8",
        dated("feedback", "csv"),
        format!("{UTF8_BOM}{csv}").into_bytes(),
    )
}

pub async fn export_pdf(
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let grant = ReadGrant::for_admin(&user);
    let records = FeedbackStore::new(&mut *conn).load_all(&grant)?;
    let schema = load_schema(&mut *conn)?;
    let count = records.len();

    let exporter = PdfExporter::new(config.pdf_font_path.clone());
    let rendered =
        tokio::task::spawn_blocking(move || exporter.bulk(&records, &schema))
            .await
            .map_err(|e| {
                tracing::error!("PDF task panicked: {e}");
                FailureResponse::ServerError(None)
            })?;

    match rendered {
        Ok(bytes) => {
            tracing::info!("{} exported {count} responses as PDF", user.username);
            download("application/pdf", dated("feedback", "pdf"), bytes)
        }
        Err(e) => Err(export_failed(user, &config, e)),
    }
}

pub async fn export_single_pdf(
    Path(id): Path<String>,
    user: User<false>,
    State(config): State<Arc<AppConfig>>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let grant = ReadGrant::for_admin(&user);
    let Some(record) = FeedbackStore::new(&mut *conn).fetch(&id, &grant)? else {
        return err_not_found();
    };
    let schema = load_schema(&mut *conn)?;

    match PdfExporter::new(config.pdf_font_path.clone()).single(&record, &schema) {
        Ok(bytes) => download("application/pdf", format!("feedback-{id}.pdf"), bytes),
        Err(e) => Err(export_failed(user, &config, e)),
    }
}
