use actix_web::{http::header, post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    domain::QueryForm,
    services::{QueryOutcome, QueryRunner},
};

use super::default_route::{Notice, QueryPage, TableView};

pub struct ExportSettings {
    pub file_name: String,
}

#[post("/query")]
pub async fn submit_query(
    form: web::Form<QueryForm>,
    runner: web::Data<QueryRunner>,
    export: web::Data<ExportSettings>,
) -> HttpResponse {
    let mut page = QueryPage::new(&form, &export.file_name);

    match runner.run(&form).await {
        QueryOutcome::Rejected(message) => page.notice = Some(Notice::warning(&message)),
        QueryOutcome::NoData => {
            page.notice = Some(Notice::warning("No table was found on the page."))
        }
        QueryOutcome::Failed(message) => page.notice = Some(Notice::error(&message)),
        QueryOutcome::Table(table) => match table.to_csv() {
            Ok(csv) => {
                page.notice = Some(Notice::success("Data collected successfully."));
                page.table = Some(TableView {
                    header: table.header().map(<[String]>::to_vec).unwrap_or_default(),
                    rows: table.records().to_vec(),
                    csv,
                });
            }
            Err(e) => {
                log::error!("Failed to export table as csv: {:?}", e);
                page.notice = Some(Notice::error("Failed to prepare the CSV download."));
            }
        },
    }

    page.into_response()
}

#[derive(Deserialize)]
struct ExportBody {
    csv: String,
}

#[post("/export")]
pub async fn export_csv(
    body: web::Form<ExportBody>,
    export: web::Data<ExportSettings>,
) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.file_name),
        ))
        .body(body.into_inner().csv)
}
