use actix_web::{get, web, HttpResponse};
use askama::Template;

use crate::domain::{Granularity, QueryForm};

use super::ExportSettings;

pub struct GranularityOption {
    pub label: &'static str,
    pub selected: bool,
}

pub struct Notice {
    pub kind: &'static str,
    pub message: String,
}

impl Notice {
    pub fn success(message: &str) -> Self {
        Notice {
            kind: "success",
            message: message.to_string(),
        }
    }

    pub fn warning(message: &str) -> Self {
        Notice {
            kind: "warning",
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Self {
        Notice {
            kind: "error",
            message: message.to_string(),
        }
    }
}

pub struct TableView {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub csv: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct QueryPage {
    pub product: String,
    pub country: String,
    pub granularities: Vec<GranularityOption>,
    pub notice: Option<Notice>,
    pub table: Option<TableView>,
    pub file_name: String,
}

impl QueryPage {
    /// Page with the form refilled from `form`.
    pub fn new(form: &QueryForm, file_name: &str) -> Self {
        let selected = Granularity::from_label(&form.granularity);

        QueryPage {
            product: form.product.clone(),
            country: form.country.clone(),
            granularities: Granularity::ALL
                .iter()
                .map(|g| GranularityOption {
                    label: g.label(),
                    selected: Some(*g) == selected,
                })
                .collect(),
            notice: None,
            table: None,
            file_name: file_name.to_string(),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        match self.render() {
            Ok(body) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                log::error!("Failed to render query page: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to render page")
            }
        }
    }
}

#[get("/")]
pub async fn default(export: web::Data<ExportSettings>) -> HttpResponse {
    QueryPage::new(&QueryForm::default(), &export.file_name).into_response()
}
