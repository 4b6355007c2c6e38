use std::{net::TcpListener, sync::Arc};

use env_logger::Env;
use tradelens::{
    configuration::{get_configuration, ExtractorKind},
    routes::ExportSettings,
    services::{BrowserExtractor, Extractor, HttpExtractor, QueryRunner},
    startup::run,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");
    let scraper = configuration.scraper;

    let extractor: Arc<dyn Extractor> = match scraper.extractor {
        ExtractorKind::Browser => Arc::new(BrowserExtractor::from_settings(&scraper)),
        ExtractorKind::Http => Arc::new(HttpExtractor::from_settings(&scraper)),
    };
    log::info!("Using the {:?} extractor against {}", scraper.extractor, scraper.base_url);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    run(
        listener,
        QueryRunner::new(extractor),
        ExportSettings {
            file_name: scraper.export_file_name,
        },
    )?
    .await
}
