use std::net::TcpListener;

use actix_files::Files;
use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    routes::{default_route, query_route, ExportSettings},
    services::QueryRunner,
};

pub fn run(
    listener: TcpListener,
    runner: QueryRunner,
    export: ExportSettings,
) -> Result<Server, std::io::Error> {
    let runner = web::Data::new(runner);
    let export = web::Data::new(export);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/static", "./templates/static").prefer_utf8(true))
            .service(default_route::default)
            .service(query_route::submit_query)
            .service(query_route::export_csv)
            .app_data(runner.clone())
            .app_data(export.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
