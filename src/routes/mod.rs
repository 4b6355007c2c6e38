pub mod default_route;
pub mod query_route;

pub use query_route::ExportSettings;
