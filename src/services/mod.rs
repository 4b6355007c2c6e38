pub mod driver_install;
pub mod driver_process;
pub mod driver_provider;
pub mod droid;
pub mod extractor;
pub mod http_session;
pub mod navigator;
pub mod query_runner;
pub mod scrape_error;

pub use driver_install::*;
pub use driver_process::*;
pub use driver_provider::*;
pub use droid::*;
pub use extractor::*;
pub use http_session::*;
pub use navigator::*;
pub use query_runner::*;
pub use scrape_error::*;
