use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{QueryForm, TradeQuery, TradeTable};

use super::Extractor;

#[derive(Debug, PartialEq)]
pub enum QueryOutcome {
    /// The form was incomplete; nothing was fetched.
    Rejected(String),
    Table(TradeTable),
    NoData,
    Failed(String),
}

pub struct QueryRunner {
    extractor: Arc<dyn Extractor>,
}

impl QueryRunner {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        QueryRunner { extractor }
    }

    pub async fn run(&self, form: &QueryForm) -> QueryOutcome {
        let query = match TradeQuery::try_from(form) {
            Ok(query) => query,
            Err(e) => {
                log::info!("Rejected incomplete query: {}", e);
                return QueryOutcome::Rejected(
                    "Fill in the product and the country before searching.".to_string(),
                );
            }
        };

        let query_id = Uuid::new_v4();
        log::info!(
            "[{}] Collecting {} imports for {} ({})",
            query_id,
            query.product(),
            query.country(),
            query
                .granularity()
                .map(|g| g.label())
                .unwrap_or("default view")
        );

        match self.extractor.extract(&query).await {
            Ok(Some(table)) if !table.is_empty() => {
                log::info!("[{}] Collected {} rows", query_id, table.records().len());
                QueryOutcome::Table(table)
            }
            Ok(_) => {
                log::info!("[{}] No table found", query_id);
                QueryOutcome::NoData
            }
            Err(e) => {
                log::error!("[{}] Query failed: {}", query_id, e);
                QueryOutcome::Failed(format!("Failed to collect the data: {}", e))
            }
        }
    }
}
