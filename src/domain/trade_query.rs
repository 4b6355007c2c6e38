use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    TradeIndicators,
    Yearly,
    Quarterly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::TradeIndicators,
        Granularity::Yearly,
        Granularity::Quarterly,
        Granularity::Monthly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::TradeIndicators => "Trade Indicators",
            Granularity::Yearly => "Yearly",
            Granularity::Quarterly => "Quarterly",
            Granularity::Monthly => "Monthly",
        }
    }

    /// Case-insensitive lookup. Unknown labels give `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "trade indicators" => Some(Granularity::TradeIndicators),
            "yearly" => Some(Granularity::Yearly),
            "quarterly" => Some(Granularity::Quarterly),
            "monthly" => Some(Granularity::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw fields as submitted by the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub granularity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    MissingProduct,
    MissingCountry,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::MissingProduct => f.write_str("product code or name is required"),
            QueryError::MissingCountry => f.write_str("country or region is required"),
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeQuery {
    product: String,
    country: String,
    granularity: Option<Granularity>,
}

impl TradeQuery {
    pub fn new(
        product: &str,
        country: &str,
        granularity: Option<Granularity>,
    ) -> Result<Self, QueryError> {
        let product = product.trim();
        let country = country.trim();

        if product.is_empty() {
            return Err(QueryError::MissingProduct);
        }
        if country.is_empty() {
            return Err(QueryError::MissingCountry);
        }

        Ok(TradeQuery {
            product: product.to_string(),
            country: country.to_string(),
            granularity,
        })
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn granularity(&self) -> Option<Granularity> {
        self.granularity
    }
}

impl TryFrom<&QueryForm> for TradeQuery {
    type Error = QueryError;

    fn try_from(form: &QueryForm) -> Result<Self, Self::Error> {
        TradeQuery::new(
            &form.product,
            &form.country,
            Granularity::from_label(&form.granularity),
        )
    }
}
