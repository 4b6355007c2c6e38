use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE},
    Client, Response,
};
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::{configuration::HttpSettings, domain::TradeQuery};

use super::ScrapeError;

#[derive(Serialize)]
struct SearchParams<'a> {
    product: &'a str,
    country: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    granularity: Option<&'static str>,
}

/// A scoped session able to run one search against the site.
#[async_trait]
pub trait SearchSession: Send + Sync {
    /// Fetches the landing page so the session picks up its cookies.
    async fn warm_up(&self) -> Result<(), ScrapeError>;

    async fn search(&self, query: &TradeQuery) -> Result<String, ScrapeError>;

    /// Ends the session. Consumes it so it can only happen once.
    fn close(self)
    where
        Self: Sized;
}

/// Cookie-keeping HTTP session presenting itself as a desktop browser.
pub struct HttpSession {
    client: Client,
    base_url: String,
    search_url: String,
}

impl HttpSession {
    pub fn open(base_url: &str, settings: &HttpSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let user_agent = fake_user_agent::get_rua();
        log::debug!("HTTP session user agent: {}", user_agent);

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        Ok(HttpSession {
            client,
            base_url: base_url.to_string(),
            search_url: search_url(base_url, &settings.search_path),
        })
    }
}

#[async_trait]
impl SearchSession for HttpSession {
    async fn warm_up(&self) -> Result<(), ScrapeError> {
        let res = self.client.get(&self.base_url).send().await?;
        check_status(res)?;
        Ok(())
    }

    async fn search(&self, query: &TradeQuery) -> Result<String, ScrapeError> {
        let params = SearchParams {
            product: query.product(),
            country: query.country(),
            granularity: query.granularity().map(|g| g.label()),
        };

        let res = self
            .client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await?;

        Ok(check_status(res)?.text().await?)
    }

    fn close(self) {
        log::debug!("HTTP session for {} closed", self.base_url);
    }
}

fn check_status(res: Response) -> Result<Response, ScrapeError> {
    match res.status().is_success() {
        true => Ok(res),
        false => Err(ScrapeError::HttpStatus {
            url: res.url().to_string(),
            status: res.status(),
        }),
    }
}

fn search_url(base_url: &str, search_path: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(search_path)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), search_path),
    }
}
