use async_trait::async_trait;

use crate::{
    configuration::{HttpSettings, ScraperSettings},
    domain::{TradeQuery, TradeTable},
};

use super::{
    navigate, BrowserPage, Droid, HttpSession, NavigationSettings, ProviderChain, ScrapeError,
    SearchSession,
};

/// Turns a query into the first table of the resulting page. `Ok(None)` means no table.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, query: &TradeQuery) -> Result<Option<TradeTable>, ScrapeError>;
}

pub struct BrowserExtractor<P> {
    providers: ProviderChain<P>,
    navigation: NavigationSettings,
}

impl<P> BrowserExtractor<P> {
    pub fn new(providers: ProviderChain<P>, navigation: NavigationSettings) -> Self {
        BrowserExtractor {
            providers,
            navigation,
        }
    }
}

impl BrowserExtractor<Droid> {
    pub fn from_settings(settings: &ScraperSettings) -> Self {
        BrowserExtractor::new(
            ProviderChain::from_settings(&settings.browser),
            NavigationSettings {
                base_url: settings.base_url.clone(),
                step_timeout: settings.browser.step_timeout(),
                render_timeout: settings.browser.render_timeout(),
            },
        )
    }
}

#[async_trait]
impl<P: BrowserPage + 'static> Extractor for BrowserExtractor<P> {
    async fn extract(&self, query: &TradeQuery) -> Result<Option<TradeTable>, ScrapeError> {
        let mut page = self.providers.acquire().await?;

        let navigation = navigate(&mut page, query, &self.navigation).await;

        if let Err(e) = page.quit().await {
            log::warn!("Browser session did not close cleanly: {}", e);
        }

        let html = navigation?;
        Ok(TradeTable::from_html(&html))
    }
}

type SessionFactory<S> = Box<dyn Fn() -> Result<S, ScrapeError> + Send + Sync>;

pub struct HttpExtractor<S = HttpSession> {
    base_url: String,
    open_session: SessionFactory<S>,
}

impl HttpExtractor<HttpSession> {
    pub fn new(base_url: &str, settings: HttpSettings) -> Self {
        let session_base = base_url.to_string();
        HttpExtractor::with_sessions(base_url, move || {
            HttpSession::open(&session_base, &settings)
        })
    }

    pub fn from_settings(settings: &ScraperSettings) -> Self {
        HttpExtractor::new(&settings.base_url, settings.http.clone())
    }
}

impl<S> HttpExtractor<S> {
    /// Extractor opening one session from `open_session` per query.
    pub fn with_sessions<F>(base_url: &str, open_session: F) -> Self
    where
        F: Fn() -> Result<S, ScrapeError> + Send + Sync + 'static,
    {
        HttpExtractor {
            base_url: base_url.to_string(),
            open_session: Box::new(open_session),
        }
    }
}

#[async_trait]
impl<S: SearchSession + 'static> Extractor for HttpExtractor<S> {
    async fn extract(&self, query: &TradeQuery) -> Result<Option<TradeTable>, ScrapeError> {
        let session = (self.open_session)()?;

        let fetched = match session.warm_up().await {
            Ok(()) => session.search(query).await,
            Err(e) => Err(e),
        };

        session.close();

        match fetched {
            Ok(html) => Ok(TradeTable::from_html(&html)),
            Err(ScrapeError::Http(e)) => {
                log::error!("Request to {} failed: {:?}", self.base_url, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
