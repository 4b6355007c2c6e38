use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Granularity, TradeQuery};

use super::ScrapeError;

/// An element on the target page, located by XPath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub name: &'static str,
    pub xpath: &'static str,
}

pub const IMPORTS_TOGGLE: Locator = Locator {
    name: "Imports toggle",
    xpath: "//button[text()='Imports']",
};

pub const PRODUCT_FIELD: Locator = Locator {
    name: "product field",
    xpath: "//input[contains(@placeholder, 'keyword')]",
};

pub const COUNTRY_FIELD: Locator = Locator {
    name: "country field",
    xpath: "//input[contains(@placeholder, 'country')]",
};

pub const RESULT_TABLE: Locator = Locator {
    name: "result table",
    xpath: "//table",
};

pub fn granularity_tab(granularity: Granularity) -> Locator {
    match granularity {
        Granularity::TradeIndicators => Locator {
            name: "Trade Indicators tab",
            xpath: r#"//button[contains(text(), "Trade Indicators")]"#,
        },
        Granularity::Yearly => Locator {
            name: "Yearly Time Series tab",
            xpath: r#"//button[contains(text(), "Yearly Time Series")]"#,
        },
        Granularity::Quarterly => Locator {
            name: "Quarterly Time Series tab",
            xpath: r#"//button[contains(text(), "Quarterly Time Series")]"#,
        },
        Granularity::Monthly => Locator {
            name: "Monthly Time Series tab",
            xpath: r#"//button[contains(text(), "Monthly Time Series")]"#,
        },
    }
}

/// Page operations the navigation script needs. Every wait is bounded by `timeout`.
#[async_trait]
pub trait BrowserPage: Send {
    async fn open(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Waits until `target` is clickable, then clicks it.
    async fn click(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError>;

    /// Waits until `target` is present, clears it and types `text`.
    async fn fill(
        &mut self,
        target: &Locator,
        text: &str,
        timeout: Duration,
    ) -> Result<(), ScrapeError>;

    /// Presses Enter on `target`.
    async fn confirm(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError>;

    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError>;

    /// Keeps a reference to the element currently matching `target`, if any.
    async fn remember(&mut self, target: &Locator) -> Result<(), ScrapeError>;

    /// Waits until the remembered element has been detached from the page.
    /// Returns immediately when nothing was remembered.
    async fn wait_replaced(
        &mut self,
        target: &Locator,
        timeout: Duration,
    ) -> Result<(), ScrapeError>;

    async fn page_source(&mut self) -> Result<String, ScrapeError>;

    /// Releases the underlying session. Consumes the page so it can only happen once.
    async fn quit(self) -> Result<(), ScrapeError>
    where
        Self: Sized;
}

#[derive(Debug, Clone)]
pub struct NavigationSettings {
    pub base_url: String,
    pub step_timeout: Duration,
    pub render_timeout: Duration,
}

/// Drives the site from the landing page to the result table and returns the page markup.
pub async fn navigate<P: BrowserPage>(
    page: &mut P,
    query: &TradeQuery,
    settings: &NavigationSettings,
) -> Result<String, ScrapeError> {
    let step = settings.step_timeout;

    page.open(&settings.base_url).await?;

    page.click(&IMPORTS_TOGGLE, step).await?;
    page.fill(&PRODUCT_FIELD, query.product(), step).await?;
    page.fill(&COUNTRY_FIELD, query.country(), step).await?;
    page.confirm(&COUNTRY_FIELD, step).await?;

    match query.granularity() {
        Some(granularity) => {
            // The tab view re-renders the table; wait for the old element to detach.
            page.remember(&RESULT_TABLE).await?;
            page.click(&granularity_tab(granularity), step).await?;
            if let Err(e) = page
                .wait_replaced(&RESULT_TABLE, settings.render_timeout)
                .await
            {
                log::warn!("Previous table is still attached after switching tabs: {}", e);
            }
        }
        None => log::debug!("No known granularity selected, keeping the default tab"),
    }

    if let Err(e) = page.wait_for(&RESULT_TABLE, settings.render_timeout).await {
        log::warn!("Result table did not render, reading the page anyway: {}", e);
    }

    page.page_source().await
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use super::*;

    /// Records every page operation. Clones share the same log and counters.
    #[derive(Clone, Default)]
    pub struct FakePage {
        pub actions: Arc<Mutex<Vec<String>>>,
        pub quits: Arc<AtomicUsize>,
        pub missing: Vec<&'static str>,
        pub never_replaced: Vec<&'static str>,
        pub html: String,
        /// Markup shown once the remembered element has been replaced.
        pub rendered: Option<String>,
    }

    impl FakePage {
        pub fn with_html(html: &str) -> Self {
            FakePage {
                html: html.to_string(),
                ..Default::default()
            }
        }

        /// The page switches to `html` after the next replacement.
        pub fn rendering(mut self, html: &str) -> Self {
            self.rendered = Some(html.to_string());
            self
        }

        /// Elements named here stay attached forever.
        pub fn never_replaced(mut self, name: &'static str) -> Self {
            self.never_replaced.push(name);
            self
        }

        /// Elements named here never become ready.
        pub fn missing(mut self, name: &'static str) -> Self {
            self.missing.push(name);
            self
        }

        pub fn actions(&self) -> Vec<String> {
            self.actions.lock().unwrap().clone()
        }

        pub fn quit_count(&self) -> usize {
            self.quits.load(Ordering::SeqCst)
        }

        fn ready(&self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
            match self.missing.contains(&target.name) {
                true => Err(ScrapeError::StepTimeout {
                    step: target.name.to_string(),
                    timeout,
                    reason: "element never became ready".to_string(),
                }),
                false => Ok(()),
            }
        }

        fn record(&self, action: String) {
            self.actions.lock().unwrap().push(action);
        }
    }

    #[async_trait]
    impl BrowserPage for FakePage {
        async fn open(&mut self, url: &str) -> Result<(), ScrapeError> {
            self.record(format!("open {}", url));
            Ok(())
        }

        async fn click(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
            self.ready(target, timeout)?;
            self.record(format!("click {}", target.name));
            Ok(())
        }

        async fn fill(
            &mut self,
            target: &Locator,
            text: &str,
            timeout: Duration,
        ) -> Result<(), ScrapeError> {
            self.ready(target, timeout)?;
            self.record(format!("clear {}", target.name));
            self.record(format!("type {} into {}", text, target.name));
            Ok(())
        }

        async fn confirm(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
            self.ready(target, timeout)?;
            self.record(format!("confirm {}", target.name));
            Ok(())
        }

        async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
            self.ready(target, timeout)?;
            self.record(format!("wait {}", target.name));
            Ok(())
        }

        async fn remember(&mut self, target: &Locator) -> Result<(), ScrapeError> {
            self.record(format!("remember {}", target.name));
            Ok(())
        }

        async fn wait_replaced(
            &mut self,
            target: &Locator,
            timeout: Duration,
        ) -> Result<(), ScrapeError> {
            if self.never_replaced.contains(&target.name) {
                return Err(ScrapeError::StepTimeout {
                    step: target.name.to_string(),
                    timeout,
                    reason: "element is still attached".to_string(),
                });
            }
            self.record(format!("replaced {}", target.name));
            if let Some(html) = self.rendered.take() {
                self.html = html;
            }
            Ok(())
        }

        async fn page_source(&mut self) -> Result<String, ScrapeError> {
            Ok(self.html.clone())
        }

        async fn quit(self) -> Result<(), ScrapeError> {
            self.quits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
