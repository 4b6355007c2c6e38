use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::{error::WebDriverError, prelude::*, ChromiumLikeCapabilities};

use crate::configuration::BrowserSettings;

use super::{BrowserPage, DriverProcess, Locator, ScrapeError};

/// A WebDriver session, plus the local driver process when this crate started one.
pub struct Droid {
    pub driver: WebDriver,
    process: Option<DriverProcess>,
    poll_interval: Duration,
    remembered: Option<WebElement>,
}

impl Droid {
    pub async fn connect(
        server_url: &str,
        settings: &BrowserSettings,
        process: Option<DriverProcess>,
    ) -> Result<Self, WebDriverError> {
        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.set_headless()?;
        }
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.set_disable_gpu()?;
        caps.add_arg(&format!(
            "--window-size={},{}",
            settings.window_width, settings.window_height
        ))?;
        for arg in &settings.extra_args {
            caps.add_arg(arg)?;
        }

        let driver = WebDriver::new(server_url, caps).await?;

        Ok(Droid {
            driver,
            process,
            poll_interval: settings.poll_interval(),
            remembered: None,
        })
    }

    async fn find_present(
        &self,
        target: &Locator,
        timeout: Duration,
    ) -> Result<WebElement, ScrapeError> {
        self.driver
            .query(By::XPath(target.xpath))
            .wait(timeout, self.poll_interval)
            .first()
            .await
            .map_err(|e| timed_out(target, timeout, e))
    }

    async fn find_clickable(
        &self,
        target: &Locator,
        timeout: Duration,
    ) -> Result<WebElement, ScrapeError> {
        self.driver
            .query(By::XPath(target.xpath))
            .wait(timeout, self.poll_interval)
            .and_clickable()
            .first()
            .await
            .map_err(|e| timed_out(target, timeout, e))
    }
}

fn timed_out(target: &Locator, timeout: Duration, e: WebDriverError) -> ScrapeError {
    ScrapeError::StepTimeout {
        step: target.name.to_string(),
        timeout,
        reason: e.to_string(),
    }
}

fn failed(step: &str, e: WebDriverError) -> ScrapeError {
    ScrapeError::Browser {
        step: step.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl BrowserPage for Droid {
    async fn open(&mut self, url: &str) -> Result<(), ScrapeError> {
        log::info!("Opening {}", url);
        self.driver.goto(url).await.map_err(|e| failed("open", e))
    }

    async fn click(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
        let element = self.find_clickable(target, timeout).await?;
        element.click().await.map_err(|e| failed(target.name, e))?;
        log::debug!("Clicked {}", target.name);
        Ok(())
    }

    async fn fill(
        &mut self,
        target: &Locator,
        text: &str,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let element = self.find_present(target, timeout).await?;
        element.clear().await.map_err(|e| failed(target.name, e))?;
        element
            .send_keys(text)
            .await
            .map_err(|e| failed(target.name, e))?;
        log::debug!("Typed '{}' into {}", text, target.name);
        Ok(())
    }

    async fn confirm(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
        let element = self.find_present(target, timeout).await?;
        element
            .send_keys(Key::Enter + "")
            .await
            .map_err(|e| failed(target.name, e))
    }

    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> Result<(), ScrapeError> {
        self.find_present(target, timeout).await.map(|_| ())
    }

    async fn remember(&mut self, target: &Locator) -> Result<(), ScrapeError> {
        let current = self
            .driver
            .find_all(By::XPath(target.xpath))
            .await
            .map_err(|e| failed(target.name, e))?;
        self.remembered = current.into_iter().next();
        Ok(())
    }

    async fn wait_replaced(
        &mut self,
        target: &Locator,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let Some(element) = self.remembered.take() else {
            return Ok(());
        };

        element
            .wait_until()
            .wait(timeout, self.poll_interval)
            .stale()
            .await
            .map_err(|e| timed_out(target, timeout, e))?;
        log::debug!("Previous {} detached", target.name);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, ScrapeError> {
        self.driver
            .source()
            .await
            .map_err(|e| failed("read page source", e))
    }

    async fn quit(self) -> Result<(), ScrapeError> {
        let quit_result = self.driver.quit().await;

        if let Some(process) = self.process {
            process.stop().await;
        }

        log::info!("Browser session closed");
        quit_result.map_err(|e| failed("quit", e))
    }
}
