use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;

use crate::configuration::{BrowserSettings, DriverSource};

use super::{DriverProcess, Droid, FailedAttempt, ManagedInstall, ScrapeError};

/// One way of obtaining a session handle.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Handle: Send;

    fn name(&self) -> &str;

    async fn acquire(&self) -> anyhow::Result<Self::Handle>;
}

/// Ordered acquisition strategies. The first success wins.
pub struct ProviderChain<H> {
    providers: Vec<Box<dyn SessionProvider<Handle = H>>>,
}

impl<H: Send> ProviderChain<H> {
    pub fn new(providers: Vec<Box<dyn SessionProvider<Handle = H>>>) -> Self {
        ProviderChain { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn acquire(&self) -> Result<H, ScrapeError> {
        let mut attempts = vec![];

        for provider in &self.providers {
            match provider.acquire().await {
                Ok(handle) => {
                    log::info!("Session acquired through {}", provider.name());
                    return Ok(handle);
                }
                Err(e) => {
                    log::warn!("{} failed: {:#}", provider.name(), e);
                    attempts.push(FailedAttempt {
                        provider: provider.name().to_string(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        log::error!("All {} session providers failed", attempts.len());
        Err(ScrapeError::AcquisitionExhausted { attempts })
    }
}

impl ProviderChain<Droid> {
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        let providers = settings
            .drivers
            .iter()
            .map(|source| -> Box<dyn SessionProvider<Handle = Droid>> {
                match source {
                    DriverSource::Managed {
                        manifest_url,
                        cache_dir,
                    } => Box::new(ManagedDriver {
                        manifest_url: manifest_url.clone(),
                        cache_dir: cache_dir.clone(),
                        settings: settings.clone(),
                    }),
                    DriverSource::FixedPath { path } => Box::new(FixedPathDriver {
                        path: path.clone(),
                        settings: settings.clone(),
                    }),
                    DriverSource::SystemPath { binary } => Box::new(SystemPathDriver {
                        binary: binary.clone(),
                        settings: settings.clone(),
                    }),
                    DriverSource::Remote { url } => Box::new(RemoteDriver {
                        url: url.clone(),
                        settings: settings.clone(),
                    }),
                }
            })
            .collect();

        ProviderChain::new(providers)
    }
}

async fn launch_local(binary: &Path, settings: &BrowserSettings) -> anyhow::Result<Droid> {
    let process = DriverProcess::spawn(binary, settings.driver_startup_timeout()).await?;
    let url = process.url();

    // On failure the process is dropped and killed.
    Droid::connect(&url, settings, Some(process))
        .await
        .with_context(|| format!("WebDriver session on {} refused", url))
}

/// Chromedriver downloaded into and reused from a local cache.
pub struct ManagedDriver {
    manifest_url: String,
    cache_dir: Option<PathBuf>,
    settings: BrowserSettings,
}

#[async_trait]
impl SessionProvider for ManagedDriver {
    type Handle = Droid;

    fn name(&self) -> &str {
        "managed driver install"
    }

    async fn acquire(&self) -> anyhow::Result<Droid> {
        let install = ManagedInstall::new(&self.manifest_url, self.cache_dir.clone())?;
        let binary = install.ensure_installed().await?;
        launch_local(&binary, &self.settings).await
    }
}

/// Chromedriver at a fixed filesystem location.
pub struct FixedPathDriver {
    path: PathBuf,
    settings: BrowserSettings,
}

#[async_trait]
impl SessionProvider for FixedPathDriver {
    type Handle = Droid;

    fn name(&self) -> &str {
        "fixed driver path"
    }

    async fn acquire(&self) -> anyhow::Result<Droid> {
        if !self.path.is_file() {
            bail!("{} does not exist", self.path.display());
        }
        launch_local(&self.path, &self.settings).await
    }
}

/// Chromedriver found on `PATH`.
pub struct SystemPathDriver {
    binary: String,
    settings: BrowserSettings,
}

#[async_trait]
impl SessionProvider for SystemPathDriver {
    type Handle = Droid;

    fn name(&self) -> &str {
        "system path driver"
    }

    async fn acquire(&self) -> anyhow::Result<Droid> {
        let path = which::which(&self.binary)
            .with_context(|| format!("{} not found on PATH", self.binary))?;
        launch_local(&path, &self.settings).await
    }
}

/// An already running WebDriver server, e.g. a selenium container.
pub struct RemoteDriver {
    url: String,
    settings: BrowserSettings,
}

#[async_trait]
impl SessionProvider for RemoteDriver {
    type Handle = Droid;

    fn name(&self) -> &str {
        "remote webdriver"
    }

    async fn acquire(&self) -> anyhow::Result<Droid> {
        Droid::connect(&self.url, &self.settings, None)
            .await
            .with_context(|| format!("No WebDriver session from {}", self.url))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use anyhow::anyhow;

    use super::*;

    /// Hands out clones of `handle`, or fails when `handle` is `None`.
    pub struct FakeProvider<H> {
        pub name: &'static str,
        pub handle: Option<H>,
        pub calls: Arc<AtomicUsize>,
    }

    impl<H> FakeProvider<H> {
        pub fn ok(name: &'static str, handle: H) -> Self {
            FakeProvider {
                name,
                handle: Some(handle),
                calls: Arc::default(),
            }
        }

        pub fn failing(name: &'static str) -> Self {
            FakeProvider {
                name,
                handle: None,
                calls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl<H: Clone + Send + Sync> SessionProvider for FakeProvider<H> {
        type Handle = H;

        fn name(&self) -> &str {
            self.name
        }

        async fn acquire(&self) -> anyhow::Result<H> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.handle
                .clone()
                .ok_or_else(|| anyhow!("{} is unavailable", self.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::fake::FakeProvider;
    use super::*;

    fn browser_settings(drivers: Vec<DriverSource>) -> BrowserSettings {
        BrowserSettings {
            step_timeout_secs: 1,
            poll_interval_ms: 100,
            render_timeout_secs: 1,
            driver_startup_timeout_secs: 1,
            headless: true,
            window_width: 1920,
            window_height: 1080,
            extra_args: vec![],
            drivers,
        }
    }

    #[tokio::test]
    async fn first_working_provider_wins_and_later_ones_are_skipped() {
        let managed = FakeProvider::<u8>::failing("managed");
        let fixed = FakeProvider::ok("fixed", 2u8);
        let system = FakeProvider::ok("system", 3u8);
        let system_calls = system.calls.clone();
        let managed_calls = managed.calls.clone();

        let chain: ProviderChain<u8> = ProviderChain::new(vec![
            Box::new(managed),
            Box::new(fixed),
            Box::new(system),
        ]);

        assert_eq!(chain.acquire().await.unwrap(), 2);
        assert_eq!(managed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(system_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_failures_exhaust_the_chain() {
        let chain: ProviderChain<u8> = ProviderChain::new(vec![
            Box::new(FakeProvider::<u8>::failing("managed")),
            Box::new(FakeProvider::<u8>::failing("fixed")),
            Box::new(FakeProvider::<u8>::failing("system")),
        ]);

        match chain.acquire().await {
            Err(ScrapeError::AcquisitionExhausted { attempts }) => {
                let names: Vec<&str> = attempts.iter().map(|a| a.provider.as_str()).collect();
                assert_eq!(names, vec!["managed", "fixed", "system"]);
                assert_eq!(attempts[1].reason, "fixed is unavailable");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted() {
        let chain: ProviderChain<u8> = ProviderChain::new(vec![]);

        assert!(chain.is_empty());
        assert!(matches!(
            chain.acquire().await,
            Err(ScrapeError::AcquisitionExhausted { attempts }) if attempts.is_empty()
        ));
    }

    #[test]
    fn settings_keep_the_configured_order() {
        let settings = browser_settings(vec![
            DriverSource::Managed {
                manifest_url: "http://127.0.0.1:9/manifest.json".to_string(),
                cache_dir: None,
            },
            DriverSource::FixedPath {
                path: "/usr/local/bin/chromedriver".into(),
            },
            DriverSource::SystemPath {
                binary: "chromedriver".to_string(),
            },
            DriverSource::Remote {
                url: "http://localhost:4444".to_string(),
            },
        ]);

        let chain = ProviderChain::from_settings(&settings);
        let names: Vec<&str> = chain.providers.iter().map(|p| p.name()).collect();

        assert_eq!(
            names,
            vec![
                "managed driver install",
                "fixed driver path",
                "system path driver",
                "remote webdriver"
            ]
        );
    }

    #[tokio::test]
    async fn missing_fixed_path_fails_before_spawning() {
        let provider = FixedPathDriver {
            path: "/definitely/not/here/chromedriver".into(),
            settings: browser_settings(vec![]),
        };

        let err = provider.acquire().await.err().unwrap();

        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn unknown_binary_is_not_found_on_path() {
        let provider = SystemPathDriver {
            binary: "no-such-chromedriver-binary".to_string(),
            settings: browser_settings(vec![]),
        };

        let err = provider.acquire().await.err().unwrap();

        assert!(err.to_string().contains("not found on PATH"));
    }
}
