use std::{
    collections::HashMap,
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct Manifest {
    channels: HashMap<String, Channel>,
}

#[derive(Deserialize, Debug)]
struct Channel {
    version: String,
    downloads: HashMap<String, Vec<Download>>,
}

#[derive(Deserialize, Debug, Clone)]
struct Download {
    platform: String,
    url: String,
}

#[derive(Debug, PartialEq)]
pub struct DriverRelease {
    pub version: String,
    pub url: String,
}

/// Downloads chromedriver builds into a versioned cache directory.
pub struct ManagedInstall {
    manifest_url: String,
    root: PathBuf,
    client: reqwest::Client,
}

impl ManagedInstall {
    pub fn new(manifest_url: &str, cache_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = match cache_dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or_else(|| anyhow!("No cache directory on this system"))?
                .join("tradelens")
                .join("chromedriver"),
        };

        Ok(ManagedInstall {
            manifest_url: manifest_url.to_string(),
            root,
            client: reqwest::Client::new(),
        })
    }

    /// Path to a usable chromedriver, downloading the current stable build if it is not cached yet.
    pub async fn ensure_installed(&self) -> anyhow::Result<PathBuf> {
        let release = match self.latest_release().await {
            Ok(release) => release,
            Err(e) => {
                log::warn!("Could not read the driver manifest: {:?}", e);
                return self
                    .any_cached()
                    .ok_or_else(|| e.context("no cached chromedriver to fall back to"));
            }
        };

        let target = self.root.join(&release.version).join(binary_name());
        if target.is_file() {
            log::debug!("Using cached chromedriver {}", release.version);
            return Ok(target);
        }

        log::info!(
            "Downloading chromedriver {} from {}",
            release.version,
            release.url
        );
        let archive = self
            .client
            .get(&release.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let destination = target.clone();
        tokio::task::spawn_blocking(move || unpack_driver(&archive, &destination)).await??;

        Ok(target)
    }

    async fn latest_release(&self) -> anyhow::Result<DriverRelease> {
        let manifest: Manifest = self
            .client
            .get(&self.manifest_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        stable_release(&manifest, current_platform()?)
    }

    fn any_cached(&self) -> Option<PathBuf> {
        let mut versions: Vec<PathBuf> = fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path().join(binary_name())))
            .filter(|path| path.is_file())
            .collect();
        versions.sort();
        versions.pop()
    }
}

fn stable_release(manifest: &Manifest, platform: &str) -> anyhow::Result<DriverRelease> {
    let stable = manifest
        .channels
        .get("Stable")
        .ok_or_else(|| anyhow!("manifest has no Stable channel"))?;

    let download = stable
        .downloads
        .get("chromedriver")
        .and_then(|downloads| downloads.iter().find(|d| d.platform == platform))
        .ok_or_else(|| anyhow!("no chromedriver build for {}", platform))?;

    Ok(DriverRelease {
        version: stable.version.clone(),
        url: download.url.clone(),
    })
}

fn current_platform() -> anyhow::Result<&'static str> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_for(os: &str, arch: &str) -> anyhow::Result<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Ok("linux64"),
        ("macos", "aarch64") => Ok("mac-arm64"),
        ("macos", "x86_64") => Ok("mac-x64"),
        ("windows", "x86_64") => Ok("win64"),
        ("windows", "x86") => Ok("win32"),
        _ => Err(anyhow!("no chromedriver builds for {} {}", os, arch)),
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

fn unpack_driver(archive: &[u8], destination: &Path) -> anyhow::Result<()> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).context("Invalid driver archive")?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let is_driver = entry.is_file()
            && Path::new(entry.name())
                .file_name()
                .is_some_and(|name| name == binary_name());
        if !is_driver {
            continue;
        }

        let parent = destination
            .parent()
            .ok_or_else(|| anyhow!("{} has no parent directory", destination.display()))?;
        fs::create_dir_all(parent)?;

        // Only a fully extracted binary may appear at `destination`.
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        io::copy(&mut entry, staged.as_file_mut())
            .with_context(|| format!("Failed to extract {}", entry.name()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))?;
        }

        staged.persist(destination)?;
        return Ok(());
    }

    Err(anyhow!("archive does not contain {}", binary_name()))
}
