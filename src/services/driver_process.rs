use std::{
    net::TcpListener,
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use tokio::process::{Child, Command};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A chromedriver process listening on a local port.
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    pub async fn spawn(binary: &Path, startup_timeout: Duration) -> anyhow::Result<Self> {
        let port = free_port()?;

        let child = Command::new(binary)
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", binary.display()))?;

        let mut process = DriverProcess { child, port };
        process.wait_until_ready(startup_timeout).await?;

        log::info!("{} listening on port {}", binary.display(), port);
        Ok(process)
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn wait_until_ready(&mut self, startup_timeout: Duration) -> anyhow::Result<()> {
        let client = reqwest::Client::builder()
            .timeout(READY_POLL_INTERVAL * 5)
            .build()?;
        let status_url = format!("{}/status", self.url());
        let started = Instant::now();

        loop {
            if let Some(status) = self.child.try_wait()? {
                bail!("driver exited during startup with {}", status);
            }

            if let Ok(res) = client.get(&status_url).send().await {
                if res.status().is_success() {
                    return Ok(());
                }
            }

            if started.elapsed() >= startup_timeout {
                bail!(
                    "driver did not answer on {} within {}s",
                    status_url,
                    startup_timeout.as_secs()
                );
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            log::warn!("Failed to stop driver on port {}: {:?}", self.port, e);
        }
    }
}

fn free_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("No free local port")?;
    Ok(listener.local_addr()?.port())
}
