use anyhow::{Context, Result};
use tokio::process::Command;

/// Result of provisioning a new slave MT5 container (`POST /deploy/slave`, §6).
#[derive(Debug, Clone)]
pub struct DeployedSlave {
    pub container_name: String,
    pub host: String,
    pub port: u16,
}

/// Shells out to a `docker`-compatible CLI to create/remove slave MT5 containers (§1, §6:
/// "deploy a new MT5 slave container"). Mechanical plumbing per spec; grounded on the original
/// `api/routes/deploy.py`, which does the same via `subprocess` against the `docker` binary.
pub struct ContainerProvisioner {
    network: String,
    image: String,
}

impl ContainerProvisioner {
    pub fn new(network: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            image: image.into(),
        }
    }

    /// Picks the next free slave port by scanning existing `mt5-slave*` containers, mirroring
    /// `get_next_slave_port` in the original source.
    pub async fn next_available_port(&self, base_port: u16) -> Result<u16> {
        let output = Command::new("docker")
            .args(["ps", "-a", "--format", "{{.Names}}"])
            .output()
            .await
            .context("failed to list docker containers")?;

        let names = String::from_utf8_lossy(&output.stdout);
        let max_suffix = names
            .lines()
            .filter_map(|name| name.strip_prefix("mt5-slave"))
            .filter_map(|suffix| suffix.parse::<u16>().ok())
            .max()
            .unwrap_or(0);

        Ok(base_port + max_suffix + 1)
    }

    pub async fn create_slave_container(
        &self,
        name: &str,
        port: u16,
        login: Option<i64>,
        password: Option<&str>,
        server: Option<&str>,
    ) -> Result<DeployedSlave> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--network".to_string(),
            self.network.clone(),
            "-p".to_string(),
            format!("{port}:8001"),
        ];

        if let Some(login) = login {
            args.push("-e".to_string());
            args.push(format!("MT5_LOGIN={login}"));
        }
        if let Some(password) = password {
            args.push("-e".to_string());
            args.push(format!("MT5_PASSWORD={password}"));
        }
        if let Some(server) = server {
            args.push("-e".to_string());
            args.push(format!("MT5_SERVER={server}"));
        }

        args.push(self.image.clone());

        let status = Command::new("docker")
            .args(&args)
            .status()
            .await
            .context("failed to spawn docker run")?;

        if !status.success() {
            anyhow::bail!("docker run exited with {status}");
        }

        Ok(DeployedSlave {
            container_name: name.to_string(),
            host: name.to_string(),
            port,
        })
    }

    pub async fn remove_slave_container(&self, name: &str) -> Result<()> {
        let _ = Command::new("docker").args(["stop", name]).status().await;
        let status = Command::new("docker")
            .args(["rm", "-f", name])
            .status()
            .await
            .context("failed to spawn docker rm")?;

        if !status.success() {
            anyhow::bail!("docker rm exited with {status}");
        }
        Ok(())
    }
}
