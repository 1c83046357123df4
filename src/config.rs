use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Context;
use tracing::info;

pub const DEFAULT_BIND_ADDR: &str = "[::]:3000";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workdir: PathBuf,
    pub upload_dir: PathBuf,
    pub wal_path: PathBuf,
    /// Single-file store used by the local fallback mode.
    pub local_store_path: PathBuf,
    pub bind_addr: String,
    pub public_url_prefix: String,
    pub geocode_endpoint: String,
    pub transfer_timeout: Duration,
}

impl AppConfig {
    pub fn new(
        workdir: Option<PathBuf>,
        bind_addr: String,
        public_url_prefix: String,
        geocode_endpoint: String,
        transfer_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let workdir = Self::get_or_create_workdir(workdir)?;
        let upload_dir = Self::get_or_create_upload_dir(&workdir)?;
        let wal_path = Self::get_or_create_wal_path(&workdir)?;
        let local_store_path = workdir.join("submissions.json");
        Ok(Self {
            workdir,
            upload_dir,
            wal_path,
            local_store_path,
            bind_addr,
            public_url_prefix,
            geocode_endpoint,
            transfer_timeout,
        })
    }

    fn get_or_create_workdir(workdir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        let workdir = match workdir {
            Some(dir) => dir,
            None => home::home_dir().context("cannot determine home directory")?.join(".globepin"),
        };
        if !workdir.exists() {
            std::fs::create_dir_all(&workdir)?;
        }
        if !workdir.is_dir() {
            anyhow::bail!("workdir is not a directory");
        }
        let workdir = workdir.canonicalize()?;
        info!("workdir: {}", workdir.display());
        Ok(workdir)
    }

    fn get_or_create_upload_dir(workdir: &Path) -> anyhow::Result<PathBuf> {
        let upload_dir = workdir.join("uploads");
        if !upload_dir.exists() {
            std::fs::create_dir_all(&upload_dir)?;
        }
        if !upload_dir.is_dir() {
            anyhow::bail!("upload_dir is not a directory");
        }
        info!("upload_dir: {}", upload_dir.display());
        Ok(upload_dir)
    }

    fn get_or_create_wal_path(workdir: &Path) -> anyhow::Result<PathBuf> {
        let wal_path = workdir.join("globepin.db.json");
        if !wal_path.exists() {
            std::fs::write(&wal_path, "")?;
        }
        if !wal_path.is_file() {
            anyhow::bail!("operation log path is not a file");
        }
        info!("wal_path: {}", wal_path.display());
        Ok(wal_path)
    }
}
