#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

use std::path;

use anyhow::bail;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

/// Named blobs persisted between runs, one YAML file per name. Treated as a
/// restartable cache: unreadable blobs are reported and callers fall back to
/// defaults.
#[derive(Clone, Debug)]
pub struct Storage {
    pub state_dir: path::PathBuf,
}

impl Default for Storage {
    fn default() -> Storage {
        let state_dir = path::PathBuf::from(Config::get(ConfigKey::StateDir));

        return Storage::new(state_dir);
    }
}

impl Storage {
    pub fn new(state_dir: path::PathBuf) -> Storage {
        return Storage { state_dir };
    }

    fn get_file_path(&self, name: &str) -> Result<path::PathBuf> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| return c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!(format!("Invalid storage name '{name}'"));
        }

        return Ok(self.state_dir.join(format!("{name}.yaml")));
    }

    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let file_path = self.get_file_path(name)?;
        if !file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(file_path).await?;
        let value: T = serde_yaml::from_str(&payload)?;

        return Ok(Some(value));
    }

    pub async fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let file_path = self.get_file_path(name)?;
        let payload = serde_yaml::to_string(value)?;

        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir).await?;
        }

        let mut file = fs::File::create(file_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;

        return Ok(());
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let file_path = self.get_file_path(name)?;
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path).await?;
        return Ok(());
    }
}
