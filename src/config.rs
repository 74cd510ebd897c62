use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database path used when none is configured
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct OrmletConfig {
    /// SQLite file, or `:memory:`
    pub database: Option<String>,
    /// Log every SQL statement
    pub echo: Option<bool>,
}

impl OrmletConfig {
    /// Config written by `ormlet init`
    pub fn starter() -> Self {
        Self {
            database: Some(IN_MEMORY.to_string()),
            echo: Some(false),
        }
    }

    /// Database file to open, `None` for a fresh in-memory database.
    /// `flag` (from the command line) wins over the file.
    pub fn database_path(&self, flag: Option<&Path>) -> Option<PathBuf> {
        let chosen = flag
            .map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))?;
        if chosen.as_os_str() == IN_MEMORY {
            None
        } else {
            Some(chosen)
        }
    }

    pub fn echo(&self) -> bool {
        self.echo.unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("ormlet.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<OrmletConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: OrmletConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &OrmletConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("ormlet.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ormlet.toml");
        let config = OrmletConfig {
            database: Some("data/app.db".into()),
            echo: Some(true),
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.echo());
    }

    #[test]
    fn test_write_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ormlet.toml");
        write_config(&path, &OrmletConfig::starter(), false).unwrap();
        assert!(write_config(&path, &OrmletConfig::starter(), false).is_err());
        assert!(write_config(&path, &OrmletConfig::starter(), true).is_ok());
    }

    #[test]
    fn test_database_path_resolution() {
        let config = OrmletConfig {
            database: Some("from_file.db".into()),
            echo: None,
        };
        assert_eq!(config.database_path(None), Some(PathBuf::from("from_file.db")));
        assert_eq!(
            config.database_path(Some(Path::new("flag.db"))),
            Some(PathBuf::from("flag.db"))
        );
        assert_eq!(config.database_path(Some(Path::new(IN_MEMORY))), None);
        assert_eq!(OrmletConfig::starter().database_path(None), None);
        assert_eq!(OrmletConfig::default().database_path(None), None);
        assert!(!OrmletConfig::default().echo());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("app.db");
        ensure_db_dir(&db_path).unwrap();
        assert!(dir.path().join("nested").is_dir());
    }
}
