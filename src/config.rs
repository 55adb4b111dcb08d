use std::env;
use std::path::PathBuf;

use crate::db::Database;
use crate::remote::RemoteConfig;

pub const DB_PATH_VAR: &str = "APEX_DB_PATH";
pub const REMOTE_URL_VAR: &str = "APEX_SUPABASE_URL";
pub const REMOTE_KEY_VAR: &str = "APEX_SUPABASE_ANON_KEY";

/// Startup settings, read once from flags and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// `db_override` (from `--db`) beats `APEX_DB_PATH`, which beats the
    /// per-user data directory. `offline` drops any remote secrets.
    pub fn from_env(db_override: Option<PathBuf>, offline: bool) -> Self {
        Self::resolve(
            db_override,
            env::var_os(DB_PATH_VAR).map(PathBuf::from),
            env::var(REMOTE_URL_VAR).ok(),
            env::var(REMOTE_KEY_VAR).ok(),
            offline,
        )
    }

    fn resolve(
        db_override: Option<PathBuf>,
        db_env: Option<PathBuf>,
        url: Option<String>,
        anon_key: Option<String>,
        offline: bool,
    ) -> Self {
        let db_path = db_override
            .or(db_env.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(Database::default_path);
        let remote = if offline {
            None
        } else {
            RemoteConfig::from_values(url, anon_key)
        };
        Self { db_path, remote }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        let config = Config::resolve(
            Some(PathBuf::from("/tmp/flag.db")),
            Some(PathBuf::from("/tmp/env.db")),
            None,
            None,
            false,
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/flag.db"));
    }

    #[test]
    fn environment_beats_default() {
        let config = Config::resolve(None, Some(PathBuf::from("/tmp/env.db")), None, None, false);
        assert_eq!(config.db_path, PathBuf::from("/tmp/env.db"));
        let config = Config::resolve(None, Some(PathBuf::new()), None, None, false);
        assert_eq!(config.db_path, Database::default_path());
    }

    #[test]
    fn remote_needs_both_secrets_and_online() {
        let url = Some("https://abc.supabase.co".to_string());
        let key = Some("anon".to_string());
        assert!(Config::resolve(None, None, url.clone(), None, false).remote.is_none());
        assert!(Config::resolve(None, None, url.clone(), key.clone(), true).remote.is_none());
        let remote = Config::resolve(None, None, url, key, false).remote.unwrap();
        assert_eq!(remote.anon_key, "anon");
    }
}
