// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::PathBuf;

pub const ENV_BACKEND: &str = "MONTHBOOK_BACKEND";
pub const ENV_SUPABASE_URL: &str = "MONTHBOOK_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "MONTHBOOK_SUPABASE_ANON_KEY";
pub const ENV_DATA_DIR: &str = "MONTHBOOK_DATA_DIR";
pub const ENV_CURRENCY_SYMBOL: &str = "MONTHBOOK_CURRENCY_SYMBOL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote { url: String, anon_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub currency_symbol: String,
}

impl Config {
    pub fn from_env(backend_override: Option<&str>) -> Result<Config> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Config::from_vars(&vars, backend_override)
    }

    /// Resolves settings from a variable map; the CLI flag wins over
    /// `MONTHBOOK_BACKEND`.
    pub fn from_vars(
        vars: &HashMap<String, String>,
        backend_override: Option<&str>,
    ) -> Result<Config> {
        let get = |k: &str| {
            vars.get(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let kind = backend_override
            .map(|s| s.trim().to_lowercase())
            .or_else(|| get(ENV_BACKEND).map(|s| s.to_lowercase()))
            .unwrap_or_else(|| "local".to_string());

        let backend = match kind.as_str() {
            "local" => Backend::Local,
            "remote" => match (get(ENV_SUPABASE_URL), get(ENV_SUPABASE_ANON_KEY)) {
                (Some(url), Some(anon_key)) => Backend::Remote { url, anon_key },
                _ => bail!(
                    "Missing Supabase environment variables ({} and {})",
                    ENV_SUPABASE_URL,
                    ENV_SUPABASE_ANON_KEY
                ),
            },
            other => bail!("Unknown backend '{}', expected local|remote", other),
        };

        let data_dir = match get(ENV_DATA_DIR) {
            Some(d) => PathBuf::from(d),
            None => crate::db::default_data_dir().context("Resolve data dir")?,
        };

        Ok(Config {
            backend,
            data_dir,
            currency_symbol: get(ENV_CURRENCY_SYMBOL).unwrap_or_else(|| "£".to_string()),
        })
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}
