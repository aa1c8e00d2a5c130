use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};
use crate::domain::filters::FilterPolicy;
use crate::infra::kodi::KodiOptions;
use crate::infra::trakt::TraktOptions;
use crate::workflows::reconciler::RunOptions;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    kodi: KodiOptions,
    trakt: TraktSection,
    exclude_specials: bool,
    exclude_older_than_library_start: bool,
    exclude_unaired: bool,
    concurrency: Option<usize>,
    output: OutputFormat,
    verbose: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TraktSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    max_cache_age: Option<String>,
}

/// Everything a run needs, after merging the settings file, environment
/// and command line.
#[derive(Debug)]
pub struct Settings {
    pub kodi: KodiOptions,
    pub trakt: TraktOptions,
    pub run: RunOptions,
    pub output: OutputFormat,
    pub verbose: bool,
}

pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => {
            let path = get_config_path();
            if path.exists() {
                read_config_file(&path)?
            } else {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                ConfigFile::default()
            }
        }
    };
    resolve(config, cli, |key| env::var(key).ok())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("invalid settings file {}", path.display()))
}

fn resolve(
    config: ConfigFile,
    cli: &Cli,
    env_var: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    // Environment first, then the settings file.
    let client_id = env_var("TRAKT_CLIENT_ID").or(config.trakt.client_id);
    let client_secret = env_var("TRAKT_CLIENT_SECRET").or(config.trakt.client_secret);
    let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
        bail!(
            "Trakt credentials not found. Set TRAKT_CLIENT_ID and TRAKT_CLIENT_SECRET or add client_id and client_secret to the [trakt] section of {}",
            get_config_path().display()
        );
    };

    let max_cache_age = config
        .trakt
        .max_cache_age
        .as_deref()
        .map(humantime::parse_duration)
        .transpose()
        .context("invalid trakt.max_cache_age")?;

    let mut kodi = config.kodi;
    if let Some(password) = env_var("KODI_PASSWORD") {
        kodi.password = Some(password);
    }

    let concurrency = match cli.concurrency {
        Some(concurrency) => usize::from(concurrency),
        None => config.concurrency.unwrap_or(1),
    };
    if concurrency == 0 {
        bail!("concurrency must be at least 1");
    }

    Ok(Settings {
        kodi,
        trakt: TraktOptions {
            client_id,
            client_secret,
            max_cache_age,
        },
        run: RunOptions {
            policy: FilterPolicy {
                exclude_specials: cli.exclude_specials || config.exclude_specials,
                exclude_older_than_library_start: cli.exclude_older_than_library_start
                    || config.exclude_older_than_library_start,
                exclude_unaired: cli.exclude_unaired || config.exclude_unaired,
            },
            concurrency,
        },
        output: cli.format.unwrap_or(config.output),
        verbose: cli.verbose || config.verbose,
    })
}

pub fn get_store_path() -> PathBuf {
    get_config_dir_path().join("store.json")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("missing-episodes"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"
        exclude_specials = true
        exclude_unaired = true
        concurrency = 3
        output = "json"

        [kodi]
        hostname = "htpc.local"
        port = 9090
        username = "kodi"
        password = "from-file"

        [trakt]
        client_id = "file-id"
        client_secret = "file-secret"
        max_cache_age = "1day"
    "#;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("missing-episodes").chain(args.iter().copied()))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_settings_file() {
        let config: ConfigFile = toml::from_str(SETTINGS).unwrap();
        let settings = resolve(config, &cli(&[]), no_env).unwrap();

        assert_eq!(settings.kodi.hostname, "htpc.local");
        assert_eq!(settings.kodi.port, 9090);
        assert_eq!(settings.kodi.password.as_deref(), Some("from-file"));
        assert_eq!(settings.trakt.client_id, "file-id");
        assert_eq!(settings.trakt.max_cache_age, Some(Duration::from_secs(86_400)));
        assert_eq!(settings.run.concurrency, 3);
        assert!(settings.run.policy.exclude_specials);
        assert!(!settings.run.policy.exclude_older_than_library_start);
        assert!(settings.run.policy.exclude_unaired);
        assert_eq!(settings.output, OutputFormat::Json);
        assert!(!settings.verbose);
    }

    #[test]
    fn test_cli_and_env_take_precedence() {
        let config: ConfigFile = toml::from_str(SETTINGS).unwrap();
        let env = HashMap::from([
            ("TRAKT_CLIENT_ID", "env-id"),
            ("KODI_PASSWORD", "from-env"),
        ]);
        let settings = resolve(
            config,
            &cli(&["--format", "yaml", "--concurrency", "1", "--exclude-older"]),
            |key| env.get(key).map(|value| value.to_string()),
        )
        .unwrap();

        assert_eq!(settings.trakt.client_id, "env-id");
        assert_eq!(settings.trakt.client_secret, "file-secret");
        assert_eq!(settings.kodi.password.as_deref(), Some("from-env"));
        assert_eq!(settings.run.concurrency, 1);
        assert!(settings.run.policy.exclude_older_than_library_start);
        assert_eq!(settings.output, OutputFormat::Yaml);
    }

    #[test]
    fn test_defaults() {
        let config: ConfigFile = toml::from_str(
            r#"
            [trakt]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();
        let settings = resolve(config, &cli(&[]), no_env).unwrap();

        assert_eq!(settings.kodi.hostname, "localhost");
        assert_eq!(settings.kodi.port, 8080);
        assert_eq!(settings.run.concurrency, 1);
        assert_eq!(settings.run.policy, FilterPolicy::default());
        assert_eq!(settings.output, OutputFormat::Text);
        assert!(settings.trakt.max_cache_age.is_none());
    }

    #[test]
    fn test_settings_file_can_enable_verbose_output() {
        let config: ConfigFile = toml::from_str(
            r#"
            verbose = true
            [trakt]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();
        assert!(resolve(config, &cli(&[]), no_env).unwrap().verbose);
    }

    #[test]
    fn test_missing_credentials() {
        let err = resolve(ConfigFile::default(), &cli(&[]), no_env).unwrap_err();
        assert!(err.to_string().contains("TRAKT_CLIENT_ID"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config: ConfigFile = toml::from_str(
            r#"
            concurrency = 0
            [trakt]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();
        assert!(resolve(config, &cli(&[]), no_env).is_err());
    }

    #[test]
    fn test_invalid_cache_age_rejected() {
        let config: ConfigFile = toml::from_str(
            r#"
            [trakt]
            client_id = "id"
            client_secret = "secret"
            max_cache_age = "soon"
            "#,
        )
        .unwrap();
        assert!(resolve(config, &cli(&[]), no_env).is_err());
    }

    #[test]
    fn test_read_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, SETTINGS).unwrap();

        let config = read_config_file(&path).unwrap();
        assert_eq!(config.concurrency, Some(3));
        assert!(read_config_file(&temp_dir.path().join("missing.toml")).is_err());
    }
}
