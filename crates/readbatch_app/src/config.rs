use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use readbatch_core::{BookMode, ReadingRanges, RunSettings};
use readbatch_engine::{ClientSettings, EngineConfig};
use readbatch_logging::batch_info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::{Args, ModeArg};
use crate::error::AppError;

/// Settings file, in RON. Every field is optional.
///
/// ```ron
/// (
///     api_url: "http://localhost:8000",
///     mode: Search("machado"),
///     ranges: (min_time: 10, max_time: 60, min_percent: 70, max_percent: 100,
///              min_questions: 3, max_questions: 10),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api_url: String,
    pub poll_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub mode: BookMode,
    pub ranges: ReadingRanges,
    pub output_dir: PathBuf,
    /// Fixed seed for book picks and reading targets.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            api_url: client.base_url,
            poll_interval_secs: 5,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            mode: BookMode::default(),
            ranges: ReadingRanges::default(),
            output_dir: PathBuf::from("."),
            seed: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or returns the defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|message| AppError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        batch_info!("loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    /// Command-line values win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(api_url) = &args.api_url {
            self.api_url = api_url.clone();
        }
        if let Some(output) = &args.output {
            self.output_dir = output.clone();
        }

        let term = args.term.clone();
        let slug = args.slug.clone();
        self.mode = match (args.mode, term, slug) {
            (Some(ModeArg::Recommended), _, _) => BookMode::Recommended,
            (Some(ModeArg::Indicated), _, _) => BookMode::Indicated,
            (Some(ModeArg::Search), term, _) => BookMode::Search(term.unwrap_or_else(|| {
                match &self.mode {
                    BookMode::Search(current) => current.clone(),
                    _ => String::new(),
                }
            })),
            (Some(ModeArg::Slug), _, slug) => BookMode::Slug(slug.unwrap_or_else(|| {
                match &self.mode {
                    BookMode::Slug(current) => current.clone(),
                    _ => String::new(),
                }
            })),
            (None, Some(term), _) => BookMode::Search(term),
            (None, None, Some(slug)) => BookMode::Slug(slug),
            (None, None, None) => self.mode.clone(),
        };
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let url = Url::parse(self.api_url.trim()).map_err(|err| AppError::ApiUrl {
            url: self.api_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ApiUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Setting(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(AppError::Setting("timeouts must be at least 1 second".to_string()));
        }
        self.run_settings().validate()?;
        Ok(())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            mode: self.mode.clone(),
            ranges: self.ranges,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            client: ClientSettings {
                base_url: self.api_url.trim().to_string(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            seed: self.seed,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use readbatch_core::ValidationError;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["readbatch", "--accounts", "accounts.txt"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args")
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::parse(
            r#"(api_url: "https://books.example", mode: Search("machado"))"#,
        )
        .expect("config");
        assert_eq!(config.api_url, "https://books.example");
        assert_eq!(config.mode, BookMode::Search("machado".to_string()));
        assert_eq!(config.ranges, ReadingRanges::default());
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(AppConfig::parse("(api_adress: \"x\")").is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = AppConfig::load(Some(&dir.path().join("absent.ron"))).unwrap_err();
        assert!(matches!(err, AppError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("readbatch.ron");
        fs::write(&path, "(poll_interval_secs: 2, seed: Some(9))").expect("write");
        let config = AppConfig::load(Some(&path)).expect("config");
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.engine_config().poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn term_flag_implies_search_mode() {
        let mut config = AppConfig::default();
        config.apply_args(&args(&["--term", "iracema", "--api-url", "http://10.0.0.2:9000"]));
        assert_eq!(config.mode, BookMode::Search("iracema".to_string()));
        assert_eq!(config.api_url, "http://10.0.0.2:9000");
        config.validate().expect("valid");
    }

    #[test]
    fn search_mode_without_term_fails_validation() {
        let mut config = AppConfig::default();
        config.apply_args(&args(&["--mode", "search"]));
        assert!(matches!(
            config.validate(),
            Err(AppError::Validation(ValidationError::MissingSearchTerm))
        ));
    }

    #[test]
    fn mode_flag_keeps_configured_slug() {
        let mut config = AppConfig {
            mode: BookMode::Slug("o-guarani".to_string()),
            ..AppConfig::default()
        };
        config.apply_args(&args(&["--mode", "slug"]));
        assert_eq!(config.mode, BookMode::Slug("o-guarani".to_string()));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let config = AppConfig {
            api_url: "ftp://books.example".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::ApiUrl { .. })));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let config = AppConfig {
            ranges: ReadingRanges {
                min_time: 30,
                max_time: 20,
                ..ReadingRanges::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AppError::Validation(ValidationError::InvalidRange { .. }))
        ));
    }
}
