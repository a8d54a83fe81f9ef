//! Configuration for the generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (fhirgen.toml)
//! - Environment variables (FHIRGEN_*)
//!
//! ## Example config file (fhirgen.toml):
//! ```toml
//! [source]
//! path = "./fhir-xsd"
//!
//! [output]
//! path = "./generated"
//! crate_name = "fhir_model"
//!
//! [tests]
//! skip = false
//! endpoint = "https://hapi.fhir.org/baseR4"
//!
//! [xml]
//! parse_options = ["COMPACT", "NSCLEAN"]
//! ```

use std::path::PathBuf;

use config_crate::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Main configuration for a generation run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Schema source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Test generation settings
    #[serde(default)]
    pub tests: TestConfig,

    /// XML codec settings passed through into generated code
    #[serde(default)]
    pub xml: XmlConfig,

    /// Resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Schema source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory containing the XSD corpus
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Basename of the foundational document, parsed like any other but
    /// required to exist
    #[serde(default = "default_base_document")]
    pub base_document: String,

    /// Basenames excluded from ingestion outright
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the generated library is written into
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Name stamped into the generated library
    #[serde(default = "default_crate_name")]
    pub crate_name: String,

    /// Path template for per-type class files; `{ns}` and `{file}` are
    /// substituted with the type's namespace segment and file stem
    #[serde(default = "default_class_template")]
    pub class_path_template: String,

    /// Path template for per-type test files
    #[serde(default = "default_test_template")]
    pub test_path_template: String,
}

/// Test generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestConfig {
    /// Skip test generation entirely
    #[serde(default)]
    pub skip: bool,

    /// FHIR endpoint URL; when set, integration tests are generated for
    /// domain resources
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// XML codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlConfig {
    /// Parser option flags passed through verbatim into each generated XML
    /// codec
    #[serde(default = "default_parse_options")]
    pub parse_options: Vec<String>,
}

/// Resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Type names permitted to participate in self-referential inheritance
    /// cycles; anything else cycling is a fatal integrity error
    #[serde(default = "default_cycle_whitelist")]
    pub cycle_whitelist: Vec<String>,
}

// Default value functions
fn default_base_document() -> String {
    "fhir-base.xsd".to_string()
}

fn default_exclude() -> Vec<String> {
    vec!["xml.xsd".to_string()]
}

fn default_crate_name() -> String {
    "fhir_model".to_string()
}

fn default_class_template() -> String {
    "src/{ns}/{file}.rs".to_string()
}

fn default_test_template() -> String {
    "tests/{ns}/{file}.rs".to_string()
}

fn default_parse_options() -> Vec<String> {
    vec!["COMPACT".to_string(), "NSCLEAN".to_string()]
}

fn default_cycle_whitelist() -> Vec<String> {
    vec!["ResourceContainer".to_string()]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            base_document: default_base_document(),
            exclude: default_exclude(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            crate_name: default_crate_name(),
            class_path_template: default_class_template(),
            test_path_template: default_test_template(),
        }
    }
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            parse_options: default_parse_options(),
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cycle_whitelist: default_cycle_whitelist(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_locations = ["fhirgen.toml", ".fhirgen.toml", "config/fhirgen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "fhirgen") {
            let xdg_config = config_dir.config_dir().join("fhirgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("FHIRGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Check the configuration before any ingestion begins.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let source = self
            .source
            .path
            .as_ref()
            .ok_or(ConfigurationError::MissingSourcePath)?;
        if !source.is_dir() {
            return Err(ConfigurationError::BadSourcePath(source.clone()));
        }
        if self.output.path.is_none() {
            return Err(ConfigurationError::MissingOutputPath);
        }
        if !self.output.class_path_template.contains("{file}") {
            return Err(ConfigurationError::Invalid(
                "class_path_template must contain {file}".to_string(),
            ));
        }
        Ok(())
    }

    /// Schema source directory (resolves relative paths)
    pub fn source_path(&self) -> Option<PathBuf> {
        self.source.path.as_ref().map(|p| absolutize(p))
    }

    /// Output directory (resolves relative paths)
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.path.as_ref().map(|p| absolutize(p))
    }
}

fn absolutize(p: &PathBuf) -> PathBuf {
    if p.is_absolute() {
        p.clone()
    } else {
        std::env::current_dir().unwrap_or_default().join(p)
    }
}
