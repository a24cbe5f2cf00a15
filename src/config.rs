use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    value::{Dict, Map},
    Figment, Metadata, Profile, Provider,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub static_ips: Vec<String>,
    /// Renders are refused while fewer nodes than this have an address.
    pub min_node_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            kube_config: None,
            template_path: None,
            output_path: None,
            command: None,
            static_ips: Vec::new(),
            min_node_count: 1,
        }
    }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

/// [`Config`] after validation, with every required field present.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub kube_config: Option<PathBuf>,
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    pub command: String,
    pub static_ips: Vec<String>,
    pub min_node_count: usize,
}

impl Config {
    pub fn load(path: &Path, overrides: Overrides) -> anyhow::Result<Settings> {
        Self::figment(path, overrides)
            .extract::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
            .validate()
    }

    fn figment(path: &Path, overrides: Overrides) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        // A missing file is fine; defaults, env and flags may be enough.
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(CamelCaseKeys(Toml::file(path))),
            Some("json") => figment.merge(CamelCaseKeys(Json::file(path))),
            _ => figment.merge(CamelCaseKeys(Yaml::file(path))),
        };
        figment
            .merge(Env::prefixed("NODE_IP_WATCHER_"))
            .merge(Serialized::defaults(overrides))
    }

    pub fn validate(self) -> anyhow::Result<Settings> {
        let template_path = non_empty_path(self.template_path)
            .ok_or_else(|| anyhow::anyhow!("template_path is required"))?;
        let output_path = non_empty_path(self.output_path)
            .ok_or_else(|| anyhow::anyhow!("output_path is required"))?;
        let command = self
            .command
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow::anyhow!("command is required"))?;

        Ok(Settings {
            log_level: self.log_level,
            kube_config: non_empty_path(self.kube_config),
            template_path,
            output_path,
            command,
            static_ips: self.static_ips,
            min_node_count: self.min_node_count,
        })
    }
}

/// camelCase spellings accepted in config files.
const CAMEL_CASE_KEYS: &[(&str, &str)] = &[
    ("logLevel", "log_level"),
    ("kubeConfig", "kube_config"),
    ("templatePath", "template_path"),
    ("outputPath", "output_path"),
    ("staticIPs", "static_ips"),
    ("minNodeCount", "min_node_count"),
];

/// Renames camelCase keys of the wrapped provider to the field names of
/// [`Config`].  A snake_case key in the same file wins.
///
/// Serde aliases can't do this: the alias and the snake_case default key
/// would both reach `Config` and fail as a duplicate field.
struct CamelCaseKeys<P>(P);

impl<P: Provider> Provider for CamelCaseKeys<P> {
    fn metadata(&self) -> Metadata {
        self.0.metadata()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut data = self.0.data()?;
        for dict in data.values_mut() {
            for (camel, snake) in CAMEL_CASE_KEYS {
                if let Some(value) = dict.remove(*camel) {
                    dict.entry(snake.to_string()).or_insert(value);
                }
            }
        }
        Ok(data)
    }
}

fn non_empty_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}
