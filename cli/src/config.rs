// Copyright 2024 The Jujutsu Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Layered configuration: built-in defaults, the user's config file, and
//! command-line arguments.

use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use config::ConfigError;
use tracing::instrument;

const DEFAULT_CONFIG: &str = include_str!("config/defaults.toml");

/// Parses a TOML value expression. Interprets the given value as string if it
/// can't be parsed.
pub fn parse_value_or_bare_string(value_str: &str) -> config::Value {
    if value_str.contains(['\n', '\r']) {
        return value_str.into();
    }
    config::Config::builder()
        .add_source(config::File::from_str(
            &format!("value = {value_str}"),
            config::FileFormat::Toml,
        ))
        .build()
        .and_then(|config| config.get::<config::Value>("value"))
        .unwrap_or_else(|_| value_str.into())
}

/// Where a layer of configuration comes from, lowest precedence first.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ConfigSource {
    Default,
    User,
    /// `--config-file` and `--config`.
    CommandArg,
}

/// `--config NAME=VALUE`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigArg {
    pub name: String,
    pub value: String,
}

impl FromStr for ConfigArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing config name in {s:?}"));
        }
        Ok(ConfigArg {
            name: name.to_owned(),
            value: value.trim().to_owned(),
        })
    }
}

impl fmt::Display for ConfigArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Set of configuration variables with source information.
#[derive(Clone, Debug)]
pub struct ConfigLayer {
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
    pub data: config::Config,
}

impl ConfigLayer {
    /// Parses TOML document `text` into new layer.
    pub fn parse(source: ConfigSource, text: &str) -> Result<Self, ConfigError> {
        let data = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        Ok(ConfigLayer {
            source,
            path: None,
            data,
        })
    }

    /// Loads a TOML file, which must exist.
    pub fn load_from_file(source: ConfigSource, path: &Path) -> Result<Self, ConfigError> {
        let data = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .build()?;
        Ok(ConfigLayer {
            source,
            path: Some(path.to_owned()),
            data,
        })
    }

    /// Builds a layer out of `NAME=VALUE` assignments. Later assignments win.
    pub fn from_assignments(source: ConfigSource, args: &[ConfigArg]) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        for arg in args {
            builder = builder.set_override(&arg.name, parse_value_or_bare_string(&arg.value))?;
        }
        Ok(ConfigLayer {
            source,
            path: None,
            data: builder.build()?,
        })
    }
}

/// Stack of configuration layers which can be merged as needed.
#[derive(Clone, Debug)]
pub struct StackedConfig {
    /// Layers sorted by `source`, the lowest precedence one first.
    layers: Vec<ConfigLayer>,
}

impl StackedConfig {
    pub fn empty() -> Self {
        StackedConfig { layers: vec![] }
    }

    /// Inserts new layer after the other layers of the same source.
    pub fn add_layer(&mut self, layer: ConfigLayer) {
        let index = self
            .layers
            .iter()
            .take_while(|other| other.source <= layer.source)
            .count();
        self.layers.insert(index, layer);
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Creates new merged config.
    pub fn merge(&self) -> Result<config::Config, ConfigError> {
        self.layers
            .iter()
            .fold(config::Config::builder(), |builder, layer| {
                builder.add_source(layer.data.clone())
            })
            .build()
    }
}

/// The built-in defaults.
pub fn default_config_layer() -> Result<ConfigLayer, ConfigError> {
    ConfigLayer::parse(ConfigSource::Default, DEFAULT_CONFIG)
}

fn resolve_user_config_path(
    tabdiff_config: Option<String>,
    config_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = tabdiff_config.filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let config_dir = config_home
        .filter(|dir| dir.is_absolute())
        .or_else(|| home_dir.map(|home| home.join(".config")))?;
    Some(config_dir.join("tabdiff").join("config.toml"))
}

/// Path of the user's config file: `$TABDIFF_CONFIG`, or `config.toml` in the
/// `tabdiff` directory of the user's config directory.
pub fn user_config_path() -> Option<PathBuf> {
    resolve_user_config_path(
        env::var("TABDIFF_CONFIG").ok(),
        env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
    )
}

/// Loads the defaults and the user's config file if it exists.
#[instrument]
pub fn config_from_environment() -> Result<StackedConfig, ConfigError> {
    let mut config = StackedConfig::empty();
    config.add_layer(default_config_layer()?);
    if let Some(path) = user_config_path() {
        if path.is_file() {
            tracing::debug!(?path, "loading user config");
            config.add_layer(ConfigLayer::load_from_file(ConfigSource::User, &path)?);
        }
    }
    Ok(config)
}
