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

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgMatches;
use clap::Command;
use clap::FromArgMatches as _;
use itertools::Itertools as _;
use tabdiff_lib::host::DiffEvent;
use tabdiff_lib::host::DiffHost;
use tabdiff_lib::host::DiffRequests;
use tabdiff_lib::options::DiffOptions;
use tabdiff_lib::session::DiffSession;
use tabdiff_lib::store::BufferId;
use tabdiff_lib::store::LineStore as _;
use tabdiff_lib::store::MemoryStore;
use tabdiff_lib::LineNr;
use tracing::instrument;
use tracing_subscriber::prelude::*;

use crate::command_error::config_error_with_message;
use crate::command_error::handle_command_result;
use crate::command_error::internal_error_with_message;
use crate::command_error::user_error;
use crate::command_error::user_error_with_message;
use crate::command_error::CommandError;
use crate::config::config_from_environment;
use crate::config::ConfigArg;
use crate::config::ConfigLayer;
use crate::config::ConfigSource;
use crate::render::render_view;
use crate::render::ViewOptions;
use crate::ui::Ui;

pub struct TracingSubscription {
    reload_log_filter: tracing_subscriber::reload::Handle<
        tracing_subscriber::EnvFilter,
        tracing_subscriber::Registry,
    >,
}

impl TracingSubscription {
    /// Initializes tracing with the default configuration. This should be
    /// called as early as possible.
    pub fn init() -> Self {
        let filter = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(tracing::metadata::LevelFilter::ERROR.into())
            .from_env_lossy();
        let (filter, reload_log_filter) = tracing_subscriber::reload::Layer::new(filter);
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::Layer::default()
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .init();
        TracingSubscription { reload_log_filter }
    }

    pub fn enable_debug_logging(&self) -> Result<(), CommandError> {
        self.reload_log_filter
            .modify(|filter| {
                *filter = tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::metadata::LevelFilter::DEBUG.into())
                    .from_env_lossy();
            })
            .map_err(|err| internal_error_with_message("failed to enable debug logging", err))?;
        tracing::info!("debug logging enabled");
        Ok(())
    }
}

/// Compare two to four files side by side
#[derive(clap::Parser, Clone, Debug)]
#[command(name = "tabdiff", max_term_width = 100)]
pub struct Args {
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(clap::Args, Clone, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Additional configuration options (can be repeated)
    ///
    /// The value is parsed as TOML, and taken as a string if that fails, so
    /// `--config diff.external.program=mydiff` works.
    #[arg(long, value_name = "NAME=VALUE", global = true)]
    pub config: Vec<ConfigArg>,
    /// Additional configuration files (can be repeated)
    #[arg(long, value_name = "PATH", global = true, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Vec<PathBuf>,
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    /// Silence messages about what a command did
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub diff_args: DiffArgs,
}

impl GlobalArgs {
    fn apply_overrides(&self, config: config::Config) -> Result<config::Config, config::ConfigError> {
        let mut overrides = self.diff_args.overrides();
        if self.quiet {
            overrides.push(("ui.quiet", true.into()));
        }
        overrides
            .into_iter()
            .try_fold(
                config::Config::builder().add_source(config),
                |builder, (key, value)| builder.set_override(key, value),
            )?
            .build()
    }
}

/// Flags overriding the `[diff]` table of the config.
#[derive(clap::Args, Clone, Debug, Default)]
#[command(next_help_heading = "Diff Options")]
pub struct DiffArgs {
    /// Internal diff algorithm: myers, minimal, patience or histogram
    #[arg(long, value_name = "NAME", global = true)]
    pub algorithm: Option<String>,
    /// Ignore changes in case
    #[arg(long, short = 'i', global = true)]
    pub ignore_case: bool,
    /// Ignore changes in the amount of white space
    #[arg(long, short = 'b', global = true)]
    pub ignore_space_change: bool,
    /// Ignore all white space
    #[arg(long, short = 'w', global = true)]
    pub ignore_all_space: bool,
    /// Ignore white space at the end of lines
    #[arg(long, short = 'Z', global = true)]
    pub ignore_space_at_eol: bool,
    /// Ignore changes consisting of blank lines
    #[arg(long, short = 'B', global = true)]
    pub ignore_blank_lines: bool,
    /// Align lines within changes spanning at most this many lines
    #[arg(long, value_name = "LINES", global = true)]
    pub linematch: Option<u32>,
    /// Run the external diff program instead of the internal diff
    #[arg(long, global = true)]
    pub external: bool,
    /// Unchanged lines to keep around changes when folding
    #[arg(long, value_name = "LINES", global = true)]
    pub context: Option<u32>,
    /// Don't show filler rows
    #[arg(long, global = true)]
    pub no_filler: bool,
}

impl DiffArgs {
    fn overrides(&self) -> Vec<(&'static str, config::Value)> {
        let flags = [
            ("diff.icase", self.ignore_case),
            ("diff.iwhite", self.ignore_space_change),
            ("diff.iwhiteall", self.ignore_all_space),
            ("diff.iwhiteeol", self.ignore_space_at_eol),
            ("diff.iblank", self.ignore_blank_lines),
        ];
        let mut overrides = flags
            .into_iter()
            .filter(|&(_, set)| set)
            .map(|(key, _)| (key, true.into()))
            .collect_vec();
        if let Some(algorithm) = &self.algorithm {
            overrides.push(("diff.algorithm", algorithm.as_str().into()));
        }
        if let Some(linematch) = self.linematch {
            overrides.push(("diff.linematch", i64::from(linematch).into()));
        }
        if self.external {
            overrides.push(("diff.internal", false.into()));
        }
        if let Some(context) = self.context {
            overrides.push(("diff.context", i64::from(context).into()));
        }
        if self.no_filler {
            overrides.push(("diff.filler", false.into()));
        }
        overrides
    }
}

/// Forwards the notifications of a diff session to the log, and remembers
/// which buffers a diffget or diffput changed.
#[derive(Clone, Debug, Default)]
pub struct CliHost {
    changed: Vec<BufferId>,
}

impl CliHost {
    /// Buffers changed by copying lines, in the order they were changed.
    pub fn changed_buffers(&self) -> &[BufferId] {
        &self.changed
    }
}

impl DiffHost for CliHost {
    fn fold_update(&mut self, buf: BufferId, first: LineNr, last: LineNr) {
        tracing::trace!(?buf, first, last, "fold update");
    }

    fn fire_event(&mut self, event: DiffEvent, _requests: &mut DiffRequests) {
        tracing::debug!(?event, "diff event");
        if let DiffEvent::LinesChanged { buf } = event {
            if !self.changed.contains(&buf) {
                self.changed.push(buf);
            }
        }
    }

    fn marks_adjusted(&mut self, buf: BufferId, first: LineNr, last: LineNr, amount_after: LineNr) {
        tracing::trace!(?buf, first, last, amount_after, "marks adjusted");
    }
}

/// Files loaded into a diff session.
#[derive(Debug)]
pub struct LoadedDiff {
    pub store: MemoryStore,
    pub session: DiffSession,
    pub host: CliHost,
    /// The loaded buffers, in the order the files were given.
    pub bufs: Vec<BufferId>,
}

impl LoadedDiff {
    /// Looks up a buffer by its file name, or by its 1-based position on the
    /// command line.
    pub fn resolve_buffer(&self, name: &str) -> Result<BufferId, CommandError> {
        if let Some(&buf) = self
            .bufs
            .iter()
            .find(|&&buf| self.store.name(buf) == Some(name))
        {
            return Ok(buf);
        }
        match name.parse::<usize>() {
            Ok(n) if (1..=self.bufs.len()).contains(&n) => Ok(self.bufs[n - 1]),
            _ => Err(user_error(format!("No buffer named {name:?} in the diff"))),
        }
    }

    pub fn name(&self, buf: BufferId) -> &str {
        self.store.name(buf).unwrap_or_default()
    }

    /// Adds another buffer to the diff.
    pub fn add_buffer(&mut self, buf: BufferId) -> Result<(), CommandError> {
        self.session.add_buffer(buf, &mut self.host)?;
        self.bufs.push(buf);
        Ok(())
    }

    pub fn refresh(&mut self) -> Result<(), CommandError> {
        self.session.refresh(&self.store, &mut self.host)?;
        Ok(())
    }

    pub fn render(&mut self, ui: &Ui, fold: bool) -> Vec<String> {
        let options = ViewOptions {
            width: ui.term_width(),
            fold,
        };
        render_view(&mut self.session, &self.store, &self.bufs, &options)
    }

    /// Writes the text of `buf` back to the file it was loaded from.
    pub fn write_back(&self, buf: BufferId) -> Result<(), CommandError> {
        let path = Path::new(self.name(buf));
        let mut content = vec![];
        self.store
            .write_range(buf, 1, self.store.line_count(buf), &mut content)?;
        fs::write(path, content).map_err(|err| {
            user_error_with_message(format!("Failed to write {}", path.display()), err)
        })
    }
}

pub struct CommandHelper {
    global_args: GlobalArgs,
    config: config::Config,
    options: DiffOptions,
}

impl CommandHelper {
    pub fn global_args(&self) -> &GlobalArgs {
        &self.global_args
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn diff_options(&self) -> &DiffOptions {
        &self.options
    }

    /// Loads `paths` into a new diff session and computes the blocks.
    #[instrument(skip(self))]
    pub fn load_diff(&self, paths: &[PathBuf]) -> Result<LoadedDiff, CommandError> {
        let mut diff = LoadedDiff {
            store: MemoryStore::new(),
            session: DiffSession::new(self.options.clone()),
            host: CliHost::default(),
            bufs: vec![],
        };
        for path in paths {
            let buf = diff.store.load_file(path)?;
            diff.add_buffer(buf)?;
        }
        diff.refresh()?;
        tracing::debug!(blocks = diff.session.blocks().len(), "loaded diff");
        Ok(diff)
    }
}

pub struct CliRunner {
    tracing_subscription: TracingSubscription,
    app: Command,
}

impl CliRunner {
    /// Initializes CLI environment and returns a builder. This should be called
    /// as early as possible.
    pub fn init() -> Self {
        CliRunner {
            tracing_subscription: TracingSubscription::init(),
            app: crate::commands::default_app(),
        }
    }

    /// Set the version to be displayed by `tabdiff --version`.
    pub fn version(mut self, version: &str) -> Self {
        self.app = self.app.version(version.to_owned());
        self
    }

    #[instrument(skip_all)]
    fn run_internal(&self, ui: &mut Ui, string_args: Vec<OsString>) -> Result<(), CommandError> {
        let mut stacked_config = config_from_environment()?;
        ui.reset(&stacked_config.merge()?)?;

        let matches: ArgMatches = self.app.clone().try_get_matches_from(string_args)?;
        let args = Args::from_arg_matches(&matches)?;
        if args.global_args.debug {
            self.tracing_subscription.enable_debug_logging()?;
        }

        for path in &args.global_args.config_file {
            let layer = ConfigLayer::load_from_file(ConfigSource::CommandArg, path)
                .map_err(|err| {
                    config_error_with_message(
                        format!("Failed to load {}", path.display()),
                        err,
                    )
                })?;
            stacked_config.add_layer(layer);
        }
        if !args.global_args.config.is_empty() {
            stacked_config.add_layer(ConfigLayer::from_assignments(
                ConfigSource::CommandArg,
                &args.global_args.config,
            )?);
        }
        let config = args
            .global_args
            .apply_overrides(stacked_config.merge()?)?;
        ui.reset(&config)?;
        let options = DiffOptions::from_config(&config)
            .map_err(|err| config_error_with_message("Invalid `diff` config", err))?;
        tracing::debug!(?options, "loaded diff options");

        let helper = CommandHelper {
            global_args: args.global_args,
            config,
            options,
        };
        crate::commands::run_command(ui, &helper, &matches)
    }

    #[must_use]
    #[instrument(skip(self))]
    pub fn run(self) -> ExitCode {
        let mut ui = Ui::null();
        let result = self.run_internal(&mut ui, env::args_os().collect());
        let exit_code = handle_command_result(&mut ui, result);
        let _ = ui.stdout().flush();
        exit_code
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use clap::Parser as _;

    use super::*;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_diff_args_override_config() {
        let args = Args::try_parse_from([
            "tabdiff",
            "-iw",
            "--algorithm=patience",
            "--linematch=40",
            "--context=2",
            "--no-filler",
            "--quiet",
        ])
        .unwrap();
        let base = config::Config::builder()
            .add_source(config::File::from_str(
                "diff.context = 9\ndiff.icase = false",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config = args.global_args.apply_overrides(base).unwrap();
        let options = DiffOptions::from_config(&config).unwrap();
        assert!(options.icase);
        assert!(options.iwhiteall);
        assert!(!options.iwhite);
        assert_eq!(options.algorithm, tabdiff_lib::diff::DiffAlgorithm::Patience);
        assert_eq!(options.linematch, Some(40));
        assert_eq!(options.context, 2);
        assert!(!options.filler);
        assert!(config.get_bool("ui.quiet").unwrap());
    }

    #[test]
    fn test_no_diff_args_keep_config() {
        let args = Args::try_parse_from(["tabdiff"]).unwrap();
        let base = config::Config::builder()
            .add_source(config::File::from_str(
                "[diff]\ninternal = false",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config = args.global_args.apply_overrides(base).unwrap();
        let options = DiffOptions::from_config(&config).unwrap();
        assert!(!options.internal);
        assert_eq!(options.context, 6);
    }
}
