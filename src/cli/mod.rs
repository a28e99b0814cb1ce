// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::backends::BackendConfig;
use crate::error::Result;
use crate::invoker::RetryPolicy;
use crate::types::*;
use crate::GeneratorOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Template {
    Hierarchical,
    Legacy,
}

pub struct EnhancedCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        match matches.subcommand() {
            Some(("plan", sub_matches)) => handlers::handle_plan_command(sub_matches),
            Some(("generate", sub_matches)) => handlers::handle_generate_command(self, sub_matches),
            Some(("registry", sub_matches)) => handlers::handle_registry_command(self, sub_matches),
            Some(("init", sub_matches)) => handlers::handle_init_command(sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .global(true)
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .global(true)
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("plan")
                    .about("Show the groups and generation queue for a specification")
                    .arg(Arg::new("input").help("Specification JSON file").required(true).index(1))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("text").help("Output format")),
            )
            .subcommand(
                Command::new("generate")
                    .about("Generate every unit of a specification")
                    .arg(Arg::new("input").help("Specification JSON file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("DIR").help("Output directory"))
                    .arg(Arg::new("project").short('p').long("project").value_name("DIR").default_value(".").help("Project directory holding the readiness marker"))
                    .arg(Arg::new("force").long("force").help("Generate even if the project is not marked ready").action(ArgAction::SetTrue))
                    .arg(Arg::new("provider").long("provider").value_name("NAME").help("Provider priority (repeatable)").action(ArgAction::Append))
                    .arg(Arg::new("max-attempts").long("max-attempts").value_name("N").value_parser(clap::value_parser!(u32)).help("Attempts per unit on the local path"))
                    .arg(Arg::new("timeout").long("timeout").value_name("MS").value_parser(clap::value_parser!(u64)).help("Per-attempt timeout in milliseconds"))
                    .arg(Arg::new("extension").short('e').long("extension").value_name("EXT").help("File extension for generated units"))
                    .arg(Arg::new("registry").long("registry").help("Rebuild the preview registry afterwards").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("registry")
                    .about("Build the preview registry for an output directory")
                    .arg(Arg::new("dir").help("Output directory to scan").index(1))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for file changes and rebuild").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("init")
                    .about("Initialize a new uigen project")
                    .arg(Arg::new("name").help("Project directory").required(true).index(1))
                    .arg(Arg::new("template").short('t').long("template").value_parser(clap::value_parser!(Template)).default_value("hierarchical").help("Specification template")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Output directory from the flag, then config, then the default
    pub fn output_directory(&self, flag: Option<&String>) -> String {
        flag.cloned()
            .or_else(|| self.config.output_directory.clone())
            .unwrap_or_else(|| GeneratorOptions::default().output_directory)
    }

    pub fn build_generator_options(&self, matches: &clap::ArgMatches) -> Result<GeneratorOptions> {
        let mut options = GeneratorOptions::default();
        options.output_directory = self.output_directory(matches.get_one::<String>("output"));

        let defaults = RetryPolicy::default();
        options.retry = RetryPolicy::new(
            matches
                .get_one::<u32>("max-attempts")
                .copied()
                .or(self.config.max_attempts)
                .unwrap_or(defaults.max_attempts),
            self.config
                .base_delay_ms
                .unwrap_or(defaults.base_delay.as_millis() as u64),
            self.config
                .max_jitter_ms
                .unwrap_or(defaults.max_jitter.as_millis() as u64),
        );

        let timeout_ms = matches
            .get_one::<u64>("timeout")
            .copied()
            .or(self.config.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        options.timeout = Duration::from_millis(timeout_ms);

        if let Some(extension) = matches
            .get_one::<String>("extension")
            .or(self.config.file_extension.as_ref())
        {
            options.file_extension = extension.trim_start_matches('.').to_string();
        }

        let project_dir = matches.get_one::<String>("project").map_or(".", String::as_str);
        if let Ok(path) = std::path::Path::new(project_dir).canonicalize() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                options.project = name.to_string();
            }
        }
        Ok(options)
    }

    /// Credentials come from the process environment; priority and hosted
    /// endpoint from flags, then config
    pub fn build_backend_config(&self, matches: &clap::ArgMatches) -> Result<BackendConfig> {
        let priority = match matches.get_many::<String>("provider") {
            Some(names) => config::parse_providers(names.map(String::as_str))?,
            None => self.config.providers()?,
        };
        let mut backend_config =
            BackendConfig::from_lookup(|key| std::env::var(key).ok()).with_priority(priority);
        if let Some(endpoint) = &self.config.hosted_endpoint {
            backend_config = backend_config.with_hosted_endpoint(endpoint.clone());
        }
        log::debug!("Backend configuration: {:?}", backend_config);
        Ok(backend_config)
    }
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}
