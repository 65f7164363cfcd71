use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, ConfigError};
use crate::logging::{self, LoggingError};
use crate::model::{MatchType, PortRange, Rule};
use crate::router_service::{RouterService, ServiceError};
use crate::transport;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "linkroute")]
#[command(about = "Route URLs to the right browser and profile", long_about = None)]
pub struct Cli {
    /// Config file; defaults to config.toml in the data directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Route a URL and open it in the chosen destination
    Open { url: String },
    /// Show where a URL would go without opening it
    Test { url: String },
    /// Manage routing rules
    #[command(subcommand)]
    Rules(RulesCommand),
    /// Switch routing on or off
    Toggle,
    /// Set the fallback destination; omit the id to clear it
    Fallback { destination_id: Option<String> },
    /// List installed destinations
    Destinations,
    /// Show recently routed URLs
    Recent {
        #[arg(long)]
        clear: bool,
    },
    /// Answer one JSON request and print the JSON response
    Request { json: String },
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    List,
    Add {
        pattern: String,
        destination_id: String,
        #[arg(short = 't', long = "type", value_parser = parse_match_type, default_value = "domain")]
        match_type: MatchType,
        #[arg(short, long)]
        profile: Option<String>,
        /// A port or start-end range, e.g. 8000-8999
        #[arg(long, value_parser = parse_port_range)]
        ports: Option<PortRange>,
        #[arg(long)]
        disabled: bool,
    },
    Remove { id: String },
    /// Move rules so they sit before the rule currently at `to`
    Move {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        to: usize,
    },
    Enable { id: String },
    Disable { id: String },
}

impl Command {
    /// Commands that change stored state; only these create a missing config file.
    pub fn writes_settings(&self) -> bool {
        match self {
            Self::Rules(RulesCommand::List) => false,
            Self::Rules(_) | Self::Toggle | Self::Fallback { .. } => true,
            Self::Recent { clear } => *clear,
            Self::Open { .. } | Self::Test { .. } | Self::Destinations | Self::Request { .. } => {
                false
            }
        }
    }
}

fn parse_match_type(input: &str) -> Result<MatchType, String> {
    MatchType::parse(input).ok_or_else(|| {
        let known: Vec<&str> = MatchType::ALL.iter().map(|t| t.display_name()).collect();
        format!("unknown match type '{input}'; expected one of {}", known.join(", "))
    })
}

fn parse_port_range(input: &str) -> Result<PortRange, String> {
    PortRange::parse(input).map_err(|error| error.to_string())
}

pub fn run(cli: Cli) -> Result<(), RuntimeError> {
    let config = config::load(cli.config.as_deref())?;
    if cli.command.writes_settings() && !config.config_path.exists() {
        config::save(&config)?;
        eprintln!(
            "[linkroute] wrote default config to {}",
            config.config_path.display()
        );
    }
    match logging::init(&config.log_level) {
        Ok(path) => tracing::debug!(log = %path.display(), "logging initialized"),
        Err(error) => eprintln!("[linkroute] logging disabled: {error}"),
    }

    let mut service = RouterService::new(config)?;
    tracing::info!(
        destinations = service.catalog().destinations().len(),
        rules = service.store().rules().len(),
        "router ready"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&mut service, cli.command, &mut out)
}

pub fn execute(
    service: &mut RouterService,
    command: Command,
    out: &mut dyn Write,
) -> Result<(), RuntimeError> {
    match command {
        Command::Open { url } => {
            let decision = service.handle_url(&url);
            writeln!(out, "{}", decision.explain())?;
        }
        Command::Test { url } => {
            writeln!(out, "{}", service.decide(&url).explain())?;
        }
        Command::Rules(command) => execute_rules(service, command, out)?,
        Command::Toggle => {
            let enabled = service.store_mut().toggle_enabled().map_err(ServiceError::from)?;
            writeln!(out, "routing {}", if enabled { "enabled" } else { "disabled" })?;
        }
        Command::Fallback { destination_id } => {
            service
                .store_mut()
                .set_fallback(destination_id.as_deref())
                .map_err(ServiceError::from)?;
            match service.store().state().fallback_destination_id.as_deref() {
                Some(id) => writeln!(out, "fallback set to {id}")?,
                None => writeln!(out, "fallback cleared")?,
            }
        }
        Command::Destinations => {
            let default_id = service.catalog().default_id();
            for destination in service.catalog().destinations() {
                let marker = if default_id == Some(destination.id.as_str()) {
                    " (default)"
                } else {
                    ""
                };
                writeln!(
                    out,
                    "[{}] {}{marker}  {}",
                    service.catalog().badge_letter(&destination.id),
                    destination.name,
                    destination.id
                )?;
                for profile in &destination.profiles {
                    writeln!(out, "      {}  {}", profile.name, profile.id)?;
                }
            }
        }
        Command::Recent { clear } => {
            if clear {
                service
                    .store_mut()
                    .clear_recent_routes()
                    .map_err(ServiceError::from)?;
                writeln!(out, "recent routes cleared")?;
            } else {
                for route in &service.store().state().recent_routes {
                    writeln!(
                        out,
                        "{}  {} → {}",
                        route.timestamp.format("%Y-%m-%d %H:%M"),
                        route.display_url(),
                        route.destination_name
                    )?;
                }
            }
        }
        Command::Request { json } => {
            writeln!(out, "{}", transport::handle_json(service, &json))?;
        }
    }
    Ok(())
}

fn execute_rules(
    service: &mut RouterService,
    command: RulesCommand,
    out: &mut dyn Write,
) -> Result<(), RuntimeError> {
    match command {
        RulesCommand::List => {
            for rule in service.store().rules() {
                writeln!(out, "{}", describe_rule(rule))?;
            }
        }
        RulesCommand::Add {
            pattern,
            destination_id,
            match_type,
            profile,
            ports,
            disabled,
        } => {
            let mut rule = Rule::new(&pattern, match_type, &destination_id);
            rule.profile_id = profile;
            rule.port_range = ports;
            rule.enabled = !disabled;
            let rule = service.add_rule(rule)?;
            writeln!(out, "added {}", describe_rule(&rule))?;
        }
        RulesCommand::Remove { id } => {
            let removed = service.store_mut().delete(&id).map_err(ServiceError::from)?;
            writeln!(out, "removed {}", describe_rule(&removed))?;
        }
        RulesCommand::Move { ids, to } => {
            service
                .store_mut()
                .move_rules(&ids, to)
                .map_err(ServiceError::from)?;
            for rule in service.store().rules() {
                writeln!(out, "{}", describe_rule(rule))?;
            }
        }
        RulesCommand::Enable { id } => {
            service
                .store_mut()
                .set_rule_enabled(&id, true)
                .map_err(ServiceError::from)?;
            writeln!(out, "enabled {id}")?;
        }
        RulesCommand::Disable { id } => {
            service
                .store_mut()
                .set_rule_enabled(&id, false)
                .map_err(ServiceError::from)?;
            writeln!(out, "disabled {id}")?;
        }
    }
    Ok(())
}

fn describe_rule(rule: &Rule) -> String {
    let mut line = format!(
        "{:>3} {} {:<8} {} → {}",
        rule.priority,
        if rule.enabled { "on " } else { "off" },
        rule.match_type.display_name().to_lowercase(),
        rule.pattern,
        rule.destination_id
    );
    if let Some(profile) = &rule.profile_id {
        line.push_str(&format!(" [{profile}]"));
    }
    if let Some(ports) = &rule.port_range {
        line.push_str(&format!(" :{ports}"));
    }
    line.push_str(&format!("  ({})", rule.id));
    line
}
