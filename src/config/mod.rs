pub mod toml_config;

pub use toml_config::{GatewayConfig, Role};

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "movies-gateway")]
#[command(about = "Movie aggregation gateway and catalog services")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Aggregate movie info and reviews behind /v1/movies
    Gateway {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Serve /v1/moviesinfo from an in-memory store
    MoviesInfo {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Serve /v1/reviews from an in-memory store
    Reviews {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl Command {
    pub fn role(&self) -> Role {
        match self {
            Command::Gateway { .. } => Role::Gateway,
            Command::MoviesInfo { .. } => Role::MoviesInfo,
            Command::Reviews { .. } => Role::Reviews,
        }
    }

    pub fn bind_override(&self) -> Option<&str> {
        match self {
            Command::Gateway { bind }
            | Command::MoviesInfo { bind }
            | Command::Reviews { bind } => bind.as_deref(),
        }
    }
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the file configuration (or defaults) and applies the command line
    /// overrides on top.
    pub fn load(&self) -> crate::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(bind) = self.command.bind_override() {
            let server = match self.command.role() {
                Role::Gateway => &mut config.gateway,
                Role::MoviesInfo => &mut config.movies_info,
                Role::Reviews => &mut config.reviews,
            };
            server.bind = Some(bind.to_string());
        }
        if self.json_logs {
            config.logging.json = Some(true);
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommand_with_bind_override() {
        let cli = CliConfig::parse_from([
            "movies-gateway",
            "--verbose",
            "reviews",
            "--bind",
            "127.0.0.1:9999",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.command.role(), Role::Reviews);

        let config = cli.load().unwrap();
        assert_eq!(config.bind_for(Role::Reviews), "127.0.0.1:9999");
        assert_eq!(config.bind_for(Role::Gateway), toml_config::DEFAULT_GATEWAY_BIND);
    }

    #[test]
    fn test_json_logs_flag_overrides_file() {
        let cli = CliConfig::parse_from(["movies-gateway", "gateway", "--json-logs"]);
        let config = cli.load().unwrap();
        assert!(config.json_logs());
    }
}
