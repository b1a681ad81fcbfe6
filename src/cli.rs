//! Command-line definition.

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the server command line.
pub fn build_cli() -> Command {
    Command::new("eventsync")
        .about("Collaborative event synchronization server")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Config file (default: ./eventsync.toml, written on first run)"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Listen address, overrides `bind` from the config file"),
        )
        .arg(
            Arg::new("init")
                .long("init")
                .action(ArgAction::SetTrue)
                .help("Write the default config file and exit"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parses_overrides() {
        let matches = build_cli()
            .try_get_matches_from(["eventsync", "--config", "/tmp/e.toml", "--bind", "0.0.0.0:9000"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("/tmp/e.toml"))
        );
        assert_eq!(
            matches.get_one::<String>("bind").map(String::as_str),
            Some("0.0.0.0:9000")
        );
        assert!(!matches.get_flag("init"));
    }
}
