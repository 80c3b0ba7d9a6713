use crate::types::Role;
use clap::Parser;
use std::path::PathBuf;

/// Replay metro card events through the fare settlement engine
#[derive(Parser, Debug)]
#[command(name = "metro-fare-engine")]
#[command(about = "Replay metro card events through the fare settlement engine", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing card events
    #[arg(value_name = "EVENTS", help = "Path to the input CSV file of card events")]
    pub events_file: PathBuf,

    /// Number of stations to seed before replay
    #[arg(
        long = "stations",
        value_name = "COUNT",
        default_value_t = 16,
        help = "Seed stations 1..=COUNT into the registry before replay"
    )]
    pub stations: u32,

    /// Role the replay acts as when authorizing privileged events
    #[arg(
        long = "role",
        value_name = "ROLE",
        value_enum,
        default_value_t = Role::Staff,
        help = "Operator role: admin, staff, or passenger"
    )]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_role(&["program", "events.csv"], Role::Staff)]
    #[case::explicit_admin(&["program", "--role", "admin", "events.csv"], Role::Admin)]
    #[case::explicit_passenger(&["program", "--role", "passenger", "events.csv"], Role::Passenger)]
    fn test_role_parsing(#[case] args: &[&str], #[case] expected: Role) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.role, expected);
    }

    #[rstest]
    #[case::default_stations(&["program", "events.csv"], 16)]
    #[case::custom_stations(&["program", "--stations", "4", "events.csv"], 4)]
    fn test_station_count(#[case] args: &[&str], #[case] expected: u32) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.stations, expected);
    }

    #[test]
    fn test_events_file_is_positional() {
        let parsed = CliArgs::try_parse_from(["program", "events.csv"]).unwrap();
        assert_eq!(parsed.events_file, PathBuf::from("events.csv"));
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_role(&["program", "--role", "conductor", "events.csv"])]
    #[case::invalid_stations(&["program", "--stations", "many", "events.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
