//! CLI for weibullit: give every particle of a brittle SPH body its crack
//! activation thresholds.

mod commands;

use clap::{Parser, Subcommand};

use commands::{Format, InputArgs, WeibullArgs};

#[derive(Parser)]
#[command(name = "weibullit")]
#[command(about = "weibullit: Weibull crack activation thresholds for SPH particle snapshots")]
#[command(version = weibullit_core::VERSION)]
struct Cli {
    /// Log every step of the distribution (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read particles, distribute flaws and write the weibulled particles
    Distribute {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        weibull: WeibullArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Output record format
        #[arg(long, value_enum, default_value_t = Format::Plain)]
        format: Format,

        /// Write a JSON run summary to this path
        #[arg(long)]
        summary: Option<String>,

        /// Run the statistical checks on the result and print them to stderr
        #[arg(long)]
        check: bool,
    },

    /// Show what a run would do without distributing anything
    Plan {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        weibull: WeibullArgs,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Distribute {
            input,
            weibull,
            output,
            format,
            summary,
            check,
        } => commands::distribute::run(commands::distribute::DistributeCommandConfig {
            input: &input,
            weibull: &weibull,
            output_path: output.as_deref(),
            dialect: format.into(),
            summary_path: summary.as_deref(),
            check,
        }),
        Commands::Plan { input, weibull } => commands::plan::run(&input, &weibull),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_distribute_flags() {
        let cli = Cli::try_parse_from([
            "weibullit", "distribute", "-f", "in.dat", "-o", "out.dat", "-B", "-t", "-1", "-P",
            "-S", "-s", "7", "-M", "40", "-A", "2.5", "--format", "fixed", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Distribute {
            input,
            weibull,
            output,
            format,
            summary,
            check,
        } = cli.command
        else {
            panic!("expected distribute");
        };
        assert_eq!(input.filename.as_deref(), Some("in.dat"));
        assert!(input.porous);
        assert!(input.plastic_strain);
        assert!(!input.restarted);
        assert!(weibull.basalt);
        assert_eq!(weibull.material_type, Some(-1));
        assert_eq!(weibull.seed, 7);
        assert_eq!(weibull.max, 40);
        assert_eq!(weibull.volume, Some(2.5));
        assert_eq!(output.as_deref(), Some("out.dat"));
        assert_eq!(format, Format::Fixed);
        assert!(summary.is_none());
        assert!(!check);
    }

    #[test]
    fn test_k_and_m_required_without_basalt() {
        assert!(Cli::try_parse_from(["weibullit", "plan", "-k", "1e30"]).is_err());
        assert!(Cli::try_parse_from(["weibullit", "plan", "-k", "1e30", "-m", "9"]).is_ok());
        assert!(Cli::try_parse_from(["weibullit", "plan", "--basalt"]).is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(
            Cli::try_parse_from(["weibullit", "distribute", "-B", "--format", "csv"]).is_err()
        );
    }
}
