use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::classify::BuildType;

/// Build-system detection and AI-assisted build repair
#[derive(Parser, Debug)]
#[command(
    name = "buildmend",
    about = "Build-system detection and AI-assisted build repair",
    version,
    long_about = "buildmend inspects a repository, infers which build system it uses, \
                  synthesizes the most plausible build invocation, and on failure drives \
                  a bounded retry loop that asks an AI oracle for a minimal unified diff \
                  and applies it to the working tree."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect build systems in a repository",
        long_about = "Scans the repository, classifies its build systems, writes the \
                      detection artifacts under .buildmend/, and generates the probe \
                      workflow.\n\n\
                      Examples:\n  \
                      buildmend detect\n  \
                      buildmend detect /path/to/repo"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Synthesize the build command for a category",
        long_about = "Synthesizes the most probable build invocation for the given \
                      category and prints exactly one BUILD_CMD=<command> line to \
                      stdout. Also writes the structured probe report.\n\n\
                      Examples:\n  \
                      buildmend probe --target android\n  \
                      buildmend probe --target cmake /path/to/repo"
    )]
    Probe(ProbeArgs),

    #[command(
        about = "Run the build and drive the AI fix loop on failure",
        long_about = "Captures the failing build output once, then repeatedly asks the \
                      configured oracle for a minimal unified diff and applies it, \
                      bounded by the attempt budget. Exits zero only when the working \
                      tree changed.\n\n\
                      Examples:\n  \
                      buildmend fix\n  \
                      buildmend fix --build-cmd 'make -j' --attempts 5"
    )]
    Fix(FixArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ProbeArgs {
    #[arg(
        short = 't',
        long,
        value_name = "CATEGORY",
        help = "Build category to probe (android, linux, cmake, node, python, rust, dotnet, maven, flutter, go, bazel, scons, unknown)"
    )]
    pub target: BuildType,

    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct FixArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        long,
        value_name = "CMD",
        help = "Build command to diagnose (falls back to $BUILD_CMD, then to synthesis)"
    )]
    pub build_cmd: Option<String>,

    #[arg(long, value_name = "N", help = "Retry attempts (overrides BUILDMEND_ATTEMPTS)")]
    pub attempts: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn detect_defaults() {
        let args = CliArgs::parse_from(["buildmend", "detect"]);
        match args.command {
            Commands::Detect(detect) => assert!(detect.repository_path.is_none()),
            _ => panic!("expected detect command"),
        }
    }

    #[test]
    fn probe_requires_target() {
        assert!(CliArgs::try_parse_from(["buildmend", "probe"]).is_err());
    }

    #[test]
    fn probe_parses_target() {
        let args = CliArgs::parse_from(["buildmend", "probe", "--target", "android"]);
        match args.command {
            Commands::Probe(probe) => assert_eq!(probe.target, BuildType::Android),
            _ => panic!("expected probe command"),
        }
    }

    #[test]
    fn probe_rejects_unknown_category_name() {
        assert!(
            CliArgs::try_parse_from(["buildmend", "probe", "--target", "fortran"]).is_err()
        );
    }

    #[test]
    fn fix_parses_overrides() {
        let args = CliArgs::parse_from([
            "buildmend",
            "fix",
            "/tmp/repo",
            "--build-cmd",
            "make -j",
            "--attempts",
            "5",
        ]);
        match args.command {
            Commands::Fix(fix) => {
                assert_eq!(fix.repository_path, Some(PathBuf::from("/tmp/repo")));
                assert_eq!(fix.build_cmd.as_deref(), Some("make -j"));
                assert_eq!(fix.attempts, Some(5));
            }
            _ => panic!("expected fix command"),
        }
    }

    #[test]
    fn global_flags_parse() {
        let args = CliArgs::parse_from(["buildmend", "-v", "detect"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["buildmend", "-q", "detect"]);
        assert!(args.quiet);

        let args = CliArgs::parse_from(["buildmend", "--log-level", "debug", "detect"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
