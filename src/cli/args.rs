// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: A single command taking the workflow file to run plus global options

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_WORKFLOW: &str = "workflow.json";

#[derive(Parser, Debug)]
#[command(name = "stepflow")]
#[command(about = "Run JSON-described desktop automation workflows")]
#[command(version)]
pub struct Args {
    #[arg(default_value = DEFAULT_WORKFLOW, help = "Path to workflow JSON file")]
    pub workflow: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Dry run - load and check the workflow without executing")]
    pub dry_run: bool,

    #[arg(short, long, help = "Write the run result as JSON to this file")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Collect browser element captures while the workflow runs")]
    pub capture: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
