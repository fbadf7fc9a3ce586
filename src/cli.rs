use crate::validation::ReviewType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camara-review")]
#[command(version)]
#[command(about = "Rule-based review of CAMARA API definitions", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review API definitions and write the report files
    Review {
        /// Repository root or directory containing the API definitions
        path: PathBuf,

        /// Output directory for the report files
        #[arg(short, long)]
        output: PathBuf,

        /// Commonalities version to validate against (env: CAMARA_COMMONALITIES_VERSION)
        #[arg(short, long)]
        commonalities_version: Option<String>,

        /// Type of review (env: CAMARA_REVIEW_TYPE)
        #[arg(short = 't', long, value_enum)]
        review_type: Option<ReviewType>,

        /// Test definitions directory (defaults to code/Test_definitions)
        #[arg(long)]
        tests_dir: Option<PathBuf>,

        /// Repository name shown in the report
        #[arg(long)]
        repo_name: Option<String>,

        /// Issue or pull request number shown in the report
        #[arg(long)]
        issue_number: Option<String>,

        /// Pull request URL shown in the report
        #[arg(long)]
        pr_url: Option<String>,

        /// Who triggered the review
        #[arg(long)]
        triggered_by: Option<String>,

        /// Critical items listed in the summary (env: CAMARA_REVIEW_MAX_CRITICAL)
        #[arg(long)]
        max_critical: Option<usize>,

        /// Critical plus medium items listed in the summary (env: CAMARA_REVIEW_MAX_ITEMS)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// List implemented ruleset versions and their rules
    Rules {
        /// Commonalities version whose rules are listed
        #[arg(short, long)]
        commonalities_version: Option<String>,
    },
}
