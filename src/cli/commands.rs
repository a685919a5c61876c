use clap::Subcommand;

use super::conditions::ConditionsArgs;
use super::run::RunArgs;
use super::timings::TimingsArgs;
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Execute a plan against a browser
    Run(RunArgs),

    /// Load a plan and report problems without running it
    Validate(ValidateArgs),

    /// Show learned wait estimates
    Timings(TimingsArgs),

    /// List condition keys and their expressions
    Conditions(ConditionsArgs),
}
