use super::conditions::cmd_conditions;
use super::run::cmd_run;
use super::timings::cmd_timings;
use super::validate::cmd_validate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(command: Commands, ctx: &CliContext) -> Result<()> {
    match command {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Validate(args) => cmd_validate(args, ctx).await,
        Commands::Timings(args) => cmd_timings(args, ctx).await,
        Commands::Conditions(args) => cmd_conditions(args, ctx).await,
    }
}
