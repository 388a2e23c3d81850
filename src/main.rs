use clap::Parser;
use selftarget::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{compare, features, predict, reads, reconcile, train},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Reconcile(_) => "reconcile",
        Command::Features(_) => "features",
        Command::Reads(_) => "reads",
        Command::Train(_) => "train",
        Command::Predict(_) => "predict",
        Command::Compare(_) => "compare",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Reconcile(args) => reconcile::reconcile(args)?,
        Command::Features(args) => features::features(args)?,
        Command::Reads(args) => reads::reads(args)?,
        Command::Train(args) => train::train(args)?,
        Command::Predict(args) => predict::predict(args)?,
        Command::Compare(args) => compare::compare(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
