mod check;
mod cli;
mod paths;
mod run;

use anyhow::Result;

use crate::cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check(args)) => check::check(args),
        Some(Command::DefaultShader) => {
            print!("{}", renderer::DEFAULT_FRAGMENT_SHADER);
            Ok(())
        }
        None => run::run(cli.run),
    }
}
