use clap::{Parser, Subcommand};

mod plot;
mod run;
mod validate;

#[derive(Parser, Debug)]
#[command(name = "scqc", version, about = "Single-cell RNA-seq quality control")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute QC metrics, outlier flags, normalization and plots
    Run(run::RunArgs),
    /// Load the input and report its layout
    Validate(validate::ValidateArgs),
    /// Draw a single QC plot
    #[command(subcommand)]
    Plot(plot::PlotCommand),
}

impl Cli {
    pub fn dispatch(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => run::handle(args),
            Command::Validate(args) => validate::handle(args),
            Command::Plot(cmd) => plot::handle(cmd),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/cli/mod.rs"]
mod tests;
