use clap::Parser;

mod common;
mod debug;
mod run;
mod simulate;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()>;
}

/// Drive the MRMS robot link from a host.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ToolOptions {
    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(clap::Subcommand, Debug)]
enum ToolCommand {
    /// Run the robot state machine on a serial port.
    Run(run::RunOpts),
    /// Play the peer microcontroller over TCP.
    Simulate(simulate::SimulateOpts),
}

impl ToolRun for ToolCommand {
    fn run(&self) -> anyhow::Result<()> {
        use ToolCommand::*;
        match self {
            Run(o) => o.run(),
            Simulate(o) => o.run(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    ToolOptions::parse().command.run()
}
