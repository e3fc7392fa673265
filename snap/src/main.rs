// External crates
use clap::Parser;

// Internal imports
use snap_core::snap_error;
use snap_provider::ProviderError;

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

fn main() {
    let args = Args::parse();

    if let Err(e) = execute_command(args) {
        match e.downcast_ref::<ProviderError>() {
            Some(provider) => snap_error!("Error: {}", provider.user_friendly()),
            None => snap_error!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
