//! Avaliar CLI
//!
//! Entry point for preprocessing, training, and prediction.
//!
//! # Usage
//!
//! ```bash
//! # Preprocess a listing batch and train both estimators
//! avaliar train listings.json --models-dir models
//!
//! # Cluster listings spatially and print per-cluster aggregates
//! avaliar analyze listings.json --clusters 5
//!
//! # Price one listing
//! avaliar predict --operation sale --size 80 --dorms 2 --toilets 1 \
//!     --latitude -23.55 --longitude -46.63
//! ```

use avaliar::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
