//! uigen binary

use uigen::{EnhancedCli, GeneratorError};
use std::process;

fn main() {
    let mut cli = EnhancedCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(GeneratorError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e @ GeneratorError::Generation { .. }) => {
            eprintln!("❌ {}", e);
            eprintln!("   Units written before the failure were kept on disk.");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
