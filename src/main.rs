use std::path::PathBuf;

use clap::Parser as ClapParser;

use rill::driver::Driver;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts a REPL when omitted
    script: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    let mut driver = Driver::new();

    match args.script.as_slice() {
        [] => driver.run_prompt()?,

        [file] => {
            let code = driver.run_file(file)?;

            if code != 0 {
                std::process::exit(code);
            }
        }

        _ => {
            println!("Usage: rill [script]");
            std::process::exit(64);
        }
    }

    Ok(())
}
