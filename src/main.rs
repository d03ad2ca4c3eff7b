use std::process::ExitCode;

use reveal::{CliArgs, Config};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> reveal::Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let config = Config::from_args(&args)?;
    reveal::run(config)
}
