use clap::Parser;
use std::process::ExitCode;
use weather_summary::cli::Cli;
use weather_summary::job;
use weather_summary::logging::init_tracing;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.job_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("weather-summary: {err:#}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_tracing(&config.log_level) {
        eprintln!("weather-summary: {err:#}");
        return ExitCode::from(2);
    }

    match job::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        // already logged by the driver
        Err(_) => ExitCode::FAILURE,
    }
}
