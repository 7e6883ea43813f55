use std::time::Instant;

use clap::Parser;
use serde_json::Value;
use uia_cli::cli::Cli;
use uia_cli::commands;
use uia_cli::logging;
use uia_cli::output::{self, OutputFormat, ResultBuilder};

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let started = Instant::now();
	let name = commands::name(&cli.command);
	let format = cli.format;

	match commands::run(&cli) {
		Ok(outcome) => {
			let result = ResultBuilder::started(name, started)
				.serial(outcome.serial)
				.data(outcome.data)
				.build();
			output::print_result(&result, format);
		}
		Err(err) => {
			let cmd_error = err.to_command_error();

			// Always print to stderr for humans
			output::print_error_stderr(&cmd_error);

			// Also emit the envelope with ok=false for machine consumers
			if format != OutputFormat::Text {
				let result = ResultBuilder::<Value>::started(name, started).error(cmd_error).build();
				output::print_result(&result, format);
			}
			std::process::exit(1);
		}
	}
}
