//! Help and argument-error colours for `uia`.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects, Style};

const HEADING: Style = AnsiColor::Yellow.on_default().effects(Effects::BOLD);
const LITERAL: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = AnsiColor::Cyan.on_default();
const ERROR: Style = AnsiColor::Red.on_default().effects(Effects::BOLD);

/// Styles for `uia --help` and for rejected arguments such as a malformed
/// `--by key=value` pair. Errors use the same red as [`crate::output`]'s
/// stderr messages.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(HEADING)
		.usage(HEADING)
		.literal(LITERAL)
		.placeholder(PLACEHOLDER)
		.valid(LITERAL)
		.error(ERROR)
		.invalid(AnsiColor::Red.on_default())
}
