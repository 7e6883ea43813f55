//! Window hierarchy dumps.

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::debug;
use uia_runtime::Result;

use super::Device;

/// Options for [`Device::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
	/// Also write the raw XML here.
	pub path: Option<PathBuf>,
	/// Ask the agent to drop layout-only nodes.
	pub compressed: bool,
	/// Re-indent single-line XML before returning it.
	pub pretty: bool,
}

impl Default for DumpOptions {
	fn default() -> Self {
		Self {
			path: None,
			compressed: true,
			pretty: true,
		}
	}
}

impl DumpOptions {
	pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn compressed(mut self, compressed: bool) -> Self {
		self.compressed = compressed;
		self
	}

	pub fn pretty(mut self, pretty: bool) -> Self {
		self.pretty = pretty;
		self
	}
}

impl Device {
	/// Dumps the current window hierarchy as XML.
	///
	/// The file at `options.path` always receives the raw agent output; only
	/// the returned string is pretty-printed.
	pub fn dump(&self, options: &DumpOptions) -> Result<String> {
		let content: String = self.call_as("dumpWindowHierarchy", vec![json!(options.compressed), Value::Null])?;
		if let Some(path) = &options.path {
			debug!(target = "uia", path = %path.display(), bytes = content.len(), "writing hierarchy dump");
			fs::write(path, content.as_bytes())?;
		}
		if options.pretty && !content.contains("\n ") {
			return Ok(pretty_xml(&content));
		}
		Ok(content)
	}
}

enum Token<'a> {
	/// `<?...?>`, `<!...>`
	Prolog(&'a str),
	Open(&'a str),
	Close(&'a str),
	Empty(&'a str),
	Text(&'a str),
}

fn tag_end(s: &str) -> Option<usize> {
	let mut quote = None;
	for (i, c) in s.char_indices() {
		match (quote, c) {
			(None, '"' | '\'') => quote = Some(c),
			(Some(q), c) if c == q => quote = None,
			(None, '>') => return Some(i),
			_ => {}
		}
	}
	None
}

fn tokenize(xml: &str) -> Vec<Token<'_>> {
	let mut tokens = Vec::new();
	let mut rest = xml;
	while !rest.is_empty() {
		if rest.starts_with('<') {
			let Some(end) = tag_end(rest) else {
				tokens.push(Token::Text(rest));
				break;
			};
			let tag = &rest[..=end];
			tokens.push(if tag.starts_with("<?") || tag.starts_with("<!") {
				Token::Prolog(tag)
			} else if tag.starts_with("</") {
				Token::Close(tag)
			} else if tag.ends_with("/>") {
				Token::Empty(tag)
			} else {
				Token::Open(tag)
			});
			rest = &rest[end + 1..];
		} else {
			let end = rest.find('<').unwrap_or(rest.len());
			tokens.push(Token::Text(&rest[..end]));
			rest = &rest[end..];
		}
	}
	tokens
}

/// Re-indents XML with two spaces per level, one tag or text run per line.
///
/// This is a layout pass only: nothing is parsed or validated, and malformed
/// input is emitted as-is.
pub fn pretty_xml(xml: &str) -> String {
	let mut out = String::with_capacity(xml.len() + xml.len() / 4);
	let mut depth = 0usize;
	let mut line = |depth: usize, s: &str| {
		for _ in 0..depth {
			out.push_str("  ");
		}
		out.push_str(s);
		out.push('\n');
	};

	for token in tokenize(xml) {
		match token {
			Token::Prolog(s) | Token::Empty(s) => line(depth, s),
			Token::Open(s) => {
				line(depth, s);
				depth += 1;
			}
			Token::Close(s) => {
				depth = depth.saturating_sub(1);
				line(depth, s);
			}
			Token::Text(s) => {
				let s = s.trim();
				if !s.is_empty() {
					line(depth, s);
				}
			}
		}
	}
	out
}
