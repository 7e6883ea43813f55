//! `--by key=value` selector arguments.

use std::str::FromStr;

use clap::Args;
use thiserror::Error;
use uia_protocol::{Criterion, Field, Selector, SelectorError};

/// One `key=value` criterion, typed against its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByArg {
	pub field: Field,
	pub value: Criterion,
}

/// Rejected `--by` argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByArgError {
	#[error("expected KEY=VALUE, got '{0}'")]
	MissingEquals(String),
	#[error(transparent)]
	Selector(#[from] SelectorError),
}

impl FromStr for ByArg {
	type Err = ByArgError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (key, raw) = s.split_once('=').ok_or_else(|| ByArgError::MissingEquals(s.to_string()))?;
		let field: Field = key.trim().parse()?;
		let value = Criterion::parse(field, raw)?;
		Ok(Self { field, value })
	}
}

fn build(criteria: &[ByArg]) -> Result<Selector, SelectorError> {
	Selector::new().with(criteria.iter().map(|c| (c.field.as_str(), c.value.to_value())))
}

/// Element addressing shared by `click`, `exists`, `count` and `text`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SelectorArgs {
	/// Match criterion, e.g. `text=OK` or `clickable=true` (repeatable)
	#[arg(long = "by", value_name = "KEY=VALUE", required = true)]
	pub by: Vec<ByArg>,

	/// Criterion for a descendant of the match (repeatable)
	#[arg(long = "child", value_name = "KEY=VALUE")]
	pub child: Vec<ByArg>,

	/// Criterion for a sibling of the match (repeatable)
	#[arg(long = "sibling", value_name = "KEY=VALUE", conflicts_with = "child")]
	pub sibling: Vec<ByArg>,

	/// Pick the n-th match (0-based)
	#[arg(long, value_name = "N")]
	pub nth: Option<u32>,
}

impl SelectorArgs {
	pub fn selector(&self) -> Result<Selector, SelectorError> {
		let base = build(&self.by)?;
		if !self.child.is_empty() {
			return Ok(base.child(build(&self.child)?));
		}
		if !self.sibling.is_empty() {
			return Ok(base.sibling(build(&self.sibling)?));
		}
		Ok(base)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_typed_values() {
		let text: ByArg = "text=a=b".parse().unwrap();
		assert_eq!(text.field, Field::Text);
		assert_eq!(text.value, Criterion::Text("a=b".into()));

		let flag: ByArg = "clickable=true".parse().unwrap();
		assert_eq!(flag.value, Criterion::Flag(true));

		let index: ByArg = "instance=2".parse().unwrap();
		assert_eq!(index.value, Criterion::Position(2));
	}

	#[test]
	fn rejects_malformed_input() {
		assert!(matches!("text".parse::<ByArg>(), Err(ByArgError::MissingEquals(_))));
		assert!(matches!(
			"colour=red".parse::<ByArg>(),
			Err(ByArgError::Selector(SelectorError::UnknownCriterion(_)))
		));
		assert!(matches!(
			"checked=yes".parse::<ByArg>(),
			Err(ByArgError::Selector(SelectorError::InvalidValue { .. }))
		));
		assert!(matches!(
			"childSelector=x".parse::<ByArg>(),
			Err(ByArgError::Selector(SelectorError::RelationNotAllowed(_)))
		));
	}

	#[test]
	fn builds_nested_selector() {
		let args = SelectorArgs {
			by: vec!["scrollable=true".parse().unwrap()],
			child: vec!["text=Wi-Fi".parse().unwrap()],
			sibling: vec![],
			nth: None,
		};
		assert_eq!(
			args.selector().unwrap().to_value(),
			json!({"scrollable": true, "childSelector": {"text": "Wi-Fi"}})
		);
	}
}
