//! Selector-addressed commands.

use serde_json::{Value, json};
use uia::{Device, Selector, UiElement, UiObject};

use crate::cli::Commands;
use crate::error::Result;
use crate::selector_args::SelectorArgs;

#[derive(Clone, Copy)]
enum Action<'a> {
	Click,
	Exists,
	Count,
	Text { set: Option<&'a str> },
}

pub(super) struct ElementCommand<'a> {
	selector: Selector,
	nth: Option<u32>,
	action: Action<'a>,
}

impl<'a> ElementCommand<'a> {
	/// `None` for commands that do not address an element.
	pub(super) fn parse(command: &'a Commands) -> Result<Option<Self>> {
		let (args, action): (&SelectorArgs, Action<'a>) = match command {
			Commands::Click(args) => (args, Action::Click),
			Commands::Exists(args) => (args, Action::Exists),
			Commands::Count(args) => (args, Action::Count),
			Commands::Text { target, set } => (target, Action::Text { set: set.as_deref() }),
			_ => return Ok(None),
		};
		Ok(Some(Self {
			selector: args.selector()?,
			nth: args.nth,
			action,
		}))
	}

	fn resolve<'d>(&self, device: &'d Device) -> Result<UiObject<'d>> {
		let object = device.find(self.selector.clone());
		match self.nth {
			Some(index) => Ok(object.nth(index)?),
			None => Ok(object),
		}
	}

	pub(super) fn execute(self, device: &Device) -> Result<Value> {
		Ok(match self.action {
			// Counting ignores --nth: it reports the whole match set.
			Action::Count => json!(device.find(self.selector.clone()).count()?),
			Action::Click => json!(self.resolve(device)?.click()?),
			Action::Exists => match self.nth {
				None => json!(device.exists(&self.selector)?),
				Some(index) => json!(device.find(self.selector.clone()).count()? > index),
			},
			Action::Text { set: Some(text) } => json!(self.resolve(device)?.set_text(text)?),
			Action::Text { set: None } => json!(self.resolve(device)?.info()?.text),
		})
	}
}
