//! Declarative UI element queries.
//!
//! A [`Selector`] describes one or more elements on the device screen by a set
//! of match criteria (text, class name, flags, position) and up to two nested
//! relations: one "child of" and one "sibling of" selector. Selectors are plain values: every refinement
//! returns a new selector, and the same value is re-sent to the agent on every
//! call so the match is always resolved against the live UI tree.
//!
//! # Wire shape
//!
//! ```text
//! {"className": "android.widget.ListView",
//!  "childSelector": {"text": "Wi-Fi", "instance": 0}}
//! ```
//!
//! Only criteria that were set are emitted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire key for the "child of" relation.
pub const CHILD_SELECTOR_KEY: &str = "childSelector";
/// Wire key for the "sibling of" relation.
pub const FROM_PARENT_KEY: &str = "fromParent";

/// Errors raised while building a selector from untyped input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
	/// The key is not a known match criterion.
	#[error("unknown selector criterion '{0}'")]
	UnknownCriterion(String),

	/// The value does not have the type the criterion expects.
	#[error("invalid value for '{field}': expected {expected}, got {got}")]
	InvalidValue {
		field: &'static str,
		expected: &'static str,
		got: String,
	},

	/// A relation key was passed where only plain criteria are accepted.
	#[error("'{0}' is a relation; use child() or sibling() instead")]
	RelationNotAllowed(String),

	/// The JSON input was not an object.
	#[error("selector must be a JSON object, got {0}")]
	NotAnObject(String),
}

/// Match criterion names understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
	Text,
	TextContains,
	TextMatches,
	TextStartsWith,
	ClassName,
	ClassNameMatches,
	Description,
	DescriptionContains,
	DescriptionMatches,
	DescriptionStartsWith,
	Checkable,
	Checked,
	Clickable,
	LongClickable,
	Scrollable,
	Enabled,
	Focusable,
	Focused,
	Selected,
	PackageName,
	PackageNameMatches,
	ResourceId,
	ResourceIdMatches,
	Index,
	Instance,
}

/// Value type carried by a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	/// String match (exact, contains, regex or prefix).
	Text,
	/// Boolean state flag.
	Flag,
	/// Non-negative position among siblings or matches.
	Position,
}

impl FieldKind {
	fn describe(self) -> &'static str {
		match self {
			Self::Text => "a string",
			Self::Flag => "a boolean",
			Self::Position => "a non-negative integer",
		}
	}
}

impl Field {
	/// Every criterion, in wire order.
	pub const ALL: [Field; 25] = [
		Field::Text,
		Field::TextContains,
		Field::TextMatches,
		Field::TextStartsWith,
		Field::ClassName,
		Field::ClassNameMatches,
		Field::Description,
		Field::DescriptionContains,
		Field::DescriptionMatches,
		Field::DescriptionStartsWith,
		Field::Checkable,
		Field::Checked,
		Field::Clickable,
		Field::LongClickable,
		Field::Scrollable,
		Field::Enabled,
		Field::Focusable,
		Field::Focused,
		Field::Selected,
		Field::PackageName,
		Field::PackageNameMatches,
		Field::ResourceId,
		Field::ResourceIdMatches,
		Field::Index,
		Field::Instance,
	];

	/// Returns the wire key.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::TextContains => "textContains",
			Self::TextMatches => "textMatches",
			Self::TextStartsWith => "textStartsWith",
			Self::ClassName => "className",
			Self::ClassNameMatches => "classNameMatches",
			Self::Description => "description",
			Self::DescriptionContains => "descriptionContains",
			Self::DescriptionMatches => "descriptionMatches",
			Self::DescriptionStartsWith => "descriptionStartsWith",
			Self::Checkable => "checkable",
			Self::Checked => "checked",
			Self::Clickable => "clickable",
			Self::LongClickable => "longClickable",
			Self::Scrollable => "scrollable",
			Self::Enabled => "enabled",
			Self::Focusable => "focusable",
			Self::Focused => "focused",
			Self::Selected => "selected",
			Self::PackageName => "packageName",
			Self::PackageNameMatches => "packageNameMatches",
			Self::ResourceId => "resourceId",
			Self::ResourceIdMatches => "resourceIdMatches",
			Self::Index => "index",
			Self::Instance => "instance",
		}
	}

	/// Returns the value type this criterion accepts.
	pub fn kind(self) -> FieldKind {
		match self {
			Self::Checkable
			| Self::Checked
			| Self::Clickable
			| Self::LongClickable
			| Self::Scrollable
			| Self::Enabled
			| Self::Focusable
			| Self::Focused
			| Self::Selected => FieldKind::Flag,
			Self::Index | Self::Instance => FieldKind::Position,
			_ => FieldKind::Text,
		}
	}
}

impl FromStr for Field {
	type Err = SelectorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == CHILD_SELECTOR_KEY || s == FROM_PARENT_KEY {
			return Err(SelectorError::RelationNotAllowed(s.to_string()));
		}
		Field::ALL
			.iter()
			.copied()
			.find(|field| field.as_str() == s)
			.ok_or_else(|| SelectorError::UnknownCriterion(s.to_string()))
	}
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A typed criterion value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
	Text(String),
	Flag(bool),
	Position(u32),
}

impl Criterion {
	fn kind(&self) -> FieldKind {
		match self {
			Self::Text(_) => FieldKind::Text,
			Self::Flag(_) => FieldKind::Flag,
			Self::Position(_) => FieldKind::Position,
		}
	}

	/// Converts to the JSON value sent on the wire.
	pub fn to_value(&self) -> Value {
		match self {
			Self::Text(s) => Value::String(s.clone()),
			Self::Flag(b) => Value::Bool(*b),
			Self::Position(n) => Value::from(*n),
		}
	}

	/// Builds a criterion for `field` from a JSON value, checking its type.
	pub fn from_json(field: Field, value: &Value) -> Result<Self, SelectorError> {
		let criterion = match (field.kind(), value) {
			(FieldKind::Text, Value::String(s)) => Some(Self::Text(s.clone())),
			(FieldKind::Flag, Value::Bool(b)) => Some(Self::Flag(*b)),
			(FieldKind::Position, Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(Self::Position),
			_ => None,
		};
		criterion.ok_or_else(|| SelectorError::InvalidValue {
			field: field.as_str(),
			expected: field.kind().describe(),
			got: value.to_string(),
		})
	}

	/// Parses a criterion for `field` from command-line style text.
	///
	/// Strings are taken verbatim, flags accept `true`/`false`, positions
	/// accept decimal integers.
	pub fn parse(field: Field, raw: &str) -> Result<Self, SelectorError> {
		let invalid = || SelectorError::InvalidValue {
			field: field.as_str(),
			expected: field.kind().describe(),
			got: raw.to_string(),
		};
		match field.kind() {
			FieldKind::Text => Ok(Self::Text(raw.to_string())),
			FieldKind::Flag => raw.parse().map(Self::Flag).map_err(|_| invalid()),
			FieldKind::Position => raw.parse().map(Self::Position).map_err(|_| invalid()),
		}
	}
}

impl From<&str> for Criterion {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for Criterion {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<bool> for Criterion {
	fn from(value: bool) -> Self {
		Self::Flag(value)
	}
}

impl From<u32> for Criterion {
	fn from(value: u32) -> Self {
		Self::Position(value)
	}
}

/// How a nested selector relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
	/// The nested selector matches a descendant of the parent match.
	Child,
	/// The nested selector matches a sibling of the parent match.
	Sibling,
}

impl RelationKind {
	/// Returns the wire key holding the nested selector.
	pub fn key(self) -> &'static str {
		match self {
			Self::Child => CHILD_SELECTOR_KEY,
			Self::Sibling => FROM_PARENT_KEY,
		}
	}
}

/// An immutable, composable UI element query.
///
/// Equality is structural. Cloning is cheap enough to do per call; nested
/// relations are owned by value, at most one of each [`RelationKind`] per
/// level. Deeper paths are built by nesting: `a.child(b.child(c))`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
	criteria: BTreeMap<Field, Criterion>,
	child: Option<Box<Selector>>,
	sibling: Option<Box<Selector>>,
}

macro_rules! criterion_builders {
	($($(#[$doc:meta])* $name:ident($ty:ty) => $field:ident;)*) => {
		$(
			$(#[$doc])*
			pub fn $name(&self, value: $ty) -> Self {
				self.set(Field::$field, Criterion::from(value))
			}
		)*
	};
}

impl Selector {
	/// Creates an empty selector (matches any element).
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy with `field` set to `value`, replacing any previous value.
	///
	/// Panics in debug builds if the value type does not match the field.
	fn set(&self, field: Field, value: Criterion) -> Self {
		debug_assert_eq!(field.kind(), value.kind(), "criterion type mismatch for {field}");
		let mut next = self.clone();
		next.criteria.insert(field, value);
		next
	}

	criterion_builders! {
		/// Exact text match.
		text(&str) => Text;
		text_contains(&str) => TextContains;
		/// Regular-expression text match.
		text_matches(&str) => TextMatches;
		text_starts_with(&str) => TextStartsWith;
		/// Exact widget class name, e.g. `android.widget.Button`.
		class_name(&str) => ClassName;
		class_name_matches(&str) => ClassNameMatches;
		/// Exact content description.
		description(&str) => Description;
		description_contains(&str) => DescriptionContains;
		description_matches(&str) => DescriptionMatches;
		description_starts_with(&str) => DescriptionStartsWith;
		package_name(&str) => PackageName;
		package_name_matches(&str) => PackageNameMatches;
		/// Fully qualified resource id, e.g. `com.android.settings:id/title`.
		resource_id(&str) => ResourceId;
		resource_id_matches(&str) => ResourceIdMatches;
		checkable(bool) => Checkable;
		checked(bool) => Checked;
		clickable(bool) => Clickable;
		long_clickable(bool) => LongClickable;
		scrollable(bool) => Scrollable;
		enabled(bool) => Enabled;
		focusable(bool) => Focusable;
		focused(bool) => Focused;
		selected(bool) => Selected;
		/// Position among the parent's children.
		index(u32) => Index;
		/// Zero-based position among all matches.
		instance(u32) => Instance;
	}

	/// Returns a new selector with `criteria` merged over the receiver.
	///
	/// Later values override earlier ones for the same key. Unknown keys and
	/// relation keys are rejected, as are values of the wrong type.
	pub fn with<I, K, V>(&self, criteria: I) -> Result<Self, SelectorError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<Value>,
	{
		let mut next = self.clone();
		for (key, value) in criteria {
			let field: Field = key.as_ref().parse()?;
			let criterion = Criterion::from_json(field, &value.into())?;
			next.criteria.insert(field, criterion);
		}
		Ok(next)
	}

	/// Returns the value of `field`, if set.
	pub fn get(&self, field: Field) -> Option<&Criterion> {
		self.criteria.get(&field)
	}

	/// Iterates over the set criteria in wire order.
	pub fn criteria(&self) -> impl Iterator<Item = (Field, &Criterion)> {
		self.criteria.iter().map(|(field, value)| (*field, value))
	}

	/// Returns the nested selector for `kind`, if set.
	pub fn relation(&self, kind: RelationKind) -> Option<&Selector> {
		match kind {
			RelationKind::Child => self.child.as_deref(),
			RelationKind::Sibling => self.sibling.as_deref(),
		}
	}

	/// Iterates over the set relations, child first.
	pub fn relations(&self) -> impl Iterator<Item = (RelationKind, &Selector)> {
		[RelationKind::Child, RelationKind::Sibling]
			.into_iter()
			.filter_map(|kind| self.relation(kind).map(|nested| (kind, nested)))
	}

	/// Returns true if no criterion and no relation is set.
	pub fn is_empty(&self) -> bool {
		self.criteria.is_empty() && self.child.is_none() && self.sibling.is_none()
	}

	/// Refines the query to a descendant matching `child`.
	///
	/// Replaces any child relation already set on the receiver.
	pub fn child(&self, child: Selector) -> Self {
		self.clone().attach(RelationKind::Child, child)
	}

	/// Refines the query to a sibling matching `sibling`.
	///
	/// Replaces any sibling relation already set on the receiver.
	pub fn sibling(&self, sibling: Selector) -> Self {
		self.clone().attach(RelationKind::Sibling, sibling)
	}

	/// Alias of [`child`](Self::child) using the agent's naming.
	pub fn child_selector(&self, child: Selector) -> Self {
		self.child(child)
	}

	/// Alias of [`sibling`](Self::sibling) using the agent's naming.
	pub fn from_parent(&self, sibling: Selector) -> Self {
		self.sibling(sibling)
	}

	fn attach(mut self, kind: RelationKind, nested: Selector) -> Self {
		let slot = match kind {
			RelationKind::Child => &mut self.child,
			RelationKind::Sibling => &mut self.sibling,
		};
		*slot = Some(Box::new(nested));
		self
	}

	/// Serializes to the agent's parameter shape.
	pub fn to_value(&self) -> Value {
		let mut map = Map::new();
		for (field, value) in &self.criteria {
			map.insert(field.as_str().to_string(), value.to_value());
		}
		for (kind, nested) in self.relations() {
			map.insert(kind.key().to_string(), nested.to_value());
		}
		Value::Object(map)
	}

	/// Parses a selector from its wire shape.
	pub fn from_value(value: &Value) -> Result<Self, SelectorError> {
		let Value::Object(map) = value else {
			return Err(SelectorError::NotAnObject(value.to_string()));
		};

		let mut selector = Selector::new();
		for (key, value) in map {
			let kind = match key.as_str() {
				CHILD_SELECTOR_KEY => Some(RelationKind::Child),
				FROM_PARENT_KEY => Some(RelationKind::Sibling),
				_ => None,
			};
			match kind {
				Some(kind) => selector = selector.attach(kind, Selector::from_value(value)?),
				None => {
					let field: Field = key.parse()?;
					selector.criteria.insert(field, Criterion::from_json(field, value)?);
				}
			}
		}
		Ok(selector)
	}
}

impl Serialize for Selector {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let len = self.criteria.len() + self.relations().count();
		let mut map = serializer.serialize_map(Some(len))?;
		for (field, value) in &self.criteria {
			map.serialize_entry(field.as_str(), &value.to_value())?;
		}
		for (kind, nested) in self.relations() {
			map.serialize_entry(kind.key(), nested)?;
		}
		map.end()
	}
}

impl<'de> Deserialize<'de> for Selector {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Selector::from_value(&value).map_err(de::Error::custom)
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_value())
	}
}
