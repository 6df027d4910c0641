//! Vendor permission scopes requested during authorization.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// Errors emitted when parsing scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// The scope name is not part of the vendor's permission list.
	#[error("Unknown scope: {scope}.")]
	Unknown {
		/// The offending scope string.
		scope: String,
	},
	/// Whitespace-only input.
	#[error("Scope entries cannot be empty.")]
	Empty,
}

/// One permission in the vendor's fixed list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
	/// Activity and exercise logs.
	Activity,
	/// Cardio fitness score (VO2 max).
	CardioFitness,
	/// ECG readings.
	Electrocardiogram,
	/// Heart rate time series.
	Heartrate,
	/// GPS and location data.
	Location,
	/// Food and water logs.
	Nutrition,
	/// SpO2 readings.
	OxygenSaturation,
	/// Profile details.
	Profile,
	/// Breathing rate readings.
	RespiratoryRate,
	/// Device and alarm settings.
	Settings,
	/// Sleep logs and stages.
	Sleep,
	/// Friends and leaderboards.
	Social,
	/// Skin and core temperature.
	Temperature,
	/// Weight and body fat logs.
	Weight,
}
impl Scope {
	/// Every scope, in the vendor's documented order.
	pub const ALL: [Scope; 14] = [
		Scope::Activity,
		Scope::CardioFitness,
		Scope::Electrocardiogram,
		Scope::Heartrate,
		Scope::Location,
		Scope::Nutrition,
		Scope::OxygenSaturation,
		Scope::Profile,
		Scope::RespiratoryRate,
		Scope::Settings,
		Scope::Sleep,
		Scope::Social,
		Scope::Temperature,
		Scope::Weight,
	];

	/// Wire name used in the `scope` query parameter.
	pub const fn as_str(self) -> &'static str {
		match self {
			Scope::Activity => "activity",
			Scope::CardioFitness => "cardio_fitness",
			Scope::Electrocardiogram => "electrocardiogram",
			Scope::Heartrate => "heartrate",
			Scope::Location => "location",
			Scope::Nutrition => "nutrition",
			Scope::OxygenSaturation => "oxygen_saturation",
			Scope::Profile => "profile",
			Scope::RespiratoryRate => "respiratory_rate",
			Scope::Settings => "settings",
			Scope::Sleep => "sleep",
			Scope::Social => "social",
			Scope::Temperature => "temperature",
			Scope::Weight => "weight",
		}
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Scope {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Scope::ALL
			.into_iter()
			.find(|scope| scope.as_str() == s)
			.ok_or_else(|| ScopeValidationError::Unknown { scope: s.to_owned() })
	}
}

/// Deduplicated, sorted set of [`Scope`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet(BTreeSet<Scope>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Self {
		Self(scopes.into_iter().collect())
	}

	/// Every scope the vendor offers; requested on each authorization.
	pub fn all() -> Self {
		Self::new(Scope::ALL)
	}

	/// Iterator over the scopes in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
		self.0.iter().copied()
	}

	/// Space-delimited wire representation.
	pub fn normalized(&self) -> String {
		self.iter().map(Scope::as_str).collect::<Vec<_>>().join(" ")
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		s.split_whitespace().map(Scope::from_str).collect::<Result<BTreeSet<_>, _>>().map(Self)
	}
}
