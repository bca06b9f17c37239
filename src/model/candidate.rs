use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use mongodb::bson::{doc, to_bson, Bson, Document};
use rocket::form::{self, prelude::ErrorKind, FromFormField, ValueField};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// The fixed set of offices that can be contested.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Presidente,
    Governador,
    Senador,
    #[serde(rename = "Deputado Federal")]
    DeputadoFederal,
    #[serde(rename = "Deputado Estadual")]
    DeputadoEstadual,
    Vereador,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Presidente,
        Position::Governador,
        Position::Senador,
        Position::DeputadoFederal,
        Position::DeputadoEstadual,
        Position::Vereador,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Presidente => "Presidente",
            Self::Governador => "Governador",
            Self::Senador => "Senador",
            Self::DeputadoFederal => "Deputado Federal",
            Self::DeputadoEstadual => "Deputado Estadual",
            Self::Vereador => "Vereador",
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Position> for Bson {
    fn from(position: Position) -> Self {
        to_bson(&position).expect("Serialisation is infallible")
    }
}

impl FromStr for Position {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|position| position.as_str() == s)
            .ok_or(())
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Position {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field.value.parse::<Position>().map_err(|_| {
            ErrorKind::InvalidChoice {
                choices: Cow::Owned(
                    Position::ALL
                        .iter()
                        .map(|position| position.as_str().into())
                        .collect(),
                ),
            }
            .into()
        })
    }
}

/// Core candidate data, as stored in the `candidates` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// Ballot number, one or two digits. Uniqueness per position is NOT
    /// enforced; the roll is small and curated by hand.
    pub number: String,
    pub name: String,
    pub party: String,
    pub position: Position,
}

impl CandidateCore {
    /// Filter matching every candidate running for a position.
    pub fn by_position(position: Position) -> Document {
        doc! { "position": position }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Candidate registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub number: String,
    pub name: String,
    pub party: String,
    pub position: Position,
}

impl CandidateSpec {
    /// Validate ballot-number format and name length before accepting.
    pub fn validate(&self) -> Result<()> {
        let digits_only = self.number.chars().all(|c| c.is_ascii_digit());
        if self.number.is_empty() || self.number.len() > 2 || !digits_only {
            return Err(Error::BadRequest(format!(
                "Ballot number must be 1-2 digits, got '{}'",
                self.number
            )));
        }
        if self.name.chars().count() < 3 {
            return Err(Error::BadRequest(
                "Candidate name must be at least 3 characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<CandidateSpec> for NewCandidate {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            number: spec.number,
            name: spec.name,
            party: spec.party,
            position: spec.position,
        }
    }
}


#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn positions_serialize_to_their_display_names() {
        let json = serde_json::to_string(&Position::DeputadoFederal).unwrap();
        assert_eq!(json, "\"Deputado Federal\"");

        let back: Position = serde_json::from_str("\"Deputado Estadual\"").unwrap();
        assert_eq!(back, Position::DeputadoEstadual);
    }

    #[test]
    fn every_position_parses_from_its_display_name() {
        for position in Position::ALL {
            assert_eq!(position.as_str().parse::<Position>(), Ok(position));
        }
        assert!("Prefeito".parse::<Position>().is_err());
    }

    #[test]
    fn valid_spec_is_accepted() {
        assert!(CandidateSpec::example().validate().is_ok());

        let mut single_digit = CandidateSpec::example();
        single_digit.number = "7".to_string();
        assert!(single_digit.validate().is_ok());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        for number in ["", "123", "1a", "x"] {
            let mut spec = CandidateSpec::example();
            spec.number = number.to_string();
            assert!(spec.validate().is_err(), "number '{number}' should fail");
        }
    }

    #[test]
    fn short_names_are_rejected() {
        let mut spec = CandidateSpec::example();
        spec.name = "Jo".to_string();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn position_filter_uses_the_display_name() {
        let filter = CandidateCore::by_position(Position::DeputadoFederal);
        assert_eq!(filter.get_str("position").unwrap(), "Deputado Federal");
    }
}
