use std::fmt::{self, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, Bson};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{candidate::Position, mongodb::Id};

/// Sentinel choice strings, as entered on the physical urna.
pub const BLANK_CHOICE: &str = "blank";
pub const NULL_CHOICE: &str = "null";

/// What a ballot points at: a real candidate, or one of the two sentinel
/// non-choices. The candidate reference is weak; the candidate may be
/// deleted after the vote is recorded.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum VoteChoice {
    Candidate(Id),
    Blank,
    Null,
}

impl VoteChoice {
    /// The string form used both in storage and as a result-map key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl Display for VoteChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate(id) => write!(f, "{id}"),
            Self::Blank => f.write_str(BLANK_CHOICE),
            Self::Null => f.write_str(NULL_CHOICE),
        }
    }
}

impl FromStr for VoteChoice {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            BLANK_CHOICE => Ok(Self::Blank),
            NULL_CHOICE => Ok(Self::Null),
            id => Ok(Self::Candidate(id.parse()?)),
        }
    }
}

// Stored as a plain string so sentinel and candidate references share one
// field, exactly as the document store holds them.
impl Serialize for VoteChoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VoteChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl From<VoteChoice> for Bson {
    fn from(choice: VoteChoice) -> Self {
        Bson::String(choice.to_string())
    }
}

/// A recorded vote, as stored in the `votes` collection. Immutable once
/// written; only the privileged reset removes votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub choice: VoteChoice,
    /// The casting voter's registration number.
    pub matricula: String,
    pub position: Position,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    pub fn new(choice: VoteChoice, matricula: String, position: Position) -> Self {
        Self {
            choice,
            matricula,
            position,
            cast_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// A ballot submission: who is voting, for which office, and the choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSpec {
    pub matricula: String,
    pub position: Position,
    pub choice: VoteChoice,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mongodb::bson::{from_bson, to_bson};
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn sentinels_have_fixed_keys() {
        assert_eq!(VoteChoice::Blank.key(), "blank");
        assert_eq!(VoteChoice::Null.key(), "null");
        assert_eq!("blank".parse::<VoteChoice>().unwrap(), VoteChoice::Blank);
        assert_eq!("null".parse::<VoteChoice>().unwrap(), VoteChoice::Null);
    }

    #[test]
    fn candidate_choice_keys_on_the_hex_id() {
        let id = Id::new();
        let choice = VoteChoice::Candidate(id);

        assert_eq!(choice.key(), id.to_string());
        assert_eq!(choice.key().parse::<VoteChoice>().unwrap(), choice);
    }

    #[test]
    fn malformed_choice_is_rejected() {
        assert!("thirteen".parse::<VoteChoice>().is_err());
    }

    #[test]
    fn ballot_spec_accepts_the_urna_wire_form() {
        let ballot: BallotSpec = serde_json::from_str(
            r#"{"matricula": "M001", "position": "Presidente", "choice": "blank"}"#,
        )
        .unwrap();

        assert_eq!(ballot.matricula, "M001");
        assert_eq!(ballot.position, Position::Presidente);
        assert_eq!(ballot.choice, VoteChoice::Blank);
    }

    #[test]
    fn vote_survives_the_bson_round_trip() {
        let mut vote = VoteCore::new(
            VoteChoice::Candidate(Id::new()),
            "M001".to_string(),
            Position::Senador,
        );
        // BSON datetimes have millisecond precision; use a round value.
        vote.cast_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let bson = to_bson(&vote).unwrap();
        let back: VoteCore = from_bson(bson).unwrap();

        assert_eq!(vote, back);
    }
}
