use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{
    doc, serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime, Document,
};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{opt_chrono_datetime_as_bson_datetime, Id};

/// Core voter data, as stored in the `voters` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// The voter's registration number, unique across the roll.
    pub matricula: String,
    pub name: String,
    /// Class/cohort label, display only.
    pub turma: String,
    pub has_voted: bool,
    #[serde(
        default,
        with = "opt_chrono_datetime_as_bson_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub voted_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoterCore {
    /// A voter fresh off registration: has not voted.
    pub fn new(spec: VoterSpec) -> Self {
        Self {
            matricula: spec.matricula,
            name: spec.name,
            turma: spec.turma,
            has_voted: false,
            voted_at: None,
            created_at: Utc::now(),
        }
    }

    /// Filter matching a registration number.
    pub fn by_matricula(matricula: &str) -> Document {
        doc! { "matricula": matricula }
    }

    /// Filter matching a registration number only while the voter has not
    /// voted. Updating through this filter is what makes the mark-as-voted
    /// step atomic: two concurrent ballots can both observe
    /// `has_voted == false`, but only one update can match.
    pub fn vote_guard(matricula: &str) -> Document {
        doc! { "matricula": matricula, "has_voted": false }
    }

    /// Update setting the voted flag and timestamp.
    pub fn mark_voted(at: DateTime<Utc>) -> Document {
        doc! {
            "$set": {
                "has_voted": true,
                "voted_at": BsonDateTime::from_chrono(at),
            }
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterSpec {
    pub matricula: String,
    pub name: String,
    pub turma: String,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterSpec {
        pub fn example() -> Self {
            Self {
                matricula: "M001".to_string(),
                name: "Maria Souza".to_string(),
                turma: "3B".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mongodb::bson::{from_bson, to_bson, Bson};

    use super::*;

    #[test]
    fn registration_starts_unvoted() {
        let voter = VoterCore::new(VoterSpec::example());

        assert_eq!(voter.matricula, "M001");
        assert!(!voter.has_voted);
        assert_eq!(voter.voted_at, None);
    }

    #[test]
    fn vote_guard_only_matches_unvoted() {
        let guard = VoterCore::vote_guard("M001");

        assert_eq!(guard.get_str("matricula").unwrap(), "M001");
        assert_eq!(guard.get_bool("has_voted").unwrap(), false);
    }

    #[test]
    fn mark_voted_sets_flag_and_timestamp() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let update = VoterCore::mark_voted(at);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_bool("has_voted").unwrap(), true);
        assert_eq!(
            set.get_datetime("voted_at").unwrap(),
            &BsonDateTime::from_chrono(at)
        );
    }

    #[test]
    fn voter_survives_the_bson_round_trip() {
        let mut voter = VoterCore::new(VoterSpec::example());
        // BSON datetimes have millisecond precision; use a round value.
        voter.created_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        voter.has_voted = true;
        voter.voted_at = Some(Utc.timestamp_opt(1_700_000_100, 0).unwrap());

        let bson = to_bson(&voter).unwrap();
        let back: VoterCore = from_bson(bson).unwrap();

        assert_eq!(voter, back);
    }

    #[test]
    fn absent_voted_at_reads_as_none() {
        let mut voter = VoterCore::new(VoterSpec::example());
        voter.created_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let bson = to_bson(&voter).unwrap();
        if let Bson::Document(ref doc) = bson {
            assert!(!doc.contains_key("voted_at"));
        } else {
            panic!("voter should serialize to a document");
        }

        let back: VoterCore = from_bson(bson).unwrap();
        assert_eq!(back.voted_at, None);
    }
}
