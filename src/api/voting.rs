use chrono::Utc;
use mongodb::Client;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        candidate::{Candidate, CandidateCore},
        mongodb::Coll,
        vote::{BallotSpec, NewVote, VoteChoice},
        voter::{Voter, VoterCore},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_ballot]
}

/// Record a single ballot.
///
/// The already-voted check and the vote write run inside one transaction,
/// with the check expressed as a conditional update on the voter document:
/// two concurrent ballots for the same matrícula cannot both match the
/// `has_voted == false` filter, so at most one vote lands. On any failure
/// the transaction aborts and nothing is recorded.
#[post("/votes", data = "<ballot>", format = "json")]
async fn cast_ballot(
    ballot: Json<BallotSpec>,
    voters: Coll<Voter>,
    votes: Coll<NewVote>,
    candidates: Coll<Candidate>,
    db_client: &State<Client>,
) -> Result<Json<NewVote>> {
    let ballot = ballot.0;

    // A ballot for a real candidate must reference one that exists and is
    // running for the position on the ballot. Blank and null sentinels
    // need no lookup.
    if let VoteChoice::Candidate(id) = ballot.choice {
        let mut filter = CandidateCore::by_position(ballot.position);
        filter.insert("_id", *id);
        candidates.find_one(filter, None).await?.ok_or_else(|| {
            Error::NotFound(format!(
                "No candidate {} for position {}",
                id, ballot.position
            ))
        })?;
    }

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // Mark the voter as having voted, but only if they haven't already.
    let marked = voters
        .update_one_with_session(
            VoterCore::vote_guard(&ballot.matricula),
            VoterCore::mark_voted(Utc::now()),
            None,
            &mut session,
        )
        .await?;
    if marked.modified_count == 0 {
        session.abort_transaction().await?;
        let registered = voters
            .find_one(VoterCore::by_matricula(&ballot.matricula), None)
            .await?
            .is_some();
        return Err(if registered {
            Error::AlreadyVoted(ballot.matricula)
        } else {
            Error::VoterNotRegistered(ballot.matricula)
        });
    }

    // Record the vote itself. A failed insert aborts the transaction,
    // rolling back the voted flag.
    let vote = NewVote::new(ballot.choice, ballot.matricula, ballot.position);
    votes
        .insert_one_with_session(&vote, None, &mut session)
        .await?;

    session.commit_transaction().await?;

    info!(
        "Vote recorded for position {} by matrícula {}",
        vote.position, vote.matricula
    );
    Ok(Json(vote))
}
