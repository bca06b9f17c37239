use mongodb::{bson::doc, Client};
use rocket::{futures::TryStreamExt, http::ContentType, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        auth::{AdminAccess, AuthToken},
        candidate::{Candidate, CandidateCore, Position},
        mongodb::Coll,
        results::{tally, ElectionResults},
        vote::Vote,
        voter::Voter,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_results, export_results_csv, dashboard, reset_election]
}

/// Fetch the candidates and votes in scope and tally them: everything, or
/// one position's snapshot. Votes and candidates are filtered by the same
/// predicate so totals and percentages never mix positions.
async fn tally_snapshot(
    position: Option<Position>,
    candidates: &Coll<Candidate>,
    votes: &Coll<Vote>,
) -> Result<ElectionResults> {
    let filter = position.map(CandidateCore::by_position);
    let candidate_list: Vec<Candidate> = candidates
        .find(filter.clone(), None)
        .await?
        .try_collect()
        .await?;
    let vote_list: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
    Ok(tally(&candidate_list, &vote_list))
}

#[get("/results?<position>")]
async fn get_results(
    position: Option<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    Ok(Json(tally_snapshot(position, &candidates, &votes).await?))
}

#[get("/results/csv?<position>")]
async fn export_results_csv(
    position: Option<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<(ContentType, String)> {
    let results = tally_snapshot(position, &candidates, &votes).await?;
    Ok((ContentType::CSV, results.to_csv()))
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub voters: u64,
    pub candidates: u64,
    pub votes: u64,
}

#[get("/dashboard")]
async fn dashboard(
    _token: AuthToken<AdminAccess>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<DashboardCounts>> {
    Ok(Json(DashboardCounts {
        voters: voters.count_documents(None, None).await?,
        candidates: candidates.count_documents(None, None).await?,
        votes: votes.count_documents(None, None).await?,
    }))
}

/// Wipe every vote and reset every voter's voted flag.
///
/// Only reachable with an admin token; both the request and the outcome are
/// logged so the reset leaves an audit trail.
#[post("/election/reset")]
async fn reset_election(
    token: AuthToken<AdminAccess>,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<()> {
    warn!("Election reset requested by admin {}", token.id);

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let removed = votes
        .delete_many_with_session(doc! {}, None, &mut session)
        .await?;
    let cleared = voters
        .update_many_with_session(
            doc! {},
            doc! { "$set": { "has_voted": false }, "$unset": { "voted_at": "" } },
            None,
            &mut session,
        )
        .await?;

    session.commit_transaction().await?;

    warn!(
        "Election reset by admin {}: {} votes removed, {} voters cleared",
        token.id, removed.deleted_count, cleared.modified_count
    );
    Ok(())
}
