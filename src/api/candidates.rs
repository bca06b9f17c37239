use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        auth::{AdminAccess, AuthToken},
        candidate::{Candidate, CandidateCore, CandidateSpec, NewCandidate, Position},
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![add_candidate, remove_candidate, list_candidates]
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    _token: AuthToken<AdminAccess>,
    spec: Json<CandidateSpec>,
    new_candidates: Coll<NewCandidate>,
) -> Result<()> {
    spec.validate()?;

    let candidate = NewCandidate::from(spec.0);
    new_candidates.insert_one(&candidate, None).await?;

    info!(
        "Added candidate {} '{}' for {}",
        candidate.number, candidate.name, candidate.position
    );
    Ok(())
}

#[delete("/candidates/<id>")]
async fn remove_candidate(
    _token: AuthToken<AdminAccess>,
    id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    // Votes already cast for this candidate are left in place; the tally
    // renders them under a placeholder row.
    let result = candidates.delete_one(id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::NotFound(format!("Candidate {id}")));
    }

    info!("Removed candidate {id}");
    Ok(())
}

#[get("/candidates?<position>")]
async fn list_candidates(
    position: Option<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<Candidate>>> {
    let filter = position.map(CandidateCore::by_position);
    let list: Vec<Candidate> = candidates.find(filter, None).await?.try_collect().await?;
    Ok(Json(list))
}
