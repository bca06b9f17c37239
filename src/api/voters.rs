use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        auth::{AuthToken, MesarioAccess},
        mongodb::Coll,
        voter::{NewVoter, Voter, VoterCore, VoterSpec},
    },
};

pub fn routes() -> Vec<Route> {
    routes![register_voter, list_voters, get_voter]
}

#[post("/voters", data = "<spec>", format = "json")]
async fn register_voter(
    _token: AuthToken<MesarioAccess>,
    spec: Json<VoterSpec>,
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
) -> Result<()> {
    // Check matrícula uniqueness.
    let existing = voters
        .find_one(VoterCore::by_matricula(&spec.matricula), None)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicateRegistration(spec.matricula.clone()));
    }

    // The unique index on `matricula` closes the gap between the check and
    // the insert: a concurrent double registration surfaces as a duplicate
    // key error rather than a second voter.
    let voter = NewVoter::new(spec.0);
    new_voters.insert_one(&voter, None).await.map_err(|err| {
        if Error::is_duplicate_key(&err) {
            Error::DuplicateRegistration(voter.matricula.clone())
        } else {
            err.into()
        }
    })?;

    info!("Registered voter {} ({})", voter.matricula, voter.turma);
    Ok(())
}

#[get("/voters")]
async fn list_voters(
    _token: AuthToken<MesarioAccess>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<Voter>>> {
    let all: Vec<Voter> = voters.find(None, None).await?.try_collect().await?;
    Ok(Json(all))
}

#[get("/voters/<matricula>")]
async fn get_voter(
    _token: AuthToken<MesarioAccess>,
    matricula: String,
    voters: Coll<Voter>,
) -> Result<Json<Voter>> {
    let voter = voters
        .find_one(VoterCore::by_matricula(&matricula), None)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No voter with matrícula {matricula}")))?;
    Ok(Json(voter))
}
