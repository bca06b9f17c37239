use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    candidate::{Candidate, Position},
    vote::{Vote, BLANK_CHOICE, NULL_CHOICE},
};

/// Display names for the sentinel rows and for orphaned references.
pub const BLANK_NAME: &str = "Voto em Branco";
pub const NULL_NAME: &str = "Voto Nulo";
pub const UNKNOWN_NAME: &str = "Candidato desconhecido";

/// One line of the published results: a candidate (or sentinel) and its
/// vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub votes: u64,
    /// Share of the tally snapshot, in percent.
    pub percent: f64,
}

impl ResultRow {
    fn for_candidate(candidate: &Candidate) -> Self {
        Self {
            number: Some(candidate.number.clone()),
            name: candidate.name.clone(),
            party: Some(candidate.party.clone()),
            position: Some(candidate.position),
            votes: 0,
            percent: 0.0,
        }
    }

    fn sentinel(name: &str) -> Self {
        Self {
            number: None,
            name: name.to_string(),
            party: None,
            position: None,
            votes: 0,
            percent: 0.0,
        }
    }

    /// Row for a vote whose candidate has since been deleted. The vote
    /// still counts; only the display attributes are gone.
    fn orphan(position: Position) -> Self {
        Self {
            number: None,
            name: UNKNOWN_NAME.to_string(),
            party: None,
            position: Some(position),
            votes: 0,
            percent: 0.0,
        }
    }
}

/// Election results: a map from candidate id (or sentinel) to its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionResults(pub HashMap<String, ResultRow>);

impl ElectionResults {
    /// Total votes across the snapshot. By construction this equals the
    /// number of Vote records that were tallied.
    pub fn total_votes(&self) -> u64 {
        self.0.values().map(|row| row.votes).sum()
    }

    /// Rows sorted by vote count, descending; key order breaks ties so the
    /// output is deterministic.
    pub fn sorted(&self) -> Vec<(&String, &ResultRow)> {
        let mut rows: Vec<_> = self.0.iter().collect();
        rows.sort_by(|a, b| b.1.votes.cmp(&a.1.votes).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Render the rows as the CSV the admin panel offers for download.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Cargo,Número,Nome,Partido,Votos\n");
        for (key, row) in self.sorted() {
            let position = row
                .position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let number = row.number.clone().unwrap_or_else(|| {
                match key.as_str() {
                    BLANK_CHOICE => "BR",
                    NULL_CHOICE => "NL",
                    _ => "N/A",
                }
                .to_string()
            });
            let party = row.party.clone().unwrap_or_else(|| "N/A".to_string());
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_field(&position),
                csv_field(&number),
                csv_field(&row.name),
                csv_field(&party),
                row.votes,
            ));
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Count every vote in the snapshot against the candidate roll.
///
/// Each candidate gets a row even with zero votes, as do the two sentinels.
/// Votes referencing a candidate absent from the roll keep their own row
/// under the orphaned id, so row counts always sum to the vote count.
pub fn tally(candidates: &[Candidate], votes: &[Vote]) -> ElectionResults {
    let mut rows = HashMap::with_capacity(candidates.len() + 2);
    for candidate in candidates {
        rows.insert(candidate.id.to_string(), ResultRow::for_candidate(candidate));
    }
    rows.insert(BLANK_CHOICE.to_string(), ResultRow::sentinel(BLANK_NAME));
    rows.insert(NULL_CHOICE.to_string(), ResultRow::sentinel(NULL_NAME));

    for vote in votes {
        let row = rows
            .entry(vote.choice.key())
            .or_insert_with(|| ResultRow::orphan(vote.position));
        row.votes += 1;
    }

    let total: u64 = rows.values().map(|row| row.votes).sum();
    if total > 0 {
        for row in rows.values_mut() {
            row.percent = row.votes as f64 / total as f64 * 100.0;
        }
    }

    ElectionResults(rows)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::{
        candidate::CandidateCore,
        mongodb::Id,
        vote::{VoteChoice, VoteCore},
    };

    fn candidate(number: &str, name: &str, position: Position) -> Candidate {
        Candidate {
            id: Id::new(),
            candidate: CandidateCore {
                number: number.to_string(),
                name: name.to_string(),
                party: "Chapa Azul".to_string(),
                position,
            },
        }
    }

    fn vote(choice: VoteChoice, matricula: &str, position: Position) -> Vote {
        Vote {
            id: Id::new(),
            vote: VoteCore {
                choice,
                matricula: matricula.to_string(),
                position,
                cast_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            },
        }
    }

    #[test]
    fn single_vote_lands_on_its_candidate() {
        let ana = candidate("13", "Ana", Position::Presidente);
        let ana_key = ana.id.to_string();
        let votes = vec![vote(
            VoteChoice::Candidate(ana.id),
            "M001",
            Position::Presidente,
        )];

        let results = tally(&[ana], &votes);

        assert_eq!(results.0.len(), 3);
        let row = &results.0[&ana_key];
        assert_eq!(row.number.as_deref(), Some("13"));
        assert_eq!(row.name, "Ana");
        assert_eq!(row.votes, 1);
        assert_eq!(row.percent, 100.0);
        assert_eq!(results.0[BLANK_CHOICE].votes, 0);
        assert_eq!(results.0[NULL_CHOICE].votes, 0);
    }

    #[test]
    fn blank_vote_moves_only_the_blank_row() {
        let ana = candidate("13", "Ana", Position::Presidente);
        let bia = candidate("22", "Bianca", Position::Presidente);
        let ana_key = ana.id.to_string();
        let votes = vec![vote(VoteChoice::Blank, "M001", Position::Presidente)];

        let results = tally(&[ana, bia], &votes);

        assert_eq!(results.0[BLANK_CHOICE].votes, 1);
        assert_eq!(results.0[BLANK_CHOICE].name, BLANK_NAME);
        assert_eq!(results.0[NULL_CHOICE].votes, 0);
        assert_eq!(results.0[&ana_key].votes, 0);
        assert_eq!(results.total_votes(), 1);
    }

    #[test]
    fn orphaned_reference_gets_a_placeholder_row() {
        let ghost = Id::new();
        let votes = vec![
            vote(VoteChoice::Candidate(ghost), "M001", Position::Senador),
            vote(VoteChoice::Candidate(ghost), "M002", Position::Senador),
        ];

        let results = tally(&[], &votes);

        let row = &results.0[&ghost.to_string()];
        assert_eq!(row.name, UNKNOWN_NAME);
        assert_eq!(row.number, None);
        assert_eq!(row.position, Some(Position::Senador));
        assert_eq!(row.votes, 2);
        assert_eq!(results.total_votes(), 2);
    }

    #[test]
    fn row_counts_sum_to_the_vote_count() {
        let ana = candidate("13", "Ana", Position::Presidente);
        let bia = candidate("22", "Bianca", Position::Presidente);
        let votes = vec![
            vote(VoteChoice::Candidate(ana.id), "M001", Position::Presidente),
            vote(VoteChoice::Candidate(ana.id), "M002", Position::Presidente),
            vote(VoteChoice::Candidate(bia.id), "M003", Position::Presidente),
            vote(VoteChoice::Blank, "M004", Position::Presidente),
            vote(VoteChoice::Null, "M005", Position::Presidente),
        ];

        let results = tally(&[ana, bia], &votes);

        assert_eq!(results.total_votes(), votes.len() as u64);
        let percent_sum: f64 = results.0.values().map(|row| row.percent).sum();
        assert!((percent_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_tally_still_lists_every_row() {
        let ana = candidate("13", "Ana", Position::Presidente);
        let ana_key = ana.id.to_string();

        let results = tally(&[ana], &[]);

        assert_eq!(results.0.len(), 3);
        assert_eq!(results.0[&ana_key].votes, 0);
        assert_eq!(results.0[&ana_key].percent, 0.0);
        assert_eq!(results.total_votes(), 0);
    }

    #[test]
    fn csv_lists_rows_by_votes_descending() {
        let ana = candidate("13", "Ana", Position::Presidente);
        let bia = candidate("22", "Bianca", Position::Presidente);
        let votes = vec![
            vote(VoteChoice::Candidate(bia.id), "M001", Position::Presidente),
            vote(VoteChoice::Candidate(bia.id), "M002", Position::Presidente),
            vote(VoteChoice::Candidate(ana.id), "M003", Position::Presidente),
            vote(VoteChoice::Blank, "M004", Position::Presidente),
        ];

        let csv = tally(&[ana, bia], &votes).to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Cargo,Número,Nome,Partido,Votos");
        assert_eq!(lines[1], "Presidente,22,Bianca,Chapa Azul,2");
        assert!(lines.contains(&"Presidente,13,Ana,Chapa Azul,1"));
        // Sentinels carry their urna codes.
        assert!(lines.contains(&"N/A,BR,Voto em Branco,N/A,1"));
        assert!(lines.contains(&"N/A,NL,Voto Nulo,N/A,0"));
        // Zero-vote rows come last.
        assert_eq!(lines[4], "N/A,NL,Voto Nulo,N/A,0");
    }

    #[test]
    fn csv_quotes_fields_containing_commas() {
        let mut silva = candidate("77", "Silva, João", Position::Vereador);
        silva.candidate.party = "Chapa \"Nova\"".to_string();
        let votes = vec![vote(
            VoteChoice::Candidate(silva.id),
            "M001",
            Position::Vereador,
        )];

        let csv = tally(&[silva], &votes).to_csv();

        assert!(csv.contains("\"Silva, João\""));
        assert!(csv.contains("\"Chapa \"\"Nova\"\"\""));
    }
}
