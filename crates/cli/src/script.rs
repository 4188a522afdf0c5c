//! JSON-lines scoring scripts.
//!
//! One command per line:
//!
//! ```text
//! {"op":"add","match":"final","runsScored":4,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
//! {"op":"edit","ball":1,"runsScored":1,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
//! {"op":"deleteBall","ball":1}
//! {"op":"deleteMatch","match":"final"}
//! ```
//!
//! `match` is a free-form label; the first `add` under a label starts a
//! match. `ball` is the 1-based position of the ball among the script's adds.
//! Blank lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{Context, anyhow, bail};
use serde::Deserialize;

use crease_core::{BallId, MatchId};
use crease_infra::{BallStore, MatchDetails, MatchStore, ScoringService};
use crease_scoring::BallDetails;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptCommand {
    Add {
        #[serde(rename = "match")]
        match_label: String,
        #[serde(flatten)]
        details: BallDetails,
    },
    Edit {
        ball: usize,
        #[serde(flatten)]
        details: BallDetails,
    },
    DeleteBall {
        ball: usize,
    },
    DeleteMatch {
        #[serde(rename = "match")]
        match_label: String,
    },
}

/// Parse one script line; `None` for blanks and comments.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let command = serde_json::from_str(line).context("malformed script command")?;
    Ok(Some(command))
}

pub struct ScriptRunner<M, B> {
    service: ScoringService<M, B>,
    matches: HashMap<String, MatchId>,
    balls: Vec<Option<BallId>>,
}

impl<M, B> ScriptRunner<M, B>
where
    M: MatchStore,
    B: BallStore,
{
    pub fn new(service: ScoringService<M, B>) -> Self {
        Self {
            service,
            matches: HashMap::new(),
            balls: Vec::new(),
        }
    }

    /// Run every command in `input`, stopping at the first failure.
    pub fn run(&mut self, input: impl BufRead) -> anyhow::Result<usize> {
        let mut executed = 0;
        for (idx, line) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.with_context(|| format!("reading line {line_no}"))?;
            let Some(command) = parse_line(&line).with_context(|| format!("line {line_no}"))? else {
                continue;
            };
            self.execute(command)
                .with_context(|| format!("line {line_no}"))?;
            executed += 1;
        }
        tracing::info!(commands = executed, "script finished");
        Ok(executed)
    }

    pub fn execute(&mut self, command: ScriptCommand) -> anyhow::Result<()> {
        match command {
            ScriptCommand::Add {
                match_label,
                details,
            } => {
                let known = self.matches.get(&match_label).copied();
                let (ball, aggregate) = self.service.add_ball(known, details)?;
                self.matches.insert(match_label, aggregate.id_typed());
                self.balls.push(Some(ball.id_typed()));
            }
            ScriptCommand::Edit { ball, details } => {
                let ball_id = self.ball_id(ball)?;
                self.service.edit_ball(ball_id, details)?;
            }
            ScriptCommand::DeleteBall { ball } => {
                let ball_id = self.ball_id(ball)?;
                self.service.delete_ball(ball_id)?;
                self.balls[ball - 1] = None;
            }
            ScriptCommand::DeleteMatch { match_label } => {
                let match_id = self
                    .matches
                    .remove(&match_label)
                    .ok_or_else(|| anyhow!("unknown match label {match_label:?}"))?;
                self.service.delete_match(match_id)?;
            }
        }
        Ok(())
    }

    pub fn details(&self) -> anyhow::Result<Vec<MatchDetails>> {
        Ok(self.service.all_matches()?)
    }

    fn ball_id(&self, position: usize) -> anyhow::Result<BallId> {
        if position == 0 || position > self.balls.len() {
            bail!("ball {position} does not exist ({} added so far)", self.balls.len());
        }
        self.balls[position - 1].ok_or_else(|| anyhow!("ball {position} was deleted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_infra::{InMemoryBallStore, InMemoryMatchStore, ScoringConfig, ServiceError};

    fn runner() -> ScriptRunner<InMemoryMatchStore, InMemoryBallStore> {
        ScriptRunner::new(ScoringService::new(
            InMemoryMatchStore::new(),
            InMemoryBallStore::new(),
            &ScoringConfig::default(),
        ))
    }

    #[test]
    fn parses_each_command_kind() {
        let add = parse_line(
            r#"{"op":"add","match":"m","runsScored":4,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}"#,
        )
        .unwrap();
        assert_eq!(
            add,
            Some(ScriptCommand::Add {
                match_label: "m".to_string(),
                details: BallDetails::new(4, "A", "B", "X", false),
            })
        );

        assert_eq!(
            parse_line(r#"{"op":"deleteBall","ball":2}"#).unwrap(),
            Some(ScriptCommand::DeleteBall { ball: 2 })
        );
        assert_eq!(
            parse_line(r#"{"op":"deleteMatch","match":"m"}"#).unwrap(),
            Some(ScriptCommand::DeleteMatch {
                match_label: "m".to_string()
            })
        );
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# warm-up").unwrap(), None);
        assert!(parse_line(r#"{"op":"add","match":"m","runsScored":-1}"#).is_err());
    }

    #[test]
    fn runs_a_script_end_to_end() {
        let script = r#"
# two balls, correct the first, drop the second
{"op":"add","match":"final","runsScored":4,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
{"op":"add","match":"final","runsScored":2,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
{"op":"edit","ball":1,"runsScored":1,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
{"op":"deleteBall","ball":2}
{"op":"add","match":"warmup","runsScored":6,"strikerName":"C","nonStrikerName":"D","bowlerName":"Y","isNoBall":true}
{"op":"deleteMatch","match":"warmup"}
"#;
        let mut runner = runner();
        assert_eq!(runner.run(script.as_bytes()).unwrap(), 6);

        let details = runner.details().unwrap();
        assert_eq!(details.len(), 1);
        let m = &details[0].aggregate;
        assert_eq!(m.team_runs(), 1);
        assert_eq!(m.current_over().to_string(), "0.1");
        assert_eq!(m.batsman("A").unwrap().strike_rate(), 100.0);
        assert_eq!(details[0].ball_by_ball_data.len(), 1);
    }

    #[test]
    fn reports_the_failing_line() {
        let script = r#"{"op":"add","match":"m","runsScored":1,"strikerName":"A","nonStrikerName":"B","bowlerName":"X","isNoBall":false}
{"op":"deleteBall","ball":1}
{"op":"deleteBall","ball":1}"#;
        let err = runner().run(script.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "line 3");
        assert_eq!(err.root_cause().to_string(), "ball 1 was deleted");
    }

    #[test]
    fn service_errors_pass_through() {
        let mut runner = runner();
        runner
            .execute(ScriptCommand::Add {
                match_label: "m".to_string(),
                details: BallDetails::new(1, "A", "B", "X", false),
            })
            .unwrap();
        runner
            .execute(ScriptCommand::DeleteMatch {
                match_label: "m".to_string(),
            })
            .unwrap();

        let err = runner.execute(ScriptCommand::DeleteBall { ball: 1 }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServiceError>(),
            Some(ServiceError::NotFound("ball"))
        ));
    }
}
