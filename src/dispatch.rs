use serde::Serialize;

use crate::command::{parse_command, Command, CommandError};
use crate::engine::{Engine, EngineError, ZoneStatus};
use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Success,
    Error,
}

/// Reply to PARK / OCCUPY / RELEASE / CANCEL / ROLLBACK and to any
/// malformed line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub result: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_back: Option<usize>,
}

impl Outcome {
    fn success(message: String) -> Self {
        Self {
            result: ResultKind::Success,
            message: Some(message),
            code: None,
            zone: None,
            area: None,
            slot: None,
            duration_hours: None,
            rolled_back: None,
        }
    }

    fn at(mut self, slot: SlotRef) -> Self {
        self.zone = Some(slot.zone);
        self.area = Some(slot.area);
        self.slot = Some(slot.index);
        self
    }

    fn error(code: &'static str, message: String) -> Self {
        Self {
            result: ResultKind::Error,
            message: Some(message),
            code: Some(code),
            ..Self::success(String::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub zones: Vec<ZoneStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Outcome(Outcome),
    Status(StatusReport),
    History(HistoryReport),
}

impl Response {
    pub fn malformed(err: &CommandError) -> Self {
        Response::Outcome(Outcome::error("MalformedCommand", err.to_string()))
    }

    pub fn engine_error(err: &EngineError) -> Self {
        Response::Outcome(Outcome::error(err.code(), err.to_string()))
    }

    pub fn is_success(&self) -> bool {
        match self {
            Response::Outcome(o) => o.result == ResultKind::Success,
            Response::Status(_) | Response::History(_) => true,
        }
    }

    /// Stable error tag, if this is an error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Response::Outcome(o) => o.code,
            _ => None,
        }
    }

    /// Single-line JSON encoding.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "result": "error",
                "code": "Internal",
                "message": format!("encoding failed: {e}"),
            })
            .to_string()
        })
    }
}

/// Decodes commands, runs them against the engine it owns, and turns
/// every result into a `Response`. Never fails.
pub struct Dispatcher {
    engine: Engine,
}

impl Dispatcher {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn dispatch_line(&mut self, line: &str) -> Response {
        match parse_command(line) {
            Ok(cmd) => self.dispatch(cmd),
            Err(e) => Response::malformed(&e),
        }
    }

    pub fn dispatch(&mut self, cmd: Command) -> Response {
        let engine = &mut self.engine;
        let result = match cmd {
            Command::Park { plate, class, zone, area } => {
                engine.park(&plate, class, zone, area).map(|slot| {
                    Outcome::success(format!(
                        "{class} {plate} allocated slot {} in zone {} area {}",
                        slot.index, slot.zone, slot.area
                    ))
                    .at(slot)
                })
            }
            Command::Occupy { plate, class } => engine.occupy(&plate, class).map(|slot| {
                Outcome::success(format!(
                    "{class} {plate} occupied slot {} in zone {} area {}",
                    slot.index, slot.zone, slot.area
                ))
                .at(slot)
            }),
            Command::Release { plate, class } => engine.release(&plate, class).map(|entry| {
                let mut out = Outcome::success(format!(
                    "{class} {plate} released slot {} from zone {} area {}",
                    entry.slot, entry.zone, entry.area
                ))
                .at(SlotRef { zone: entry.zone, area: entry.area, index: entry.slot });
                out.duration_hours = Some(entry.duration_hours);
                out
            }),
            Command::Cancel { plate, class } => engine.cancel(&plate, class).map(|entry| {
                Outcome::success(format!(
                    "{class} {plate} cancelled reservation of slot {} in zone {} area {}",
                    entry.slot, entry.zone, entry.area
                ))
                .at(SlotRef { zone: entry.zone, area: entry.area, index: entry.slot })
            }),
            Command::Rollback { count } => engine.rollback(count).map(|undone| {
                let mut out = Outcome::success(format!("rolled back {} reservation(s)", undone.len()));
                out.rolled_back = Some(undone.len());
                out
            }),
            Command::Status => {
                return Response::Status(StatusReport {
                    status: "running",
                    zones: engine.status(),
                });
            }
            Command::History { limit } => {
                let limit = limit.map_or(engine.history_cap(), |l| l.min(engine.history_cap()));
                return Response::History(HistoryReport {
                    history: engine.history(Some(limit)),
                });
            }
        };

        match result {
            Ok(outcome) => Response::Outcome(outcome),
            Err(e) => Response::engine_error(&e),
        }
    }
}
