use crate::model::VehicleClass;

/// Parsed command from one protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Park {
        plate: String,
        class: VehicleClass,
        /// 0 = no preference.
        zone: u32,
        /// 0 = no preference.
        area: u32,
    },
    Occupy {
        plate: String,
        class: VehicleClass,
    },
    Release {
        plate: String,
        class: VehicleClass,
    },
    Cancel {
        plate: String,
        class: VehicleClass,
    },
    Rollback {
        count: usize,
    },
    Status,
    History {
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    UnknownCommand(String),
    WrongArity(&'static str, usize, usize),
    InvalidArgument { name: &'static str, value: String },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::UnknownCommand(kw) => write!(f, "unknown command: {kw}"),
            CommandError::WrongArity(cmd, expected, got) => {
                write!(f, "{cmd}: expected {expected} arguments, got {got}")
            }
            CommandError::InvalidArgument { name, value } => {
                write!(f, "invalid {name}: {value:?}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// Decode `KEYWORD arg...`. Keywords are case-insensitive, tokens are
/// separated by ASCII whitespace.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_ascii_whitespace();
    let keyword = tokens.next().ok_or(CommandError::Empty)?;
    let args: Vec<&str> = tokens.collect();

    match keyword.to_ascii_uppercase().as_str() {
        "PARK" => {
            expect_arity("PARK", &args, 4)?;
            Ok(Command::Park {
                plate: args[0].to_string(),
                class: parse_class(args[1])?,
                zone: parse_u32("zone", args[2])?,
                area: parse_u32("area", args[3])?,
            })
        }
        "OCCUPY" => {
            let (plate, class) = parse_vehicle("OCCUPY", &args)?;
            Ok(Command::Occupy { plate, class })
        }
        "RELEASE" => {
            let (plate, class) = parse_vehicle("RELEASE", &args)?;
            Ok(Command::Release { plate, class })
        }
        "CANCEL" => {
            let (plate, class) = parse_vehicle("CANCEL", &args)?;
            Ok(Command::Cancel { plate, class })
        }
        "ROLLBACK" => {
            expect_arity("ROLLBACK", &args, 1)?;
            Ok(Command::Rollback {
                count: parse_positive("count", args[0])?,
            })
        }
        "STATUS" => {
            expect_arity("STATUS", &args, 0)?;
            Ok(Command::Status)
        }
        "HISTORY" => match args.as_slice() {
            [] => Ok(Command::History { limit: None }),
            [limit] => Ok(Command::History {
                limit: Some(parse_positive("limit", limit)?),
            }),
            _ => Err(CommandError::WrongArity("HISTORY", 1, args.len())),
        },
        _ => Err(CommandError::UnknownCommand(keyword.to_string())),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn expect_arity(cmd: &'static str, args: &[&str], n: usize) -> Result<(), CommandError> {
    if args.len() != n {
        return Err(CommandError::WrongArity(cmd, n, args.len()));
    }
    Ok(())
}

fn parse_vehicle(cmd: &'static str, args: &[&str]) -> Result<(String, VehicleClass), CommandError> {
    expect_arity(cmd, args, 2)?;
    Ok((args[0].to_string(), parse_class(args[1])?))
}

fn parse_class(s: &str) -> Result<VehicleClass, CommandError> {
    s.parse::<u8>()
        .ok()
        .and_then(VehicleClass::from_code)
        .ok_or_else(|| invalid("vehicle type", s))
}

fn parse_u32(name: &'static str, s: &str) -> Result<u32, CommandError> {
    s.parse::<u32>().map_err(|_| invalid(name, s))
}

fn parse_positive(name: &'static str, s: &str) -> Result<usize, CommandError> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(name, s)),
    }
}

fn invalid(name: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        name,
        value: value.to_string(),
    }
}
