use crate::error::GameError;

/// One decoded inbound line. The first character is the command tag, the
/// remainder is the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Chat(String),
    NewGame(String),
    Click { col: i64, row: i64 },
    Nickname(String),
}

fn parse_coordinate(token: &str) -> Result<i64, GameError> {
    token
        .parse()
        .map_err(|_| GameError::BadArguments(format!("not a number: {token}")))
}

impl ClientCommand {
    pub fn parse(line: &str) -> Result<Self, GameError> {
        let mut chars = line.chars();
        let tag = chars
            .next()
            .ok_or_else(|| GameError::UnknownCommand(String::new()))?;
        let rest = chars.as_str();

        match tag {
            'M' => Ok(Self::Chat(rest.to_string())),
            'G' => Ok(Self::NewGame(rest.to_string())),
            'N' => Ok(Self::Nickname(rest.to_string())),
            'C' => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                if args.len() != 2 {
                    return Err(GameError::BadArguments(
                        "a click needs exactly 2 arguments: column and row".to_string(),
                    ));
                }
                Ok(Self::Click {
                    col: parse_coordinate(args[0])?,
                    row: parse_coordinate(args[1])?,
                })
            }
            _ => Err(GameError::UnknownCommand(line.to_string())),
        }
    }
}
