use anyhow::{Context, Result, bail};
use graphdesk_core::{EdgeId, ElementId, NodeId, Vec2};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move { node: NodeId, to: Vec2 },
    Hide(Vec<ElementId>),
    Show(Vec<ElementId>),
    ShowAll,
    Remove(Vec<ElementId>),
    AddNode {
        id: NodeId,
        name: String,
        position: Vec2,
        parent: Option<NodeId>,
    },
    Select(Vec<ElementId>),
    Undo,
    Redo,
    Describe(ElementId),
    /// Drag nodes by a pointer displacement in rendered pixels.
    Drag { nodes: Vec<NodeId>, pointer: Vec2 },
    Dump(Option<PathBuf>),
}

/// Parse a whole script. Blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<Vec<(usize, Command)>> {
    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if let Some(cmd) = parse_line(line).with_context(|| format!("line {}", line_no))? {
            commands.push((line_no, cmd));
        }
    }
    Ok(commands)
}

pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match verb {
        "move" => {
            expect_args(verb, &args, 3)?;
            Command::Move {
                node: parse_node(args[0])?,
                to: Vec2::new(parse_f32(args[1])?, parse_f32(args[2])?),
            }
        }
        "hide" => Command::Hide(parse_elements(verb, &args)?),
        "show" => Command::Show(parse_elements(verb, &args)?),
        "show-all" => Command::ShowAll,
        "remove" => Command::Remove(parse_elements(verb, &args)?),
        "add-node" => {
            if args.len() != 4 && args.len() != 5 {
                bail!("add-node expects <id> <name> <x> <y> [parent]");
            }
            Command::AddNode {
                id: parse_node(args[0])?,
                name: args[1].to_string(),
                position: Vec2::new(parse_f32(args[2])?, parse_f32(args[3])?),
                parent: args.get(4).map(|p| parse_node(p)).transpose()?,
            }
        }
        "select" => Command::Select(args.iter().map(|a| parse_element(a)).collect::<Result<_>>()?),
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "describe" => {
            expect_args(verb, &args, 1)?;
            Command::Describe(parse_element(args[0])?)
        }
        "drag" => {
            expect_args(verb, &args, 3)?;
            let nodes = args[0]
                .split(',')
                .map(parse_node)
                .collect::<Result<Vec<_>>>()?;
            Command::Drag {
                nodes,
                pointer: Vec2::new(parse_f32(args[1])?, parse_f32(args[2])?),
            }
        }
        "dump" => Command::Dump(args.first().map(PathBuf::from)),
        other => bail!("unknown command '{}'", other),
    };
    Ok(Some(cmd))
}

fn expect_args(verb: &str, args: &[&str], n: usize) -> Result<()> {
    if args.len() != n {
        bail!("{} expects {} arguments, got {}", verb, n, args.len());
    }
    Ok(())
}

fn parse_elements(verb: &str, args: &[&str]) -> Result<Vec<ElementId>> {
    if args.is_empty() {
        bail!("{} expects at least one element", verb);
    }
    args.iter().map(|a| parse_element(a)).collect()
}

/// `e<id>` is an edge; `n<id>` or a bare number is a node.
fn parse_element(token: &str) -> Result<ElementId> {
    if let Some(rest) = token.strip_prefix('e') {
        let id = rest
            .parse()
            .with_context(|| format!("invalid edge id '{}'", token))?;
        return Ok(ElementId::Edge(EdgeId(id)));
    }
    Ok(ElementId::Node(parse_node(token)?))
}

fn parse_node(token: &str) -> Result<NodeId> {
    let digits = token.strip_prefix('n').unwrap_or(token);
    let id = digits
        .parse()
        .with_context(|| format!("invalid node id '{}'", token))?;
    Ok(NodeId(id))
}

fn parse_f32(token: &str) -> Result<f32> {
    token
        .parse()
        .with_context(|| format!("invalid number '{}'", token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("move n3 10 -2.5").unwrap(),
            Some(Command::Move {
                node: NodeId(3),
                to: Vec2::new(10.0, -2.5)
            })
        );
        assert_eq!(
            parse_line("hide 2 e7").unwrap(),
            Some(Command::Hide(vec![
                ElementId::Node(NodeId(2)),
                ElementId::Edge(EdgeId(7))
            ]))
        );
        assert_eq!(
            parse_line("add-node 9 cache 1 2 4").unwrap(),
            Some(Command::AddNode {
                id: NodeId(9),
                name: "cache".to_string(),
                position: Vec2::new(1.0, 2.0),
                parent: Some(NodeId(4)),
            })
        );
        assert_eq!(
            parse_line("drag 1,2 5 0").unwrap(),
            Some(Command::Drag {
                nodes: vec![NodeId(1), NodeId(2)],
                pointer: Vec2::new(5.0, 0.0)
            })
        );
        assert_eq!(parse_line("select").unwrap(), Some(Command::Select(Vec::new())));
        assert_eq!(parse_line("dump").unwrap(), Some(Command::Dump(None)));
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let script = "# setup\n\nundo  # nothing yet\nshow-all\n";
        let commands = parse_script(script).unwrap();
        assert_eq!(commands, vec![(3, Command::Undo), (4, Command::ShowAll)]);
    }

    #[test]
    fn test_errors_carry_line_number() {
        let err = parse_script("undo\nmove 1 2\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2");
        assert!(format!("{:#}", err).contains("move expects 3 arguments"));

        assert!(parse_line("teleport 1").is_err());
        assert!(parse_line("hide").is_err());
        assert!(parse_line("describe ex").is_err());
    }
}
