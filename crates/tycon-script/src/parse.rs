//! Parsing assembled script text back into structure
//!
//! The mirror image of emission, used by tooling and the test harness to
//! inspect and execute compiled programs. Parsing is strict about block
//! structure (`{`/`} else {`/`}`, `state`/`ends`) and lenient about
//! mnemonics it does not know, which it keeps as generic operation lines.

use crate::ops::{self, Cond};
use crate::writer::Operand;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors raised while parsing script text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {0}: malformed line `{1}`")]
    Malformed(usize, String),

    #[error("line {0}: unexpected end of block")]
    UnexpectedTerminator(usize),

    #[error("unexpected end of input inside a block")]
    UnexpectedEnd,

    #[error("line {0}: `{1}` is not valid at the top level")]
    BadTopLevel(usize, String),
}

/// One executable instruction inside a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// A generic operation line: mnemonic plus raw operand tokens.
    Op(Vec<String>),

    /// A conditional block with an optional else branch.
    Cond {
        cond: Cond,
        a: Operand,
        b: Operand,
        then: Vec<Instr>,
        els: Vec<Instr>,
    },

    /// `whilen A B { ... }` - repeats while A != B.
    While {
        a: Operand,
        b: Operand,
        body: Vec<Instr>,
    },
}

/// One `action`/`move`/`ai` table line.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDef {
    pub kind: String,
    pub name: String,
    pub args: Vec<String>,
}

/// A parsed program.
#[derive(Debug, Default)]
pub struct Program {
    pub stack_size: u32,
    pub registers: Vec<(String, i64)>,
    pub arrays: Vec<(String, u32)>,
    pub labels: Vec<LabelDef>,
    pub quotes: Vec<(u32, String)>,
    pub states: FxHashMap<String, Vec<Instr>>,
    pub actors: Vec<(i64, i64, Vec<Instr>)>,
    pub events: Vec<(String, Vec<Instr>)>,
    pub new_game: Option<Vec<Instr>>,
    pub on_spawn: Option<Vec<Instr>>,
}

impl Program {
    pub fn state(&self, name: &str) -> Option<&[Instr]> {
        self.states.get(name).map(|b| b.as_slice())
    }
}

/// Parse a full program from assembled text.
pub fn parse(text: &str) -> Result<Program, ParseError> {
    let mut lines = LineReader::new(text);
    let mut program = Program::default();

    while let Some((line_no, line)) = lines.next_line() {
        let mut tokens = line.split_whitespace();
        let head = match tokens.next() {
            Some(head) => head,
            None => continue,
        };
        match head {
            ops::STACKSIZE => {
                program.stack_size = parse_num(&line, line_no, tokens.next())? as u32;
            }
            ops::VAR => {
                let name = required(&line, line_no, tokens.next())?;
                let init = parse_num(&line, line_no, tokens.next())?;
                program.registers.push((name.to_string(), init));
            }
            ops::ARRAY => {
                let name = required(&line, line_no, tokens.next())?;
                let size = parse_num(&line, line_no, tokens.next())? as u32;
                program.arrays.push((name.to_string(), size));
            }
            ops::ACTION | ops::MOVE | ops::AI => {
                let name = required(&line, line_no, tokens.next())?;
                program.labels.push(LabelDef {
                    kind: head.to_string(),
                    name: name.to_string(),
                    args: tokens.map(str::to_string).collect(),
                });
            }
            ops::DEFINEQUOTE => {
                // quote text may contain spaces
                let mut parts = line.splitn(3, ' ');
                parts.next();
                let idx = parse_num(&line, line_no, parts.next())? as u32;
                let text = parts.next().unwrap_or("").to_string();
                program.quotes.push((idx, text));
            }
            ops::STATE => {
                let name = required(&line, line_no, tokens.next())?.to_string();
                let body = parse_body(&mut lines, Terminator::Ends)?;
                program.states.insert(name, body);
            }
            ops::ACTOR => {
                let picnum = parse_num(&line, line_no, tokens.next())?;
                let strength = parse_num(&line, line_no, tokens.next())?;
                let body = parse_body(&mut lines, Terminator::Ends)?;
                program.actors.push((picnum, strength, body));
            }
            ops::EVENT => {
                let name = required(&line, line_no, tokens.next())?.to_string();
                let body = parse_body(&mut lines, Terminator::Ends)?;
                program.events.push((name, body));
            }
            ops::ONNEWGAME => {
                program.new_game = Some(parse_body(&mut lines, Terminator::Ends)?);
            }
            ops::ONSPAWN => {
                program.on_spawn = Some(parse_body(&mut lines, Terminator::Ends)?);
            }
            _ => return Err(ParseError::BadTopLevel(line_no, line.to_string())),
        }
    }

    Ok(program)
}

enum Terminator {
    Ends,
    Brace,
}

enum BodyEnd {
    Closed,
    Else,
}

fn parse_body(lines: &mut LineReader<'_>, term: Terminator) -> Result<Vec<Instr>, ParseError> {
    let (body, end) = parse_instrs(lines, term)?;
    match end {
        BodyEnd::Closed => Ok(body),
        BodyEnd::Else => Err(ParseError::UnexpectedEnd),
    }
}

fn parse_instrs(
    lines: &mut LineReader<'_>,
    term: Terminator,
) -> Result<(Vec<Instr>, BodyEnd), ParseError> {
    let mut out = Vec::new();
    loop {
        let (line_no, line) = lines.next_line().ok_or(ParseError::UnexpectedEnd)?;
        match (&term, line.as_str()) {
            (Terminator::Ends, ops::ENDS) => return Ok((out, BodyEnd::Closed)),
            (Terminator::Brace, "}") => return Ok((out, BodyEnd::Closed)),
            (Terminator::Brace, "} else {") => return Ok((out, BodyEnd::Else)),
            (Terminator::Ends, "}") | (Terminator::Ends, "} else {") => {
                return Err(ParseError::UnexpectedTerminator(line_no))
            }
            (Terminator::Brace, ops::ENDS) => {
                return Err(ParseError::UnexpectedTerminator(line_no))
            }
            _ => {}
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let head = tokens[0];

        if let Some(cond) = Cond::from_mnemonic(head) {
            if tokens.len() != 4 || tokens[3] != "{" {
                return Err(ParseError::Malformed(line_no, line));
            }
            let a = operand(tokens[1]);
            let b = operand(tokens[2]);
            let (then, end) = parse_instrs(lines, Terminator::Brace)?;
            let els = match end {
                BodyEnd::Closed => Vec::new(),
                BodyEnd::Else => parse_body_brace(lines)?,
            };
            out.push(Instr::Cond { cond, a, b, then, els });
        } else if head == ops::WHILEN {
            if tokens.len() != 4 || tokens[3] != "{" {
                return Err(ParseError::Malformed(line_no, line));
            }
            let a = operand(tokens[1]);
            let b = operand(tokens[2]);
            let body = parse_body_brace(lines)?;
            out.push(Instr::While { a, b, body });
        } else {
            out.push(Instr::Op(tokens.iter().map(|t| t.to_string()).collect()));
        }
    }
}

fn parse_body_brace(lines: &mut LineReader<'_>) -> Result<Vec<Instr>, ParseError> {
    let (body, end) = parse_instrs(lines, Terminator::Brace)?;
    match end {
        BodyEnd::Closed => Ok(body),
        BodyEnd::Else => Err(ParseError::UnexpectedEnd),
    }
}

fn operand(token: &str) -> Operand {
    match token.parse::<i64>() {
        Ok(value) => Operand::Imm(value),
        Err(_) => Operand::Reg(token.to_string()),
    }
}

fn required<'a>(line: &str, line_no: usize, token: Option<&'a str>) -> Result<&'a str, ParseError> {
    token.ok_or_else(|| ParseError::Malformed(line_no, line.to_string()))
}

fn parse_num(line: &str, line_no: usize, token: Option<&str>) -> Result<i64, ParseError> {
    required(line, line_no, token)?
        .parse::<i64>()
        .map_err(|_| ParseError::Malformed(line_no, line.to_string()))
}

/// Line iterator that strips comments and blank lines and tracks numbers.
struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self { lines: text.lines(), line_no: 0 }
    }

    fn next_line(&mut self) -> Option<(usize, String)> {
        loop {
            let raw = self.lines.next()?;
            self.line_no += 1;
            let trimmed = match raw.find("//") {
                Some(pos) => raw[..pos].trim(),
                None => raw.trim(),
            };
            if !trimmed.is_empty() {
                return Some((self.line_no, trimmed.to_string()));
            }
        }
    }
}
