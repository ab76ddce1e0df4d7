//! Splitting a command line into words, redirections and a background marker.
use std::{fmt, iter::Peekable, str::CharIndices};

use crate::common::{MAX_ARGS, MAX_LINE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Quit,
    Jobs,
    Bg,
    Fg,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "quit" => Some(Self::Quit),
            "jobs" => Some(Self::Jobs),
            "bg" => Some(Self::Bg),
            "fg" => Some(Self::Fg),
            _ => None,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Builtin::Quit => "quit",
            Builtin::Jobs => "jobs",
            Builtin::Bg => "bg",
            Builtin::Fg => "fg",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParsedCommand {
    /// Never empty.
    pub argv: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub builtin: Option<Builtin>,
    pub background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseError {
    UnmatchedQuote(char),
    AmbiguousRedirection,
    MissingRedirectionTarget,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnmatchedQuote(quote) => write!(f, "Error: unmatched {quote}."),
            ParseError::AmbiguousRedirection => f.write_str("Error: Ambiguous I/O redirection"),
            ParseError::MissingRedirectionTarget => {
                f.write_str("Error: must provide file name for redirection")
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Argument,
    Input,
    Output,
}

/// Parse one command line. Returns `Ok(None)` when there is nothing to run.
pub(crate) fn parse_line(line: &str) -> Result<Option<ParsedCommand>, ParseError> {
    let line = truncate(line, MAX_LINE);

    let mut argv = Vec::new();
    let mut input = None;
    let mut output = None;
    let mut target = Target::Argument;

    let mut chars = line.char_indices().peekable();
    loop {
        while chars.next_if(|&(_, c)| is_blank(c)).is_some() {}
        let Some(&(start, c)) = chars.peek() else {
            break;
        };

        match c {
            '<' | '>' => {
                chars.next();
                let (wanted, taken) = if c == '<' {
                    (Target::Input, input.is_some())
                } else {
                    (Target::Output, output.is_some())
                };
                if taken || target != Target::Argument {
                    return Err(ParseError::AmbiguousRedirection);
                }
                target = wanted;
                continue;
            }
            _ => {}
        }

        let word = if c == '\'' || c == '"' {
            chars.next();
            quoted_word(line, &mut chars, c)?
        } else {
            bare_word(line, &mut chars, start)
        };

        match target {
            Target::Argument => argv.push(word.to_string()),
            Target::Input => input = Some(word.to_string()),
            Target::Output => output = Some(word.to_string()),
        }
        target = Target::Argument;

        if argv.len() >= MAX_ARGS - 1 {
            break;
        }
    }

    if target != Target::Argument {
        return Err(ParseError::MissingRedirectionTarget);
    }

    let builtin = argv.first().and_then(|name| Builtin::from_name(name));

    let background = argv.last().is_some_and(|word: &String| word.starts_with('&'));
    if background {
        argv.pop();
    }

    if argv.is_empty() {
        return Ok(None);
    }

    Ok(Some(ParsedCommand {
        argv,
        input,
        output,
        builtin,
        background,
    }))
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn quoted_word<'a>(
    line: &'a str,
    chars: &mut Peekable<CharIndices<'a>>,
    quote: char,
) -> Result<&'a str, ParseError> {
    let start = match chars.peek() {
        Some(&(index, _)) => index,
        None => return Err(ParseError::UnmatchedQuote(quote)),
    };
    for (index, c) in chars.by_ref() {
        if c == quote {
            return Ok(&line[start..index]);
        }
    }
    Err(ParseError::UnmatchedQuote(quote))
}

fn bare_word<'a>(line: &'a str, chars: &mut Peekable<CharIndices<'a>>, start: usize) -> &'a str {
    let mut end = line.len();
    while let Some(&(index, c)) = chars.peek() {
        if is_blank(c) {
            end = index;
            break;
        }
        chars.next();
    }
    &line[start..end]
}

fn truncate(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
