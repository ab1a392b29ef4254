//! Assembly source line parser
//!
//! Lines go through the same preparation in both passes:
//! comment stripping, character literal replacement, label/EQU splitting and
//! statement classification. Quote handling treats the apostrophe in `af'` as
//! part of the register name, not as the start of a literal.

use crate::assembler::segments::Segment;
use crate::assembler::ErrorKind;

/// A line with its label or EQU definition separated from the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLine<'s> {
    /// `name` from `name:` or `name equ expr`
    pub label: Option<&'s str>,
    /// Expression text of an EQU definition
    pub equ: Option<&'s str>,
    /// Remaining statement text, trimmed
    pub body: &'s str,
}

/// A classified statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'s> {
    Empty,
    Segment(Segment),
    /// `org`/`.org` with its address expression
    Org(&'s str),
    /// `db`/`.db`/`defb`/`.text` operands
    Bytes(Vec<&'s str>),
    /// `dw`/`.dw`/`defw` operands
    Words(Vec<&'s str>),
    /// `ds`/`.ds`/`defs` size expression
    Space(&'s str),
    /// `end`/`.end`
    End,
    Instruction {
        mnemonic: &'s str,
        operands: Vec<&'s str>,
    },
}

fn is_af_prime(prev: &[char], ch: char) -> bool {
    ch == '\''
        && prev.len() >= 2
        && prev[prev.len() - 2].eq_ignore_ascii_case(&'a')
        && prev[prev.len() - 1].eq_ignore_ascii_case(&'f')
}

/// Characters of `text` (with byte offsets) that lie outside quoted literals.
/// Quote characters themselves are not returned.
fn unquoted_chars(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::with_capacity(text.len());
    let mut seen: Vec<char> = Vec::with_capacity(text.len());
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if (ch == '"' || ch == '\'') && !is_af_prime(&seen, ch) => quote = Some(ch),
            None => out.push((i, ch)),
        }
        seen.push(ch);
    }
    out
}

/// Removes a `;` comment. A `;` inside a quoted literal is kept.
pub fn strip_comment(line: &str) -> &str {
    match unquoted_chars(line).into_iter().find(|&(_, ch)| ch == ';') {
        Some((i, _)) => &line[..i],
        None => line,
    }
}

/// Replaces single-character literals such as `'A'` with hex (`041h`).
/// Longer quoted strings are left untouched for `db`.
pub fn replace_char_literals(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                out.push(ch);
            }
            None if ch == '\'' && !is_af_prime(&chars[..i], ch) => {
                match (chars.get(i + 1), chars.get(i + 2)) {
                    (Some(&c), Some('\'')) if c.is_ascii() && c != '\'' => {
                        out.push_str(&format!("0{:02X}h", c as u8));
                        i += 3;
                        continue;
                    }
                    _ => {
                        quote = Some(ch);
                        out.push(ch);
                    }
                }
            }
            None if ch == '"' => {
                quote = Some(ch);
                out.push(ch);
            }
            None => out.push(ch),
        }
        i += 1;
    }
    out
}

/// Separates a `name:` label or a `name equ expr` definition from the
/// statement.
pub fn split_line(text: &str) -> Result<SplitLine<'_>, ErrorKind> {
    let colon = unquoted_chars(text)
        .into_iter()
        .find(|&(_, ch)| ch == ':')
        .map(|(i, _)| i);

    let (label, rest) = match colon {
        Some(i) => {
            let raw = &text[..i];
            let name = raw.trim();
            if name.is_empty() {
                return Err(ErrorKind::EmptyLabel);
            }
            if name.contains(char::is_whitespace) {
                return Err(ErrorKind::InvalidLabel(name.to_string()));
            }
            (Some(name), text[i + 1..].trim())
        }
        None => (None, text.trim()),
    };

    let (first, after_first) = split_word(rest);
    if label.is_some() && first.eq_ignore_ascii_case("equ") {
        return Ok(SplitLine {
            label,
            equ: Some(after_first),
            body: "",
        });
    }
    if label.is_none() {
        let (second, after_second) = split_word(after_first);
        if second.eq_ignore_ascii_case("equ") && !first.is_empty() {
            return Ok(SplitLine {
                label: Some(first),
                equ: Some(after_second),
                body: "",
            });
        }
    }

    Ok(SplitLine {
        label,
        equ: None,
        body: rest,
    })
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

/// Splits operand text on top-level commas (outside quotes and parentheses).
pub fn split_operands(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in unquoted_chars(text) {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Contents of a quoted string operand (`"text"` or `'text'`).
pub fn string_literal(operand: &str) -> Option<&str> {
    let operand = operand.trim();
    let quote = operand.chars().next().filter(|&c| c == '"' || c == '\'')?;
    if operand.len() >= 2 && operand.ends_with(quote) {
        Some(&operand[1..operand.len() - 1])
    } else {
        None
    }
}

fn single_operand<'s>(directive: &str, rest: &'s str) -> Result<&'s str, ErrorKind> {
    match split_operands(rest).as_slice() {
        [one] if !one.is_empty() => Ok(*one),
        _ => Err(ErrorKind::Directive(format!(
            "{} expects exactly one operand",
            directive
        ))),
    }
}

fn operand_list<'s>(directive: &str, rest: &'s str) -> Result<Vec<&'s str>, ErrorKind> {
    let ops = split_operands(rest);
    if ops.is_empty() || ops.iter().any(|op| op.is_empty()) {
        Err(ErrorKind::Directive(format!("{} expects operands", directive)))
    } else {
        Ok(ops)
    }
}

/// Classifies a label-free statement.
pub fn parse_statement(body: &str) -> Result<Statement<'_>, ErrorKind> {
    let (word, rest) = split_word(body);
    if word.is_empty() {
        return Ok(Statement::Empty);
    }
    let lower = word.to_ascii_lowercase();

    if let Some(segment) = Segment::from_directive(&lower) {
        if !rest.is_empty() {
            return Err(ErrorKind::Directive(format!("{} takes no operands", lower)));
        }
        return Ok(Statement::Segment(segment));
    }

    match lower.as_str() {
        "org" | ".org" => Ok(Statement::Org(single_operand(&lower, rest)?)),
        "db" | ".db" | "defb" | ".text" => Ok(Statement::Bytes(operand_list(&lower, rest)?)),
        "dw" | ".dw" | "defw" => Ok(Statement::Words(operand_list(&lower, rest)?)),
        "ds" | ".ds" | "defs" => Ok(Statement::Space(single_operand(&lower, rest)?)),
        "end" | ".end" => Ok(Statement::End),
        "equ" => Err(ErrorKind::Directive("equ needs a name".to_string())),
        _ => {
            let operands = split_operands(rest);
            if operands.iter().any(|op| op.is_empty()) {
                return Err(ErrorKind::Syntax(format!("empty operand in '{}'", body)));
            }
            Ok(Statement::Instruction {
                mnemonic: word,
                operands,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("ld a,5 ; load"), "ld a,5 ");
        assert_eq!(strip_comment("db 'a;b' ; text"), "db 'a;b' ");
        assert_eq!(strip_comment("ex af,af' ; swap"), "ex af,af' ");
        assert_eq!(strip_comment("nop"), "nop");
    }

    #[test]
    fn test_replace_char_literals() {
        assert_eq!(replace_char_literals("cp ','"), "cp 02Ch");
        assert_eq!(replace_char_literals("ld a,'A'+1"), "ld a,041h+1");
        assert_eq!(replace_char_literals("db 'hi','!'"), "db 'hi',021h");
        assert_eq!(replace_char_literals("ex af,af'"), "ex af,af'");
    }

    #[test]
    fn test_split_line_labels() {
        let line = split_line("loop: djnz loop").unwrap();
        assert_eq!(line.label, Some("loop"));
        assert_eq!(line.body, "djnz loop");

        let line = split_line("  nop").unwrap();
        assert_eq!(line.label, None);
        assert_eq!(line.body, "nop");

        assert_eq!(split_line(": nop"), Err(ErrorKind::EmptyLabel));
        assert_eq!(
            split_line("my label: nop"),
            Err(ErrorKind::InvalidLabel("my label".to_string()))
        );
    }

    #[test]
    fn test_split_line_equ() {
        let line = split_line("count EQU 10").unwrap();
        assert_eq!(line.label, Some("count"));
        assert_eq!(line.equ, Some("10"));

        let line = split_line("port: equ 80h").unwrap();
        assert_eq!(line.label, Some("port"));
        assert_eq!(line.equ, Some("80h"));
    }

    #[test]
    fn test_split_operands() {
        assert_eq!(split_operands("a, (ix+2)"), vec!["a", "(ix+2)"]);
        assert_eq!(split_operands("'a,b', 3"), vec!["'a,b'", "3"]);
        assert_eq!(split_operands("af,af'"), vec!["af", "af'"]);
        assert_eq!(split_operands("low(x), (1,2)"), vec!["low(x)", "(1,2)"]);
        assert!(split_operands("  ").is_empty());
    }

    #[test]
    fn test_parse_statement() {
        assert_eq!(parse_statement("").unwrap(), Statement::Empty);
        assert_eq!(
            parse_statement("DSEG").unwrap(),
            Statement::Segment(Segment::Data)
        );
        assert_eq!(parse_statement(".org 100h").unwrap(), Statement::Org("100h"));
        assert_eq!(
            parse_statement("defb 1, 2").unwrap(),
            Statement::Bytes(vec!["1", "2"])
        );
        assert_eq!(parse_statement("ds 10").unwrap(), Statement::Space("10"));
        assert_eq!(parse_statement(".end").unwrap(), Statement::End);
        assert_eq!(
            parse_statement("ld a , b").unwrap(),
            Statement::Instruction {
                mnemonic: "ld",
                operands: vec!["a", "b"]
            }
        );
        assert!(parse_statement("org").is_err());
        assert!(parse_statement("cseg 5").is_err());
        assert!(parse_statement("ld a,,b").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"hello\""), Some("hello"));
        assert_eq!(string_literal("'ab'"), Some("ab"));
        assert_eq!(string_literal("041h"), None);
        assert_eq!(string_literal("'"), None);
    }
}
