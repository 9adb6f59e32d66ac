//! Turns one raw input line into a structured [`Line`].
//!
//! Blank lines and ordinary `//` comments are dropped silently; a
//! `// Test` marker is recognized but left for the driver loop to act on
//! (it resets the manager and echoes itself — driver concerns, not
//! parsing concerns). Everything else must be a recognized operation.

use repcrec_concurrency::Operation;
use repcrec_core::{DispatchError, TransactionId, VarId};

/// The classification of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing to do: empty, whitespace-only, or an ordinary comment.
    Blank,
    /// A `// Test <n>` marker.
    TestMarker,
    /// A recognized operation, ready to dispatch.
    Operation(Operation),
}

/// Classify and, for operations, fully parse one raw input line.
pub fn classify(raw_line: &str) -> Result<Line, DispatchError> {
    let trimmed = raw_line.trim();
    if trimmed.is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(comment) = trimmed.strip_prefix("//") {
        return Ok(if comment.trim_start().starts_with("Test") {
            Line::TestMarker
        } else {
            Line::Blank
        });
    }
    parse_operation(trimmed).map(Line::Operation)
}

fn parse_operation(text: &str) -> Result<Operation, DispatchError> {
    let open = text
        .find('(')
        .ok_or_else(|| DispatchError::UnknownOperation(text.to_string()))?;
    if !text.ends_with(')') {
        return Err(malformed(&text[..open], "missing closing parenthesis"));
    }

    let keyword = text[..open].trim();
    let args_str = text[open + 1..text.len() - 1].trim();
    let args: Vec<&str> = if args_str.is_empty() {
        Vec::new()
    } else {
        args_str.split(',').map(str::trim).collect()
    };

    match keyword {
        "begin" => Ok(Operation::Begin(one_tid(keyword, &args)?)),
        "beginRO" => Ok(Operation::BeginReadOnly(one_tid(keyword, &args)?)),
        "end" => Ok(Operation::End(one_tid(keyword, &args)?)),
        "R" => {
            let (tid, var) = two_args(keyword, &args)?;
            Ok(Operation::Read(parse_tid(keyword, tid)?, parse_var(keyword, var)?))
        }
        "W" => {
            let (tid, var, value) = three_args(keyword, &args)?;
            Ok(Operation::Write(
                parse_tid(keyword, tid)?,
                parse_var(keyword, var)?,
                parse_int(keyword, value)?,
            ))
        }
        "fail" => {
            let site = one_arg(keyword, &args)?;
            Ok(Operation::Fail(parse_site_number(keyword, site)?))
        }
        "recover" => {
            let site = one_arg(keyword, &args)?;
            Ok(Operation::Recover(parse_site_number(keyword, site)?))
        }
        "dump" => Ok(Operation::Dump),
        other => Err(DispatchError::UnknownOperation(other.to_string())),
    }
}

fn malformed(op: &str, detail: impl Into<String>) -> DispatchError {
    DispatchError::MalformedArguments {
        op: op.to_string(),
        detail: detail.into(),
    }
}

fn one_arg<'a>(op: &str, args: &[&'a str]) -> Result<&'a str, DispatchError> {
    match args {
        [a] => Ok(a),
        _ => Err(malformed(op, format!("expected 1 argument, found {}", args.len()))),
    }
}

fn two_args<'a>(op: &str, args: &[&'a str]) -> Result<(&'a str, &'a str), DispatchError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(malformed(op, format!("expected 2 arguments, found {}", args.len()))),
    }
}

fn three_args<'a>(op: &str, args: &[&'a str]) -> Result<(&'a str, &'a str, &'a str), DispatchError> {
    match args {
        [a, b, c] => Ok((a, b, c)),
        _ => Err(malformed(op, format!("expected 3 arguments, found {}", args.len()))),
    }
}

fn one_tid(op: &str, args: &[&str]) -> Result<TransactionId, DispatchError> {
    parse_tid(op, one_arg(op, args)?)
}

fn parse_tid(op: &str, token: &str) -> Result<TransactionId, DispatchError> {
    if token.is_empty() {
        return Err(malformed(op, "empty transaction id"));
    }
    Ok(TransactionId::new(token))
}

fn parse_var(op: &str, token: &str) -> Result<VarId, DispatchError> {
    let digits = token.strip_prefix('x').ok_or_else(|| {
        malformed(op, format!("'{token}' is not a variable (expected x1..x20)"))
    })?;
    let number: u8 = digits
        .parse()
        .map_err(|_| malformed(op, format!("'{token}' is not a variable (expected x1..x20)")))?;
    VarId::new(number).ok_or_else(|| malformed(op, format!("variable index {number} out of range 1..=20")))
}

fn parse_int(op: &str, token: &str) -> Result<i64, DispatchError> {
    token
        .parse()
        .map_err(|_| malformed(op, format!("'{token}' is not an integer")))
}

fn parse_site_number(op: &str, token: &str) -> Result<u8, DispatchError> {
    token
        .parse()
        .map_err(|_| malformed(op, format!("'{token}' is not a site number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_blank() {
        assert_eq!(classify("").unwrap(), Line::Blank);
        assert_eq!(classify("   ").unwrap(), Line::Blank);
        assert_eq!(classify("// just a note").unwrap(), Line::Blank);
    }

    #[test]
    fn test_marker_is_recognized() {
        assert_eq!(classify("// Test 1").unwrap(), Line::TestMarker);
        assert_eq!(classify("//Test 12").unwrap(), Line::TestMarker);
    }

    #[test]
    fn parses_begin_and_read() {
        assert_eq!(
            classify("begin(T1)").unwrap(),
            Line::Operation(Operation::Begin(TransactionId::new("T1")))
        );
        assert_eq!(
            classify("R(T1, x3)").unwrap(),
            Line::Operation(Operation::Read(TransactionId::new("T1"), VarId::new(3).unwrap()))
        );
    }

    #[test]
    fn parses_write_with_negative_value() {
        assert_eq!(
            classify("W(T1,x2,-7)").unwrap(),
            Line::Operation(Operation::Write(TransactionId::new("T1"), VarId::new(2).unwrap(), -7))
        );
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert!(matches!(classify("frobnicate(T1)"), Err(DispatchError::UnknownOperation(_))));
    }

    #[test]
    fn rejects_out_of_range_variable() {
        assert!(matches!(classify("R(T1, x99)"), Err(DispatchError::MalformedArguments { .. })));
    }

    #[test]
    fn whitespace_between_tokens_is_ignored() {
        assert_eq!(
            classify("W( T1 , x4 , 40 )").unwrap(),
            Line::Operation(Operation::Write(TransactionId::new("T1"), VarId::new(4).unwrap(), 40))
        );
    }
}
