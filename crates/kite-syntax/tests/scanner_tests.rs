use super::*;

fn scan_all(source: &str) -> (Vec<(SyntaxKind, String)>, ScannerState) {
    let mut scanner = ScannerState::new("test.kts", source);
    let mut tokens = Vec::new();
    loop {
        let kind = scanner.scan();
        if kind == SyntaxKind::EndOfFile {
            break;
        }
        tokens.push((kind, scanner.token_value().to_string()));
    }
    (tokens, scanner)
}

fn kinds(source: &str) -> Vec<SyntaxKind> {
    scan_all(source).0.into_iter().map(|(kind, _)| kind).collect()
}

#[test]
fn test_keywords_and_identifiers() {
    let (tokens, _) = scan_all("val value = funny");
    assert_eq!(
        tokens,
        vec![
            (SyntaxKind::ValKeyword, String::new()),
            (SyntaxKind::Identifier, "value".to_string()),
            (SyntaxKind::Equals, String::new()),
            (SyntaxKind::Identifier, "funny".to_string()),
        ]
    );
}

#[test]
fn test_two_character_operators() {
    assert_eq!(
        kinds("<= >= == != -> ?: && || < > ! ?"),
        vec![
            SyntaxKind::LessThanEquals,
            SyntaxKind::GreaterThanEquals,
            SyntaxKind::EqualsEquals,
            SyntaxKind::ExclamationEquals,
            SyntaxKind::Arrow,
            SyntaxKind::QuestionColon,
            SyntaxKind::AmpersandAmpersand,
            SyntaxKind::BarBar,
            SyntaxKind::LessThan,
            SyntaxKind::GreaterThan,
            SyntaxKind::Exclamation,
            SyntaxKind::Question,
        ]
    );
}

#[test]
fn test_integer_with_underscores() {
    let (tokens, _) = scan_all("1_000_000");
    assert_eq!(tokens, vec![(SyntaxKind::IntLiteral, "1000000".to_string())]);
}

#[test]
fn test_string_escapes_are_cooked() {
    let (tokens, scanner) = scan_all(r#""a\tb\n\"q\" A""#);
    assert_eq!(tokens, vec![(SyntaxKind::StringLiteral, "a\tb\n\"q\" A".to_string())]);
    assert!(scanner.diagnostics.is_empty());
}

#[test]
fn test_unterminated_string_reported_at_literal_start() {
    let (_, mut scanner) = scan_all("x = \"abc\nnext");
    let diagnostics = scanner.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, diagnostic_codes::UNTERMINATED_STRING);
    assert_eq!(diagnostics[0].start, 4);
}

#[test]
fn test_line_break_flag() {
    let mut scanner = ScannerState::new("test.kts", "a // comment\n  b /* x */ c");
    assert_eq!(scanner.scan(), SyntaxKind::Identifier);
    assert!(!scanner.has_preceding_line_break());
    assert_eq!(scanner.scan(), SyntaxKind::Identifier);
    assert!(scanner.has_preceding_line_break());
    assert_eq!(scanner.token_start(), 15);
    assert_eq!(scanner.scan(), SyntaxKind::Identifier);
    assert!(!scanner.has_preceding_line_break());
    assert_eq!(scanner.token_text(), "c");
}

#[test]
fn test_multiline_block_comment_counts_as_line_break() {
    let mut scanner = ScannerState::new("test.kts", "a /*\n*/ b");
    scanner.scan();
    scanner.scan();
    assert!(scanner.has_preceding_line_break());
}

#[test]
fn test_unterminated_comment_reported_at_end() {
    let source = "a /* never closed";
    let (_, mut scanner) = scan_all(source);
    let diagnostics = scanner.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, diagnostic_codes::UNTERMINATED_COMMENT);
    assert_eq!(diagnostics[0].start, source.len() as u32);
}

#[test]
fn test_invalid_character() {
    let (tokens, mut scanner) = scan_all("a # b");
    assert_eq!(tokens[1].0, SyntaxKind::Unknown);
    let diagnostics = scanner.take_diagnostics();
    assert_eq!(diagnostics[0].code, diagnostic_codes::INVALID_CHARACTER);
    assert_eq!(diagnostics[0].message_text, "Invalid character '#'");
}

#[test]
fn test_soft_keywords() {
    assert!(SyntaxKind::InKeyword.is_soft_keyword());
    assert!(!SyntaxKind::ValKeyword.is_soft_keyword());
    assert_eq!(kinds("in out"), vec![SyntaxKind::InKeyword, SyntaxKind::OutKeyword]);
}
