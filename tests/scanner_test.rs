use logsim::names::NameTable;
use logsim::scanner::{Scanner, SymbolKind};

/// Scans the whole source, returning every symbol kind up to and including
/// the first `Eof`.
fn scan_all(source: &str) -> (Vec<SymbolKind>, NameTable) {
    let mut names = NameTable::new();
    let mut scanner = Scanner::new(source);
    let mut kinds = Vec::new();
    loop {
        let symbol = scanner.next_symbol(&mut names);
        kinds.push(symbol.kind);
        if symbol.kind == SymbolKind::Eof {
            break;
        }
    }
    (kinds, names)
}

#[test]
fn token_stream_of_mixed_source() {
    let (kinds, names) = scan_all("#TEST\nAND and1(IN=4);#;->\n,->2a.[OUT]TO");
    let and = names.query("AND").unwrap();
    let and1 = names.query("and1").unwrap();
    let a = names.query("a").unwrap();
    assert_eq!(
        kinds,
        vec![
            SymbolKind::Keyword(and),
            SymbolKind::Name(and1),
            SymbolKind::OpenParen,
            SymbolKind::In,
            SymbolKind::Equals,
            SymbolKind::Number(4),
            SymbolKind::CloseParen,
            SymbolKind::Semicolon,
            SymbolKind::Comma,
            SymbolKind::Connection,
            SymbolKind::Number(2),
            SymbolKind::Name(a),
            SymbolKind::Fullstop,
            SymbolKind::OpenBracket,
            SymbolKind::Out,
            SymbolKind::CloseBracket,
            SymbolKind::To,
            SymbolKind::Eof,
        ]
    );
}

#[test]
fn eof_is_returned_forever() {
    let mut names = NameTable::new();
    let mut scanner = Scanner::new("a");
    assert!(matches!(
        scanner.next_symbol(&mut names).kind,
        SymbolKind::Name(_)
    ));
    for _ in 0..3 {
        assert_eq!(scanner.next_symbol(&mut names).kind, SymbolKind::Eof);
    }
}

#[test]
fn comments_and_whitespace_yield_eof_immediately() {
    let (kinds, _) = scan_all("  # first comment\n\n\t # second\n   ");
    assert_eq!(kinds, vec![SymbolKind::Eof]);

    let (kinds, _) = scan_all("");
    assert_eq!(kinds, vec![SymbolKind::Eof]);
}

#[test]
fn alternating_comments_and_whitespace_are_all_skipped() {
    let (kinds, names) = scan_all("#a\n  #b\n  nand  # trailing\n#c\n2");
    let nand1 = names.query("nand").unwrap();
    assert_eq!(
        kinds,
        vec![
            SymbolKind::Name(nand1),
            SymbolKind::Number(2),
            SymbolKind::Eof
        ]
    );
}

#[test]
fn symbols_carry_line_and_column() {
    let mut names = NameTable::new();
    let mut scanner = Scanner::new("#TEST\nAND and1(IN=4);");

    let and = scanner.next_symbol(&mut names);
    assert_eq!((and.line, and.column), (1, 0));

    let and1 = scanner.next_symbol(&mut names);
    assert_eq!((and1.line, and1.column), (1, 4));

    // Skip "(IN="
    for _ in 0..3 {
        scanner.next_symbol(&mut names);
    }
    let four = scanner.next_symbol(&mut names);
    assert_eq!(four.kind, SymbolKind::Number(4));
    assert_eq!((four.line, four.column), (1, 12));

    let close_paren = scanner.next_symbol(&mut names);
    assert_eq!((close_paren.line, close_paren.column), (1, 13));

    let semicolon = scanner.next_symbol(&mut names);
    assert_eq!((semicolon.line, semicolon.column), (1, 14));
}

#[test]
fn line_details_describe_the_last_symbol() {
    let mut names = NameTable::new();
    let mut scanner = Scanner::new("#TEST\nAND and1(IN=4);#;->\n,");
    scanner.next_symbol(&mut names);
    scanner.next_symbol(&mut names);

    let (line_number, text, column) = scanner.line_details(None);
    assert_eq!(line_number, 2);
    assert_eq!(text, "AND and1(IN=4);#;->");
    assert_eq!(column, Some(4));

    let (line_number, text, column) = scanner.line_details(Some(0));
    assert_eq!(line_number, 1);
    assert_eq!(text, "#TEST");
    assert_eq!(column, None);
}

#[test]
fn dash_without_arrow_is_unknown() {
    let (kinds, _) = scan_all("- >");
    assert_eq!(
        kinds,
        vec![SymbolKind::Unknown, SymbolKind::Unknown, SymbolKind::Eof]
    );

    let (kinds, names) = scan_all("a->b");
    let a = names.query("a").unwrap();
    let b = names.query("b").unwrap();
    assert_eq!(
        kinds,
        vec![
            SymbolKind::Name(a),
            SymbolKind::Connection,
            SymbolKind::Name(b),
            SymbolKind::Eof
        ]
    );
}

#[test]
fn positional_words_are_not_names() {
    let (kinds, _) = scan_all("TO IN OUT PERIOD");
    assert_eq!(
        kinds,
        vec![
            SymbolKind::To,
            SymbolKind::In,
            SymbolKind::Out,
            SymbolKind::Period,
            SymbolKind::Eof
        ]
    );
}
