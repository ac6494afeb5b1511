#[cfg(test)]
mod scanner_tests {
    use rill::scanner::*;
    use rill::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_one_or_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / ;",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords() {
        assert_token_sequence(
            "and break class continue else false for fun if let nil or return static this true while",
            &[
                (TokenType::AND, "and"),
                (TokenType::BREAK, "break"),
                (TokenType::CLASS, "class"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::ELSE, "else"),
                (TokenType::FALSE, "false"),
                (TokenType::FOR, "for"),
                (TokenType::FUN, "fun"),
                (TokenType::IF, "if"),
                (TokenType::LET, "let"),
                (TokenType::NIL, "nil"),
                (TokenType::OR, "or"),
                (TokenType::RETURN, "return"),
                (TokenType::STATIC, "static"),
                (TokenType::THIS, "this"),
                (TokenType::TRUE, "true"),
                (TokenType::WHILE, "while"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_print_is_an_identifier() {
        // `print` is not a keyword; it scans as an identifier and binds to
        // a native function at runtime.
        assert_token_sequence(
            "print lettuce statics _under Z9",
            &[
                (TokenType::IDENTIFIER, "print"),
                (TokenType::IDENTIFIER, "lettuce"),
                (TokenType::IDENTIFIER, "statics"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::IDENTIFIER, "Z9"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_numbers() {
        let scanner = Scanner::new(b"123 45.67 8.".to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 5);

        match tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 123.0),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 45.67),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }

        // A trailing dot is not part of the number literal.
        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 8.0),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_06_string_literal_spanning_lines() {
        let scanner = Scanner::new(b"\"hello\nworld\"".to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 2);

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello\nworld"),
            other => panic!("expected STRING, got {:?}", other),
        }

        // The newline inside the literal bumps the line counter.
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn test_scanner_07_comments_and_line_counting() {
        let scanner = Scanner::new(b"// leading comment\nlet x; // trailing\n42".to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].token_type, TokenType::LET);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].token_type, TokenType::NUMBER(0.0));
        assert_eq!(tokens[3].line, 3);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_08_unterminated_string() {
        let scanner = Scanner::new(b"\"abc".to_vec());
        let results: Vec<_> = scanner.collect();

        // One error, then the terminal EOF.
        assert_eq!(results.len(), 2);

        match &results[0] {
            Err(e) => assert!(
                e.to_string().contains("Unterminated string."),
                "unexpected message: {}",
                e
            ),
            Ok(t) => panic!("expected error, got token {:?}", t.token_type),
        }

        match &results[1] {
            Ok(t) => assert_eq!(t.token_type, TokenType::EOF),
            Err(e) => panic!("expected EOF, got error {}", e),
        }
    }

    #[test]
    fn test_scanner_09_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes().to_vec());

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<rill::token::Token, rill::error::RillError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_scanner_10_iterator_is_fused() {
        let mut scanner = Scanner::new(b";".to_vec());

        assert!(matches!(scanner.next(), Some(Ok(_)))); // SEMICOLON
        assert!(matches!(scanner.next(), Some(Ok(_)))); // EOF
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
