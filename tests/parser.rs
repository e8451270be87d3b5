#[cfg(test)]
mod parser_tests {
    use cox::ast::{Expr, LiteralValue, Stmt};
    use cox::ast_printer::AstPrinter;
    use cox::error::CoxError;
    use cox::parser::Parser;
    use cox::scanner::scan;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<CoxError>) {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty(), "lexical errors: {:?}", lex_errors);

        Parser::new(tokens).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        let (statements, errors) = parse_source(source);
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        statements
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, errors) = parse_source(source);

        errors.iter().map(|e| e.message()).collect()
    }

    fn reprint(source: &str) -> String {
        AstPrinter::new().print_program(&parse_ok(source))
    }

    // ─── precedence and associativity ───

    #[test]
    fn test_factor_binds_tighter_than_term() {
        let statements: Vec<Stmt> = parse_ok("2 + 3 * 4;");

        let Stmt::Expression(Expr::Binary {
            operator, right, ..
        }) = &statements[0]
        else {
            panic!("expected a binary expression statement");
        };

        assert_eq!(operator.lexeme, "+");
        assert!(matches!(**right, Expr::Binary { ref operator, .. } if operator.lexeme == "*"));
    }

    #[test]
    fn test_print_keeps_needed_grouping() {
        assert_eq!(reprint("print (2 + 3) * 4;"), "print (2 + 3) * 4;\n");
        assert_eq!(reprint("print 2 + 3 * 4;"), "print 2 + 3 * 4;\n");
        assert_eq!(reprint("print 1 - 2 - 3;"), "print 1 - 2 - 3;\n");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let statements: Vec<Stmt> = parse_ok("a = b = 1;");

        let Stmt::Expression(Expr::Assign { name, value, .. }) = &statements[0] else {
            panic!("expected an assignment");
        };

        assert_eq!(name.lexeme, "a");
        assert!(matches!(**value, Expr::Assign { ref name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn test_conditional() {
        assert_eq!(
            reprint("print 1 < 2 ? \"a\" : \"b\";"),
            "print 1 < 2 ? \"a\" : \"b\";\n"
        );
        assert_eq!(reprint("x = a ? b : c ? d : e;"), "x = a ? b : c ? d : e;\n");
    }

    #[test]
    fn test_call_arguments_are_separated_by_commas() {
        let statements: Vec<Stmt> = parse_ok("f(1, 2, 3);");

        let Stmt::Expression(Expr::Call { arguments, .. }) = &statements[0] else {
            panic!("expected a call");
        };

        assert_eq!(arguments.len(), 3);
    }

    #[test]
    fn test_comma_operator_in_grouping() {
        let statements: Vec<Stmt> = parse_ok("f((a, b));");

        let Stmt::Expression(Expr::Call { arguments, .. }) = &statements[0] else {
            panic!("expected a call");
        };

        assert_eq!(arguments.len(), 1);
        assert_eq!(reprint("f((a, b));"), "f((a, b));\n");
    }

    // ─── desugaring ───

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(reprint("x += 2;"), "x = x + 2;\n");
        assert_eq!(reprint("a.b *= 1 + 2;"), "a.b = a.b * (1 + 2);\n");
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            reprint("for (var i = 0; i < 3; i++) print i;"),
            "{\n    var i = 0;\n    while (i < 3) {\n        print i;\n        i++;\n    }\n}\n"
        );
    }

    #[test]
    fn test_for_without_condition_loops_on_true() {
        let statements: Vec<Stmt> = parse_ok("for (;;) break;");

        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("expected a bare while loop");
        };

        assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
    }

    #[test]
    fn test_superclass_is_a_variable_reference() {
        let statements: Vec<Stmt> = parse_ok("class B < A {}");

        let Stmt::Class { superclass, .. } = &statements[0] else {
            panic!("expected a class");
        };

        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
    }

    #[test]
    fn test_interpolation_segments() {
        let statements: Vec<Stmt> = parse_ok(r#"print $"a{x,5:d}b";"#);

        let Stmt::Print(Expr::Interpolation { parts, .. }) = &statements[0] else {
            panic!("expected an interpolated string");
        };

        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], Expr::Literal(LiteralValue::Str(s)) if s == "a"));
        assert!(matches!(
            &parts[1],
            Expr::StringFormat {
                alignment: Some(_),
                format: Some(format),
                ..
            } if format.lexeme == "d"
        ));
    }

    // ─── errors and recovery ───

    #[test]
    fn test_reports_several_errors_and_keeps_going() {
        let (statements, errors) = parse_source("var = 1;\nprint ;\nprint 1;");

        assert_eq!(statements.len(), 1);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at '=': Expect variable name."
        );
        assert_eq!(
            errors[1].to_string(),
            "[line 2] Error at ';': Expect expression."
        );
    }

    #[test]
    fn test_error_at_end() {
        let (_, errors) = parse_source("print 1");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, errors) = parse_source("1 = 2; print 3;");

        assert_eq!(statements.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Invalid assignment target.");
    }

    #[test]
    fn test_parameter_and_argument_limits() {
        assert_eq!(
            messages("func f(a, b, c, d, e, f, g, h, i) {}"),
            vec!["Cannot have more than 8 parameters."]
        );
        assert_eq!(
            messages("f(1, 2, 3, 4, 5, 6, 7, 8, 9);"),
            vec!["Cannot have more than 8 arguments."]
        );
        assert!(messages("func f(a, b, c, d, e, f, g, h) {}").is_empty());
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            messages("break;"),
            vec!["Must be inside a loop to use 'break'."]
        );
        assert!(messages("while (true) { if (x) break; }").is_empty());
    }

    #[test]
    fn test_unary_plus_is_rejected() {
        assert_eq!(messages("print +1;"), vec!["Unary '+' not supported."]);
    }

    #[test]
    fn test_invalid_increment_target() {
        assert_eq!(messages("1++;"), vec!["Invalid increment target."]);
        assert_eq!(messages("++(a);"), vec!["Invalid increment target."]);
        assert!(messages("a++; --a; a.b++; ++a.b;").is_empty());
    }

    #[test]
    fn test_brackets_are_not_expressions() {
        assert_eq!(messages("print [;"), vec!["Expect expression."]);
    }

    // ─── parse ∘ print idempotence ───

    #[test]
    fn test_print_parse_round_trip() {
        let source: &str = r#"
            class A < B {
                init(x) { this.x = x; }
                get() { return super.get() + this.x; }
            }
            func f(a, b) { var c = a, b; return c ? a : b; }
            var s = $"v={f(1, 2),-5:d} {{ok}";
            for (var i = 0; i < 10; i += 1) { if (i == 3) break; else print i; }
            while (true) { x++; --y; a.b = ~c & 3 | 1 << 2; }
            print !(a || b && c) == null;
            print -(-x) - -1;
        "#;

        let first: String = reprint(source);
        let second: String = reprint(&first);

        assert_eq!(first, second);
        assert_eq!(parse_ok(&first).len(), parse_ok(source).len());
    }
}
