#[cfg(test)]
mod resolver_tests {
    use cox::ast::Stmt;
    use cox::error::CoxError;
    use cox::parser::Parser;
    use cox::resolver::{resolve, Locals};
    use cox::scanner::scan;

    fn resolve_source(source: &str) -> (Locals, Vec<CoxError>) {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty(), "lexical errors: {:?}", lex_errors);

        let (statements, parse_errors): (Vec<Stmt>, Vec<CoxError>) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        resolve(&statements)
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, errors) = resolve_source(source);

        errors.iter().map(|e| e.message()).collect()
    }

    fn distances(source: &str) -> Vec<usize> {
        let (locals, errors) = resolve_source(source);
        assert!(errors.is_empty(), "resolve errors: {:?}", errors);

        let mut hops: Vec<usize> = locals.into_values().collect();
        hops.sort_unstable();

        hops
    }

    #[test]
    fn test_self_reference_in_local_initializer() {
        let (_, errors) = resolve_source("{ var x = x; }");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at 'x': Cannot read local variable in its own initializer."
        );
    }

    #[test]
    fn test_self_reference_is_fine_at_global_scope() {
        assert!(messages("var x = x;").is_empty());
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            messages("{ var a = 1; var a = 2; }"),
            vec!["Variable with this name already declared in this scope."]
        );
        assert!(messages("var a = 1; var a = 2;").is_empty());
        assert!(messages("{ var a = 1; { var a = 2; } }").is_empty());
        assert_eq!(
            messages("func f(a, a) {}"),
            vec!["Variable with this name already declared in this scope."]
        );
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            messages("return 1;"),
            vec!["Cannot return from top-level code."]
        );
        assert_eq!(
            messages("class A { init() { return 1; } }"),
            vec!["Cannot return a value from an initializer."]
        );
        assert!(messages("class A { init() { return; } }").is_empty());
        assert!(messages("func f() { return 1; }").is_empty());
    }

    #[test]
    fn test_this_and_super_placement() {
        assert_eq!(
            messages("print this;"),
            vec!["Cannot use 'this' outside of a class."]
        );
        assert_eq!(
            messages("func f() { return this; }"),
            vec!["Cannot use 'this' outside of a class."]
        );
        assert_eq!(
            messages("print super.x;"),
            vec!["Cannot use 'super' outside of a class."]
        );
        assert_eq!(
            messages("class A { f() { return super.f(); } }"),
            vec!["Cannot use 'super' in a class with no superclass."]
        );
        assert!(messages("class A {} class B < A { f() { return super.f; } }").is_empty());
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            messages("class A < A {}"),
            vec!["A class cannot inherit from itself."]
        );
    }

    #[test]
    fn test_break_cannot_leave_through_a_function() {
        assert_eq!(
            messages("while (true) { func f() { break; } }"),
            vec!["Must be inside a loop to use 'break'."]
        );
        assert!(messages("func f() { while (true) { break; } }").is_empty());
    }

    #[test]
    fn test_collects_every_error() {
        assert_eq!(
            messages("{ var a = 1; var a = 2; } return 1; print this;").len(),
            3
        );
    }

    #[test]
    fn test_globals_are_left_out_of_the_table() {
        assert!(distances("var g = 1; { print g; } func f() { return g; }").is_empty());
    }

    #[test]
    fn test_local_distances() {
        // `a` read one block out.
        assert_eq!(distances("{ var a = 1; { print a; } }"), vec![1]);

        // parameter read from its own body.
        assert_eq!(distances("func f(x) { return x; }"), vec![0]);

        // closure reads the enclosing function's local.
        assert_eq!(
            distances("func outer() { var n = 0; func inner() { n = n + 1; } }"),
            vec![1, 1]
        );
    }

    #[test]
    fn test_this_and_super_distances() {
        // method body → `this` scope → `super` scope
        assert_eq!(
            distances("class A {} class B < A { m() { return super.m; } }"),
            vec![2]
        );
        assert_eq!(distances("class A { m() { return this; } }"), vec![1]);
    }

    #[test]
    fn test_shadowing_resolves_to_the_declaration_in_scope() {
        // The first `show` body reads global `a`; later local `a` is a
        // different binding and must not capture it.
        let hops: Vec<usize> = distances(
            "var a = 1; { func show() { print a; } show(); var a = 2; show(); }",
        );

        // only the two `show` calls resolve locally (same block)
        assert_eq!(hops, vec![0, 0]);
    }
}
