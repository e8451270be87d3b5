#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use cox::interpreter::Interpreter;
    use cox::parser::Parser;
    use cox::resolver::resolve;
    use cox::runner::{RunError, Session, EXIT_RUNTIME, EXIT_STATIC};
    use cox::scanner::scan;

    /// Collects everything `print` writes.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run(source: &str) -> (String, Result<(), RunError>) {
        let buf: SharedBuf = SharedBuf::default();
        let result: Result<(), RunError> = Session::with_writer(buf.clone()).run(source);

        (buf.contents(), result)
    }

    fn output(source: &str) -> String {
        let (out, result) = run(source);

        if let Err(e) = result {
            panic!("unexpected failure: {:?}", e);
        }

        out
    }

    fn runtime_error(source: &str) -> String {
        match run(source).1 {
            Err(RunError::Runtime(e)) => e.message(),
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    // ─── expressions ───

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(output("print 2 + 3 * 4;"), "14\n");
        assert_eq!(output("print (2 + 3) * 4;"), "20\n");
        assert_eq!(output("print 10 / 4;"), "2.5\n");
        assert_eq!(output("print 1 - 2 - 3;"), "-4\n");
        assert_eq!(output("print 7 - 2 * 3 + 8 / 2;"), "5\n");
    }

    #[test]
    fn test_division_by_zero_is_infinite() {
        assert_eq!(output("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_negative_zero_keeps_its_sign() {
        assert_eq!(output("print -0; print 0 * -1; print 0;"), "-0\n-0\n0\n");
    }

    #[test]
    fn test_conditional_selects_branch() {
        assert_eq!(output("print 1 < 2 ? \"a\" : \"b\";"), "a\n");
        assert_eq!(output("print 2 < 1 ? \"a\" : \"b\";"), "b\n");
    }

    #[test]
    fn test_conditional_does_not_evaluate_the_other_branch() {
        let source: &str = r#"
            var n = 0;
            func bump() { n = n + 1; return n; }
            print true ? 1 : bump();
            print false ? bump() : 2;
            print n;
        "#;

        assert_eq!(output(source), "1\n2\n0\n");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let source: &str = r#"
            var hits = 0;
            func hit() { hits = hits + 1; return true; }
            print false && hit();
            print true || hit();
            print null || "fallback";
            print 1 && 2;
            print hits;
        "#;

        assert_eq!(output(source), "false\ntrue\nfallback\n2\n0\n");
    }

    #[test]
    fn test_truthiness_and_equality() {
        assert_eq!(output("print !0; print !\"\"; print !null;"), "false\nfalse\ntrue\n");
        assert_eq!(
            output(
                "print null == null; print null == false; print 1 == 1; print \"a\" == \"a\"; print 1 == \"1\";"
            ),
            "true\nfalse\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output("print \"co\" + \"x\";"), "cox\n");
        assert_eq!(
            runtime_error("print \"a\" + 1;"),
            "Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn test_comma_yields_right_operand() {
        assert_eq!(output("var x = (1, 2); print x;"), "2\n");
    }

    #[test]
    fn test_increments() {
        assert_eq!(
            output("var a = 1; print a++; print a; print ++a; print a--; print --a;"),
            "1\n2\n3\n3\n1\n"
        );
    }

    #[test]
    fn test_property_increment_and_compound_assignment() {
        let source: &str = r#"
            class C {}
            var c = C();
            c.n = 5;
            c.n++;
            ++c.n;
            print c.n;
            c.n += 3;
            print c.n;
        "#;

        assert_eq!(output(source), "7\n10\n");
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(
            output("var x = 10; x -= 3; x *= 2; x /= 7; print x;"),
            "2\n"
        );
    }

    #[test]
    fn test_bitwise_operators() {
        assert_eq!(
            output(
                "print 5 & 3; print 5 | 3; print 5 ^ 3; print ~5; print 1 << 4; print -16 >> 2; print 2.5 & 7;"
            ),
            "1\n7\n6\n-6\n16\n-4\n2\n"
        );
    }

    // ─── interpolation ───

    #[test]
    fn test_interpolation() {
        let source: &str = r#"
            var name = "cox";
            var n = 3;
            print $"hi {name}, n={n + 1}";
            print $"[{n,4}]";
            print $"[{n,-4}]";
            print $"{n:x}";
            print $"{{literal}";
        "#;

        assert_eq!(output(source), "hi cox, n=4\n[   3]\n[3   ]\n3\n{literal}\n");
    }

    #[test]
    fn test_alignment_must_be_a_number() {
        assert_eq!(
            runtime_error("var n = 1; var w = \"wide\"; print $\"{n,w}\";"),
            "Alignment must be a number."
        );
    }

    #[test]
    fn test_wide_alignment_pads_without_limit() {
        let out: String = output("var n = 1; print $\"[{n,70000}]\"; print $\"[{n,-70000}]\";");
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 70002);
        assert!(lines[0].ends_with(" 1]"));
        assert!(lines[1].starts_with("[1 "));
        assert_eq!(lines[1].len(), 70002);
    }

    #[test]
    fn test_alignment_outside_32_bits_is_an_error() {
        assert_eq!(
            runtime_error("var n = 1; print $\"{n,99999999999999999999}\";"),
            "Alignment is out of range."
        );
        assert_eq!(
            runtime_error("var n = 1; print $\"{n,-3000000000}\";"),
            "Alignment is out of range."
        );
    }

    // ─── functions and closures ───

    #[test]
    fn test_closures_capture_the_frame() {
        let source: &str = r#"
            func makeCounter() {
                var i = 0;
                func count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        "#;

        assert_eq!(output(source), "1\n2\n");
    }

    #[test]
    fn test_closures_share_writes() {
        let source: &str = r#"
            var get;
            var set;
            {
                var shared = "before";
                func g() { return shared; }
                func s(v) { shared = v; }
                get = g;
                set = s;
            }
            set("after");
            print get();
        "#;

        assert_eq!(output(source), "after\n");
    }

    #[test]
    fn test_static_scope_survives_later_shadowing() {
        let source: &str = r#"
            var a = "global";
            {
                func show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn test_recursion() {
        let source: &str = r#"
            func fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(output(source), "55\n");
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        assert_eq!(output("func g(a) { return a; } print g(1, 2, 3);"), "1\n");
    }

    #[test]
    fn test_missing_arguments_fail_before_the_body_runs() {
        let buf: SharedBuf = SharedBuf::default();
        let mut session: Session = Session::with_writer(buf.clone());

        session
            .run("var ran = false; func f(a, b) { ran = true; }")
            .unwrap();

        match session.run("f(1);") {
            Err(RunError::Runtime(e)) => {
                assert_eq!(e.message(), "Not enough arguments: expected 2 but got 1.");
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }

        session.run("print ran;").unwrap();
        assert_eq!(buf.contents(), "false\n");
    }

    #[test]
    fn test_return_inside_loop_stops_at_the_call() {
        let source: &str = r#"
            func f() {
                while (true) { return 5; }
            }
            print f();
            print "after";
        "#;

        assert_eq!(output(source), "5\nafter\n");
    }

    #[test]
    fn test_stringification() {
        let source: &str = r#"
            func f() {}
            class K { m() {} }
            print f;
            print K;
            print K();
            print K().m;
            print f();
            print 3.0;
            print 0.5;
        "#;

        assert_eq!(
            output(source),
            "<fn f>\nK\nK instance\n<fn m>\nnull\n3\n0.5\n"
        );
    }

    // ─── loops ───

    #[test]
    fn test_break_leaves_only_the_nearest_loop() {
        let source: &str = r#"
            var i = 0;
            while (true) {
                { if (i == 3) break; }
                i = i + 1;
            }
            print i;
            for (var j = 0; j < 2; j++) {
                while (true) { break; }
                print j;
            }
            print "done";
        "#;

        assert_eq!(output(source), "3\n0\n1\ndone\n");
    }

    // ─── classes ───

    #[test]
    fn test_inheritance_and_super() {
        let source: &str = r#"
            class A {
                method() { return "A method"; }
                who() { return this.name; }
            }
            class B < A {
                method() { return "B then " + super.method(); }
            }
            var b = B();
            b.name = "bee";
            print b.method();
            print b.who();
            print b;
        "#;

        assert_eq!(output(source), "B then A method\nbee\nB instance\n");
    }

    #[test]
    fn test_initializer() {
        let source: &str = r#"
            class P {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = P(1, 2);
            print p.sum();
            print p.init(3, 4) == p;
            print p.sum();
        "#;

        assert_eq!(output(source), "3\ntrue\n7\n");
        assert_eq!(
            runtime_error("class P { init(x, y) {} } P(1);"),
            "Not enough arguments: expected 2 but got 1."
        );
    }

    #[test]
    fn test_inherited_initializer() {
        let source: &str = r#"
            class Base { init(v) { this.v = v; } }
            class Derived < Base {}
            print Derived(9).v;
        "#;

        assert_eq!(output(source), "9\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source: &str = r#"
            class A { m() { return "method"; } }
            var a = A();
            a.m = "field";
            print a.m;
        "#;

        assert_eq!(output(source), "field\n");
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        let source: &str = r#"
            class Box { init(v) { this.v = v; } get() { return this.v; } }
            var g = Box("kept").get;
            print g();
        "#;

        assert_eq!(output(source), "kept\n");
    }

    // ─── runtime errors ───

    #[test]
    fn test_undefined_names() {
        assert_eq!(runtime_error("print nope;"), "Undefined variable 'nope'.");
        assert_eq!(runtime_error("nope = 1;"), "Undefined variable 'nope'.");
        assert_eq!(
            runtime_error("class A {} print A().nope;"),
            "Undefined property 'nope'."
        );
    }

    #[test]
    fn test_type_errors() {
        assert_eq!(runtime_error("print -\"a\";"), "Operand must be a number.");
        assert_eq!(runtime_error("print 1 < \"a\";"), "Operands must be numbers.");
        assert_eq!(runtime_error("print ~null;"), "Operand must be a number.");
        assert_eq!(
            runtime_error("\"s\"();"),
            "Can only call functions and classes."
        );
        assert_eq!(
            runtime_error("var x = 1; print x.y;"),
            "Only instances have properties."
        );
        assert_eq!(
            runtime_error("var x = 1; x.y = 2;"),
            "Only instances have fields."
        );
        assert_eq!(
            runtime_error("var N = 1; class A < N {}"),
            "Superclass must be a class."
        );
    }

    #[test]
    fn test_set_evaluates_the_value_before_the_object() {
        let (out, result) = run(
            r#"
            var target = 1;
            func value() { print "value"; return 2; }
            target.field = value();
            "#,
        );

        assert_eq!(out, "value\n");
        assert!(matches!(result, Err(RunError::Runtime(ref e)) if e.message() == "Only instances have fields."));
    }

    #[test]
    fn test_runtime_error_stops_the_unit() {
        let (out, result) = run("print 1;\nprint nope;\nprint 2;");

        assert_eq!(out, "1\n");

        let error: RunError = result.unwrap_err();
        assert_eq!(error.exit_code(), EXIT_RUNTIME);
        assert_eq!(error.to_string(), "Undefined variable 'nope'.\n[line 2]");
    }

    #[test]
    fn test_static_error_prevents_execution() {
        let (out, result) = run("print \"x\";\nprint ;");

        assert_eq!(out, "");

        let error: RunError = result.unwrap_err();
        assert_eq!(error.exit_code(), EXIT_STATIC);
        assert_eq!(error.errors().len(), 1);
    }

    #[test]
    fn test_resolution_error_prevents_execution() {
        let (out, result) = run("print 1; { var a = a; }");

        assert_eq!(out, "");
        assert_eq!(result.unwrap_err().exit_code(), EXIT_STATIC);
    }

    // ─── sessions ───

    #[test]
    fn test_units_share_globals_and_closures() {
        let buf: SharedBuf = SharedBuf::default();
        let mut session: Session = Session::with_writer(buf.clone());

        session
            .run("var f; { var local = \"captured\"; func g() { return local; } f = g; }")
            .unwrap();
        session.run("var a = 1; var a = 2;").unwrap();
        session.run("print f(); print a;").unwrap();

        assert_eq!(buf.contents(), "captured\n2\n");
    }

    #[test]
    fn test_break_stops_at_the_call_boundary() {
        let buf: SharedBuf = SharedBuf::default();
        let mut interpreter: Interpreter = Interpreter::with_writer(buf.clone());

        let (tokens, _) = scan(
            "while (true) { func f() { break; } f(); print \"after\"; break; }",
        );
        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty());

        // The resolver rejects this program; run it anyway.
        let (locals, errors) = resolve(&statements);
        assert_eq!(errors.len(), 1);

        interpreter.interpret(&statements, locals).unwrap();

        assert_eq!(buf.contents(), "after\n");
    }

    #[test]
    fn test_interpreter_directly() {
        let buf: SharedBuf = SharedBuf::default();
        let mut interpreter: Interpreter = Interpreter::with_writer(buf.clone());

        let (tokens, _) = scan("{ var x = 40; x = x + 2; print x; }");
        let (statements, _) = Parser::new(tokens).parse();
        let (locals, errors) = resolve(&statements);
        assert!(errors.is_empty());

        interpreter.interpret(&statements, locals).unwrap();

        assert_eq!(buf.contents(), "42\n");
    }
}
