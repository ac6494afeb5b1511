#[cfg(test)]
mod resolver_tests {
    use rill::ast::Stmt;
    use rill::diagnostics::Diagnostics;
    use rill::error::{Result, RillError};
    use rill::interpreter::Interpreter;
    use rill::parser::Parser;
    use rill::resolver::Resolver;
    use rill::scanner::Scanner;

    /// Parse (expecting no syntax errors) and run the resolve pass.
    fn resolve(source: &str) -> Result<()> {
        let mut diagnostics = Diagnostics::new();

        let scanner = Scanner::new(source.as_bytes().to_vec());
        let mut parser = Parser::new(scanner, &mut diagnostics);
        let statements: Vec<Stmt> = parser.parse();

        assert!(
            !diagnostics.had_error(),
            "unexpected parse errors: {:?}",
            diagnostics.errors()
        );

        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements)
    }

    fn resolve_error(source: &str) -> RillError {
        resolve(source).expect_err("expected a resolve error")
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_rejected() {
        let err = resolve_error("{ let a = \"outer\"; { let a = a; } }");

        let rendered = err.to_string();
        assert!(
            rendered.contains("Can't read local variable in its own initializer."),
            "unexpected message: {}",
            rendered
        );
        assert!(rendered.contains("at 'a'"), "unexpected anchor: {}", rendered);
    }

    #[test]
    fn global_self_reference_is_deferred_to_runtime() {
        // The scope stack is empty at top level, so nothing is recorded and
        // the lookup happens in globals at runtime.
        assert!(resolve("let a = a;").is_ok());
    }

    #[test]
    fn duplicate_declaration_in_the_same_scope_is_rejected() {
        let err = resolve_error("{ let a = 1; let a = 2; }");
        assert!(err
            .to_string()
            .contains("Variable already declared in this scope"));
    }

    #[test]
    fn shadowing_in_a_nested_scope_is_allowed() {
        assert!(resolve("{ let a = 1; { let a = 2; } }").is_ok());
    }

    #[test]
    fn duplicate_globals_are_allowed() {
        assert!(resolve("let a = 1; let a = 2;").is_ok());
    }

    #[test]
    fn this_outside_a_class_is_rejected() {
        let err = resolve_error("print(this);");
        assert!(err
            .to_string()
            .contains("Cannot use 'this' outside of a class."));

        let err = resolve_error("fun f() { return this; } ");
        assert!(err
            .to_string()
            .contains("Cannot use 'this' outside of a class."));
    }

    #[test]
    fn this_inside_a_method_is_accepted() {
        assert!(resolve("class C { who() { return this; } }").is_ok());
    }

    #[test]
    fn returning_a_value_from_an_initializer_is_rejected() {
        let err = resolve_error("class C { init() { return 1; } }");
        assert!(err
            .to_string()
            .contains("Can't return a value from an initializer."));
    }

    #[test]
    fn bare_return_in_an_initializer_is_accepted() {
        assert!(resolve("class C { init() { return; } }").is_ok());
    }

    #[test]
    fn a_static_init_is_not_an_initializer() {
        // `static init` is an ordinary static method, so it may return a
        // value.
        assert!(resolve("class C { static init() { return 1; } }").is_ok());
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let err = resolve_error("fun f(a, a) { }");
        assert!(err
            .to_string()
            .contains("Variable already declared in this scope"));
    }
}
