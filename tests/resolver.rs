#[cfg(test)]
mod resolver_tests {
    use quill::error::ResolveError;
    use quill::parser::Parser;
    use quill::resolver::Resolver;
    use quill::scanner::Scanner;
    use quill::stmt::Stmt;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<_> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("lex error");

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        assert!(
            parser.errors().is_empty(),
            "parse errors: {:?}",
            parser.errors()
        );

        statements
    }

    fn resolve_errors(source: &str) -> Vec<ResolveError> {
        let statements = parse(source);
        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        resolver.finish().1
    }

    #[test]
    fn clean_program_has_no_errors() {
        let errors = resolve_errors(
            "var a = 1;\
             fun f(x) { return x + a; }\
             print f(2);",
        );
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn duplicate_declaration_in_block_scope() {
        let errors = resolve_errors("{ var a = 1; var a = 2; }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::DuplicateDeclaration { name, .. }] if name == "a"
        ));
    }

    #[test]
    fn duplicate_parameter_names() {
        let errors = resolve_errors("fun f(x, x) { return x; }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::DuplicateDeclaration { name, .. }] if name == "x"
        ));
    }

    #[test]
    fn global_redeclaration_is_allowed() {
        // the globals frame is dynamic; only block scopes are checked
        let errors = resolve_errors("var a = 1; var a = 2;");
        assert!(errors.is_empty());
    }

    #[test]
    fn self_referencing_initializer() {
        let errors = resolve_errors("{ var a = a; }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::SelfReferencingInitializer { name, .. }] if name == "a"
        ));
    }

    #[test]
    fn return_outside_function() {
        let errors = resolve_errors("return 1;");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::ReturnOutsideFunction { line: 1 }]
        ));
    }

    #[test]
    fn return_value_from_initializer() {
        let errors = resolve_errors("class Thing { init() { return 42; } }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::ReturnValueFromInitializer { .. }]
        ));
    }

    #[test]
    fn bare_return_from_initializer_is_allowed() {
        let errors = resolve_errors("class Thing { init() { return; } }");
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn this_outside_class() {
        let errors = resolve_errors("print this;");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::ThisOutsideClass { .. }]
        ));
    }

    #[test]
    fn this_in_standalone_function() {
        let errors = resolve_errors("fun f() { return this; }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::ThisOutsideClass { .. }]
        ));
    }

    #[test]
    fn super_outside_class() {
        let errors = resolve_errors("super.cook();");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::SuperOutsideClass { .. }]
        ));
    }

    #[test]
    fn super_without_superclass() {
        let errors = resolve_errors("class Orphan { method() { super.method(); } }");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::SuperWithoutSuperclass { .. }]
        ));
    }

    #[test]
    fn self_inheritance() {
        let errors = resolve_errors("class Ouroboros < Ouroboros {}");
        assert!(matches!(
            errors.as_slice(),
            [ResolveError::SelfInheritance { name, .. }] if name == "Ouroboros"
        ));
    }

    #[test]
    fn multiple_errors_surface_in_one_pass() {
        let errors = resolve_errors(
            "return 1;\n\
             print this;\n\
             { var a = 1; var a = 2; }",
        );

        assert_eq!(errors.len(), 3, "expected 3 errors, got {:?}", errors);
        assert!(matches!(
            errors[0],
            ResolveError::ReturnOutsideFunction { line: 1 }
        ));
        assert!(matches!(errors[1], ResolveError::ThisOutsideClass { line: 2 }));
        assert!(matches!(
            errors[2],
            ResolveError::DuplicateDeclaration { line: 3, .. }
        ));
    }

    #[test]
    fn resolution_is_idempotent() {
        let statements = parse(
            "var global = 1;\
             fun outer() {\
               var captured = 2;\
               fun inner() { return captured + global; }\
               return inner();\
             }\
             { var shadow = global; print shadow; }",
        );

        let mut first = Resolver::new();
        first.resolve(&statements);
        let (first_locals, first_errors) = first.finish();

        let mut second = Resolver::new();
        second.resolve(&statements);
        let (second_locals, second_errors) = second.finish();

        assert!(first_errors.is_empty());
        assert!(second_errors.is_empty());
        assert_eq!(first_locals, second_locals);
    }

    #[test]
    fn globals_get_no_table_entry() {
        let statements = parse("var a = 1; print a;");
        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        let (locals, errors) = resolver.finish();

        assert!(errors.is_empty());
        assert!(locals.is_empty());
    }

    #[test]
    fn block_local_resolves_at_distance_zero() {
        let statements = parse("{ var a = 1; print a; }");
        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        let (locals, errors) = resolver.finish();

        assert!(errors.is_empty());
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn capture_resolves_across_function_scope() {
        // `captured` is used one function scope plus one block scope away
        let statements = parse("{ var captured = 1; fun f() { print captured; } }");
        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        let (locals, errors) = resolver.finish();

        assert!(errors.is_empty());
        // exactly one reference resolved: `captured` inside f, one hop out
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![1]);
    }
}
