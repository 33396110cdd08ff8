#[cfg(test)]
mod environment_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use quill::environment::Environment;
    use quill::error::RuntimeError;
    use quill::value::Value;

    fn frame() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::new()))
    }

    fn child(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::with_enclosing(enclosing.clone())))
    }

    #[test]
    fn define_then_get() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));

        assert_eq!(globals.borrow().get("a", 1).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn define_is_destructive() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));
        globals.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(globals.borrow().get("a", 1).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn get_searches_outward() {
        let globals = frame();
        globals
            .borrow_mut()
            .define("outer", Value::String("found".into()));
        let inner = child(&globals);

        assert_eq!(
            inner.borrow().get("outer", 1).unwrap(),
            Value::String("found".into())
        );
    }

    #[test]
    fn get_of_missing_name_fails() {
        let globals = frame();
        let error = globals.borrow().get("ghost", 3).unwrap_err();

        assert!(matches!(
            error,
            RuntimeError::UndefinedVariable { ref name, line: 3 } if name == "ghost"
        ));
    }

    #[test]
    fn assign_mutates_the_owning_frame() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = child(&globals);

        inner
            .borrow_mut()
            .assign("a", Value::Number(5.0), 1)
            .unwrap();

        // the mutation landed in the outer frame, not a new inner binding
        assert_eq!(globals.borrow().get("a", 1).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let globals = frame();
        let error = globals
            .borrow_mut()
            .assign("ghost", Value::Nil, 2)
            .unwrap_err();

        assert!(matches!(error, RuntimeError::UndefinedVariable { .. }));
        assert!(globals.borrow().get("ghost", 2).is_err());
    }

    #[test]
    fn shadowing_hides_the_outer_binding() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = child(&globals);
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(inner.borrow().get("a", 1).unwrap(), Value::Number(2.0));
        assert_eq!(globals.borrow().get("a", 1).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_at_reads_the_exact_frame() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let middle = child(&globals);
        middle.borrow_mut().define("a", Value::Number(2.0));
        let inner = child(&middle);

        assert_eq!(
            Environment::get_at(&inner, 1, "a"),
            Value::Number(2.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 2, "a"),
            Value::Number(1.0)
        );
    }

    #[test]
    fn assign_at_writes_the_exact_frame() {
        let globals = frame();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let middle = child(&globals);
        middle.borrow_mut().define("a", Value::Number(2.0));
        let inner = child(&middle);

        Environment::assign_at(&inner, 2, "a", Value::Number(9.0));

        assert_eq!(globals.borrow().get("a", 1).unwrap(), Value::Number(9.0));
        assert_eq!(Environment::get_at(&inner, 1, "a"), Value::Number(2.0));
    }

    #[test]
    fn frames_are_shared_not_copied() {
        // two children of one frame observe each other's writes to it
        let shared = frame();
        shared.borrow_mut().define("count", Value::Number(0.0));
        let left = child(&shared);
        let right = child(&shared);

        left.borrow_mut()
            .assign("count", Value::Number(1.0), 1)
            .unwrap();

        assert_eq!(
            Environment::get_at(&right, 1, "count"),
            Value::Number(1.0)
        );
    }
}
