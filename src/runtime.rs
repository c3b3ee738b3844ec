use log::{debug, trace};
use rust_decimal::Decimal;
use std::{
    cell::Cell,
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

use crate::{
    environment::Environment,
    error::{operator_type_error, Error, Result},
    native::{HostValue, NativeHandle, PropertyError},
    parser::{parse, BinaryOp, Block, Expression, IdentifierRef, Statement, UnaryOp},
    stack::ensure_sufficient_stack,
};

/// Deepest chain of active script function calls.
pub const MAX_CALL_DEPTH: usize = 1000;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One active script call. The depth counter drops back when the frame does, including
/// when the call fails.
struct CallFrame;

impl CallFrame {
    fn enter(name: &str) -> Result<CallFrame> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(Error::CallDepth {
                    name: name.to_string(),
                    limit: MAX_CALL_DEPTH,
                });
            }
            depth.set(depth.get() + 1);
            Ok(CallFrame)
        })
    }
}

impl Drop for CallFrame {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Clone)]
pub enum Value {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Function(Rc<Function>),
    NativeObject(NativeHandle),
    /// Interpreter bookkeeping. Never handed to script code.
    Internal(Sentinel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// The statement did not produce a function result.
    NoReturn,
    /// A function call finished without producing a result.
    Void,
}

const NO_RETURN: Value = Value::Internal(Sentinel::NoReturn);

impl Display for Sentinel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::NoReturn => write!(f, "NoReturn"),
            Sentinel::Void => write!(f, "Void"),
        }
    }
}

pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Block>,
    pub closure: Environment,
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<func:{}({})>", self.name, self.params.join(", "))
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Boolean(_) => "Boolean",
            Value::Function(_) => "Function",
            Value::NativeObject(_) => "NativeObject",
            Value::Internal(_) => "InternalValue",
        }
    }

    /// Only `Boolean(false)` is falsy. Sentinels have no truth value.
    pub fn is_truthy(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Internal(sentinel) => {
                Err(Error::Internal(format!("{} has no truth value", sentinel)))
            }
            _ => Ok(true),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeObject(a), Value::NativeObject(b)) => a.ptr_eq(b),
            (Value::Internal(a), Value::Internal(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Function(function) => write!(f, "<func:{}>", function.name),
            Value::NativeObject(handle) => write!(f, "<object:{}>", handle.type_name()),
            Value::Internal(sentinel) => write!(f, "{}", sentinel),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Value::String(s) = self {
            write!(f, "\"{}\"", s)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Parses and runs a whole program. Returns `None` when the program produced no value.
pub fn run(source: &str, env: &Environment) -> Result<Option<Value>> {
    let program = parse(source)?;
    match execute_block(&program, env)? {
        Value::Internal(_) => Ok(None),
        value => Ok(Some(value)),
    }
}

/// Runs statements in order. The first statement that yields something other than
/// `NoReturn` ends the block and becomes its result.
pub fn execute_block(block: &Block, env: &Environment) -> Result<Value> {
    for statement in &block.statements {
        let result = execute(statement, env)?;
        if !matches!(result, Value::Internal(Sentinel::NoReturn)) {
            return Ok(result);
        }
    }
    Ok(NO_RETURN)
}

pub fn execute(statement: &Statement, env: &Environment) -> Result<Value> {
    ensure_sufficient_stack(|| execute_statement(statement, env))
}

fn execute_statement(statement: &Statement, env: &Environment) -> Result<Value> {
    match statement {
        Statement::Const { name, initializer } => {
            let value = evaluate_value(initializer, env)?;
            debug!("const {} = {:?}", name, value);
            env.declare_constant(name, value)?;
            Ok(NO_RETURN)
        }
        Statement::Var { name, initializer } => {
            let value = evaluate_value(initializer, env)?;
            debug!("var {} = {:?}", name, value);
            env.declare(name, value)?;
            Ok(NO_RETURN)
        }
        Statement::Set { target, value } => {
            let value = evaluate_value(value, env)?;
            if target.properties.is_empty() {
                env.assign(&target.name, value)?;
            } else {
                let (owner, property) = resolve_owner(target, env)?;
                owner
                    .set_property(property, &value)
                    .map_err(|err| match err {
                        PropertyError::NotFound => Error::PropertyNotFound {
                            object: target.name.clone(),
                            property: property.to_string(),
                        },
                        PropertyError::Rejected => Error::PropertyAssignment {
                            target: target.to_string(),
                            type_name: value.type_name().to_string(),
                        },
                    })?;
            }
            Ok(NO_RETURN)
        }
        Statement::Func { name, params, body } => {
            let function = Function {
                name: name.clone(),
                params: params.clone(),
                body: Rc::clone(body),
                closure: env.clone(),
            };
            debug!("func {}({})", name, params.join(", "));
            env.declare(name, Value::Function(Rc::new(function)))?;
            Ok(NO_RETURN)
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let branch = if evaluate_value(condition, env)?.is_truthy()? {
                Some(then_branch)
            } else {
                else_branch.as_ref()
            };
            match branch {
                Some(block) => execute_block(block, &env.child()),
                None => Ok(NO_RETURN),
            }
        }
        Statement::Expression(expr) => match evaluate(expr, env)? {
            Value::Internal(_) => Ok(NO_RETURN),
            value => Ok(value),
        },
    }
}

/// Evaluates an expression. The result is `Void` when the expression is a call to a
/// function that returned nothing; use `evaluate_value` where a real value is required.
pub fn evaluate(expr: &Expression, env: &Environment) -> Result<Value> {
    ensure_sufficient_stack(|| evaluate_expression(expr, env))
}

fn evaluate_expression(expr: &Expression, env: &Environment) -> Result<Value> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Identifier(reference) if reference.properties.is_empty() => {
            env.lookup(&reference.name)
        }
        Expression::Identifier(reference) => {
            let (owner, property) = resolve_owner(reference, env)?;
            let host_value = owner
                .get_property(property)
                .ok_or_else(|| property_not_found(&reference.name, property))?;
            Value::try_from(host_value)
        }
        Expression::Call { name, arguments } => call_function(name, arguments, env),
        Expression::Unary { operator, operand } => {
            let operand = evaluate_value(operand, env)?;
            evaluate_unary(*operator, operand)
        }
        Expression::Binary {
            left,
            operator,
            right,
        } => {
            // Both sides are always evaluated, `and`/`or` included.
            let left = evaluate_value(left, env)?;
            let right = evaluate_value(right, env)?;
            evaluate_binary(*operator, left, right)
        }
    }
}

fn evaluate_value(expr: &Expression, env: &Environment) -> Result<Value> {
    match evaluate(expr, env)? {
        Value::Internal(_) => Err(Error::NoValue(format!("'{}'", expr))),
        value => Ok(value),
    }
}

fn property_not_found(object: &str, property: &str) -> Error {
    Error::PropertyNotFound {
        object: object.to_string(),
        property: property.to_string(),
    }
}

// Walks every property but the last, returning the object that owns the last one.
fn resolve_owner<'r>(
    reference: &'r IdentifierRef,
    env: &Environment,
) -> Result<(NativeHandle, &'r str)> {
    let Some((last, intermediate)) = reference.properties.split_last() else {
        return Err(Error::Internal(format!(
            "'{}' has no property path",
            reference.name
        )));
    };

    let mut owner = match env.lookup(&reference.name)? {
        Value::NativeObject(handle) => handle,
        _ => return operator_type_error(".", "native object"),
    };

    for property in intermediate {
        owner = match owner.get_property(property) {
            Some(HostValue::Object(handle)) => handle,
            Some(_) => return operator_type_error(".", "native object"),
            None => return Err(property_not_found(&reference.name, property)),
        };
    }

    Ok((owner, last.as_str()))
}

fn call_function(name: &str, arguments: &[Expression], env: &Environment) -> Result<Value> {
    let function = match env.lookup(name)? {
        Value::Function(function) => function,
        _ => return operator_type_error("function call", "function"),
    };

    if function.params.len() != arguments.len() {
        return Err(Error::Arity {
            name: name.to_string(),
            expected: function.params.len(),
            found: arguments.len(),
        });
    }

    // Arguments are evaluated in the caller's scope; the body runs in a child of the
    // function's defining scope.
    let mut evaluated = Vec::with_capacity(arguments.len());
    for argument in arguments {
        evaluated.push(evaluate_value(argument, env)?);
    }

    let _frame = CallFrame::enter(name)?;
    trace!("call {}({:?})", name, evaluated);
    let call_env = function.closure.child();
    for (param, argument) in function.params.iter().zip(evaluated) {
        call_env.declare(param, argument)?;
    }

    match execute_block(&function.body, &call_env)? {
        Value::Internal(Sentinel::NoReturn) => Ok(Value::Internal(Sentinel::Void)),
        value => Ok(value),
    }
}

fn evaluate_unary(operator: UnaryOp, operand: Value) -> Result<Value> {
    match operator {
        UnaryOp::Plus => match operand {
            Value::Number(n) => Ok(Value::Number(n)),
            _ => operator_type_error("+ (unary)", "number"),
        },
        UnaryOp::Negate => match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => operator_type_error("- (unary)", "number"),
        },
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy()?)),
    }
}

fn evaluate_binary(operator: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match operator {
        BinaryOp::And => {
            if left.is_truthy()? && right.is_truthy()? {
                Ok(right)
            } else {
                Ok(Value::Boolean(false))
            }
        }
        BinaryOp::Or => {
            if left.is_truthy()? {
                Ok(left)
            } else if right.is_truthy()? {
                Ok(right)
            } else {
                Ok(Value::Boolean(false))
            }
        }
        BinaryOp::Equal => Ok(Value::Boolean(left == right)),
        BinaryOp::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOp::Less | BinaryOp::Greater => compare(operator, &left, &right),
        BinaryOp::Add => arithmetic(operator, &left, &right, Decimal::checked_add),
        BinaryOp::Subtract => arithmetic(operator, &left, &right, Decimal::checked_sub),
        BinaryOp::Multiply => arithmetic(operator, &left, &right, Decimal::checked_mul),
        BinaryOp::Divide => match (&left, &right) {
            (Value::Number(_), Value::Number(divisor)) if divisor.is_zero() => {
                Err(Error::DivisionByZero)
            }
            _ => arithmetic(operator, &left, &right, Decimal::checked_div),
        },
    }
}

fn arithmetic(
    operator: BinaryOp,
    left: &Value,
    right: &Value,
    op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => op(*a, *b)
            .map(Value::Number)
            .ok_or_else(|| Error::Overflow(operator.symbol().to_string())),
        _ => operator_type_error(operator.symbol(), "number"),
    }
}

fn compare(operator: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => return operator_type_error(operator.symbol(), "number or string"),
    };
    match operator {
        BinaryOp::Less => Ok(Value::Boolean(ordering.is_lt())),
        _ => Ok(Value::Boolean(ordering.is_gt())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeObject;
    use std::cell::Cell;

    fn number(n: i64) -> Value {
        Value::Number(Decimal::from(n))
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn eval(source: &str) -> Result<Option<Value>> {
        run(source, &Environment::new())
    }

    #[test]
    fn test_basic_arithmetic() -> Result<()> {
        let env = Environment::new();
        run("const x = 2 + 3 * 4", &env)?;
        assert_eq!(env.lookup("x")?, number(14));

        assert_eq!(eval("10 - 2 - 3")?, Some(number(5)));
        assert_eq!(eval("(2 + 3) * 4")?, Some(number(20)));
        assert_eq!(eval("- 4 + + 1")?, Some(number(-3)));
        Ok(())
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() -> Result<()> {
        assert_eq!(eval("0.1 + 0.2 = 0.3")?, Some(Value::Boolean(true)));
        assert_eq!(eval("7 / 2")?, Some(Value::Number(Decimal::new(35, 1))));
        Ok(())
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(eval("1 / 0"), Err(Error::DivisionByZero)));
        assert!(matches!(eval("1 / (2 - 2)"), Err(Error::DivisionByZero)));
    }

    #[test]
    fn test_overflow() {
        let source = "var big = 79228162514264337593543950335 big * 2";
        assert!(matches!(eval(source), Err(Error::Overflow(op)) if op == "*"));
    }

    #[test]
    fn test_arithmetic_type_errors() {
        assert!(matches!(eval("1 + \"a\""), Err(Error::OperatorType { .. })));
        assert!(matches!(eval("\"a\" * 2"), Err(Error::OperatorType { .. })));
        assert!(matches!(eval("- \"a\""), Err(Error::OperatorType { .. })));
        assert!(matches!(eval("+ (1 = 1)"), Err(Error::OperatorType { .. })));
    }

    #[test]
    fn test_equality() -> Result<()> {
        assert_eq!(eval("1 = 1")?, Some(Value::Boolean(true)));
        assert_eq!(eval("1 = \"1\"")?, Some(Value::Boolean(false)));
        assert_eq!(eval("\"a\" = \"a\"")?, Some(Value::Boolean(true)));
        assert_eq!(eval("1.50 = 1.5")?, Some(Value::Boolean(true)));
        assert_eq!(eval("1 <> 2")?, Some(Value::Boolean(true)));
        assert_eq!(eval("(1 = 1) = (2 = 2)")?, Some(Value::Boolean(true)));
        Ok(())
    }

    #[test]
    fn test_function_equality_is_identity() -> Result<()> {
        let source = "func f() { 1 } func g() { 1 } const h = f";
        let env = Environment::new();
        run(source, &env)?;
        assert_eq!(run("f = h", &env)?, Some(Value::Boolean(true)));
        assert_eq!(run("f = g", &env)?, Some(Value::Boolean(false)));
        Ok(())
    }

    #[test]
    fn test_comparisons() -> Result<()> {
        assert_eq!(eval("1 < 2")?, Some(Value::Boolean(true)));
        assert_eq!(eval("2.5 > 3")?, Some(Value::Boolean(false)));
        assert_eq!(eval("\"apple\" < \"banana\"")?, Some(Value::Boolean(true)));
        assert!(matches!(eval("1 < \"2\""), Err(Error::OperatorType { .. })));
        Ok(())
    }

    #[test]
    fn test_boolean_operators() -> Result<()> {
        assert_eq!(eval("1 and 2")?, Some(number(2)));
        assert_eq!(eval("(1 = 2) and 2")?, Some(Value::Boolean(false)));
        assert_eq!(eval("1 or 2")?, Some(number(1)));
        assert_eq!(eval("(1 = 2) or 2")?, Some(number(2)));
        assert_eq!(eval("(1 = 2) or (1 = 3)")?, Some(Value::Boolean(false)));
        assert_eq!(eval("not (1 = 2)")?, Some(Value::Boolean(true)));
        assert_eq!(eval("not 0")?, Some(Value::Boolean(false)));
        assert_eq!(eval("not \"\"")?, Some(Value::Boolean(false)));
        Ok(())
    }

    #[test]
    fn test_boolean_operators_are_eager() -> Result<()> {
        let source = "
            var calls = 0
            func touch() { set calls = calls + 1 1 }
            var a = 1 or touch()
            var b = (1 = 2) and touch()
            calls
        ";
        assert_eq!(eval(source)?, Some(number(2)));
        Ok(())
    }

    #[test]
    fn test_variable_binding() -> Result<()> {
        assert_eq!(eval("var x = 10 set x = 20 x")?, Some(number(20)));
        assert_eq!(eval("var x = 1 var y = 2 x + y")?, Some(number(3)));
        assert!(matches!(eval("x"), Err(Error::UnboundIdentifier(_))));
        assert!(matches!(eval("set x = 1"), Err(Error::UnboundIdentifier(_))));
        assert!(matches!(eval("var x = 1 var x = 2"), Err(Error::DuplicateBinding(_))));
        assert!(matches!(eval("const x = 1 func x() { }"), Err(Error::DuplicateBinding(_))));
        Ok(())
    }

    #[test]
    fn test_const_is_enforced() -> Result<()> {
        assert!(matches!(
            eval("const x = 1 set x = 2"),
            Err(Error::ConstantAssignment(_))
        ));
        let source = "const x = 1 func f() { var x = 2 set x = 3 x } f()";
        assert_eq!(eval(source)?, Some(number(3)));
        Ok(())
    }

    #[test]
    fn test_function_definition_and_call() -> Result<()> {
        assert_eq!(eval("func add(a, b) { a + b } add(3, 4)")?, Some(number(7)));
        assert_eq!(eval("func seven() { 7 } seven()")?, Some(number(7)));
        Ok(())
    }

    #[test]
    fn test_function_without_result_is_void() -> Result<()> {
        let env = Environment::new();
        run("var log = 0 func bump() { set log = log + 1 }", &env)?;
        assert_eq!(run("bump()", &env)?, None);
        assert_eq!(run("bump() bump() log", &env)?, Some(number(3)));
        assert!(matches!(run("var x = bump()", &env), Err(Error::NoValue(_))));
        assert!(matches!(run("bump() + 1", &env), Err(Error::NoValue(_))));
        Ok(())
    }

    #[test]
    fn test_first_value_ends_block() -> Result<()> {
        let source = "
            var hits = 0
            func early() { 1 set hits = 99 }
            early()
            hits
        ";
        assert_eq!(eval(source)?, Some(number(1)));
        let env = Environment::new();
        run("var hits = 0 func early() { 1 set hits = 99 }", &env)?;
        run("var ignored = early()", &env)?;
        assert_eq!(env.lookup("hits")?, number(0));
        Ok(())
    }

    #[test]
    fn test_lexical_scoping() -> Result<()> {
        let source = "
            var x = 1
            func read() { x }
            func caller() { var x = 2 read() }
            caller()
        ";
        assert_eq!(eval(source)?, Some(number(1)));
        Ok(())
    }

    #[test]
    fn test_closures_outlive_their_call() -> Result<()> {
        let env = Environment::new();
        run("func make(n) { func get() { n } get }", &env)?;
        run("const five = make(5) const six = make(6)", &env)?;
        assert_eq!(run("five()", &env)?, Some(number(5)));
        assert_eq!(run("six()", &env)?, Some(number(6)));
        Ok(())
    }

    #[test]
    fn test_closures_see_later_mutation() -> Result<()> {
        let source = "
            var count = 0
            func current() { count }
            set count = 5
            current()
        ";
        assert_eq!(eval(source)?, Some(number(5)));
        Ok(())
    }

    #[test]
    fn test_recursion() -> Result<()> {
        let source = "
            func factorial(n) {
                if n = 0 then 1 else n * factorial(n - 1) end
            }
            factorial(10)
        ";
        assert_eq!(eval(source)?, Some(number(3628800)));
        Ok(())
    }

    #[test]
    fn test_runaway_recursion_is_an_error() -> Result<()> {
        let env = Environment::new();
        run("func down(n) { if n = 0 then 0 else down(n - 1) end }", &env)?;

        assert!(matches!(
            run("down(100000)", &env),
            Err(Error::CallDepth { name, limit: MAX_CALL_DEPTH }) if name == "down"
        ));
        // The failed call unwound every frame, so the full depth is available again.
        assert_eq!(run("down(900)", &env)?, Some(number(0)));
        assert!(matches!(
            eval("func forever() { forever() } forever()"),
            Err(Error::CallDepth { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_long_operator_chain_evaluates() -> Result<()> {
        let source = format!("0{}", " + 1".repeat(5_000));
        assert_eq!(eval(&source)?, Some(number(5_000)));
        Ok(())
    }

    #[test]
    fn test_arity_mismatch() {
        let result = eval("func pair(a, b) { a } pair(1)");
        assert!(matches!(
            result,
            Err(Error::Arity { expected: 2, found: 1, .. })
        ));
        assert!(matches!(eval("func none() { } none(1)"), Err(Error::Arity { .. })));
    }

    #[test]
    fn test_calling_a_non_function() {
        assert!(matches!(eval("var f = 1 f()"), Err(Error::OperatorType { .. })));
        assert!(matches!(eval("missing()"), Err(Error::UnboundIdentifier(_))));
    }

    #[test]
    fn test_if_statement() -> Result<()> {
        assert_eq!(eval("if 1 = 1 then 10 else 20 end")?, Some(number(10)));
        assert_eq!(eval("if 1 = 2 then 10 else 20 end")?, Some(number(20)));
        assert_eq!(eval("if 1 = 2 then 10 end")?, None);
        // Each branch gets its own scope.
        assert_eq!(eval("var x = 1 if x then var x = 2 end x")?, Some(number(1)));
        Ok(())
    }

    #[test]
    fn test_truthiness() -> Result<()> {
        assert!(!Value::Boolean(false).is_truthy()?);
        assert!(Value::Boolean(true).is_truthy()?);
        assert!(number(0).is_truthy()?);
        assert!(string("").is_truthy()?);
        assert!(matches!(
            Value::Internal(Sentinel::NoReturn).is_truthy(),
            Err(Error::Internal(_))
        ));
        Ok(())
    }

    #[test]
    fn test_partial_effects_remain_after_failure() -> Result<()> {
        let env = Environment::new();
        assert!(run("var a = 1 var b = a + \"x\"", &env).is_err());
        assert_eq!(env.lookup("a")?, number(1));
        assert!(env.lookup("b").is_err());
        Ok(())
    }

    struct Point {
        x: i32,
        label: String,
        origin: Option<NativeHandle>,
        writes: Rc<Cell<u32>>,
    }

    impl NativeObject for Point {
        fn type_name(&self) -> &str {
            "Point"
        }

        fn get_property(&self, name: &str) -> Option<HostValue> {
            match name {
                "x" => Some(self.x.into()),
                "label" => Some(self.label.as_str().into()),
                "visible" => Some(true.into()),
                "origin" => self.origin.clone().map(HostValue::Object),
                "raw" => Some(HostValue::Opaque("Vec<u8>".to_string())),
                _ => None,
            }
        }

        fn set_property(
            &mut self,
            name: &str,
            value: &Value,
        ) -> std::result::Result<(), PropertyError> {
            self.writes.set(self.writes.get() + 1);
            match (name, value) {
                ("label", Value::String(s)) => {
                    self.label = s.clone();
                    Ok(())
                }
                ("label", _) | ("x", _) => Err(PropertyError::Rejected),
                _ => Err(PropertyError::NotFound),
            }
        }
    }

    fn point(label: &str, origin: Option<NativeHandle>) -> (NativeHandle, Rc<Cell<u32>>) {
        let writes = Rc::new(Cell::new(0));
        let handle = NativeHandle::new(Point {
            x: 3,
            label: label.to_string(),
            origin,
            writes: Rc::clone(&writes),
        });
        (handle, writes)
    }

    fn host_env() -> Result<(Environment, Rc<Cell<u32>>)> {
        let (origin, _) = point("origin", None);
        let (p, writes) = point("p", Some(origin));
        let env = Environment::new();
        env.declare("p", Value::NativeObject(p))?;
        Ok((env, writes))
    }

    #[test]
    fn test_native_property_reads() -> Result<()> {
        let (env, _) = host_env()?;
        assert_eq!(run("p.x + 1", &env)?, Some(number(4)));
        assert_eq!(run("p.label", &env)?, Some(string("p")));
        assert_eq!(run("p.visible", &env)?, Some(Value::Boolean(true)));
        assert_eq!(run("p.origin.label", &env)?, Some(string("origin")));
        assert!(matches!(run("p.origin", &env)?, Some(Value::NativeObject(_))));
        Ok(())
    }

    #[test]
    fn test_native_property_read_failures() -> Result<()> {
        let (env, _) = host_env()?;
        assert!(matches!(
            run("p.missing", &env),
            Err(Error::PropertyNotFound { property, .. }) if property == "missing"
        ));
        assert!(matches!(run("p.origin.origin.x", &env), Err(Error::PropertyNotFound { .. })));
        assert!(matches!(run("p.x.y", &env), Err(Error::OperatorType { .. })));
        assert!(matches!(run("p.raw", &env), Err(Error::Conversion(_))));
        assert!(matches!(run("var n = 1 n.x", &env), Err(Error::OperatorType { .. })));
        Ok(())
    }

    #[test]
    fn test_native_property_writes() -> Result<()> {
        let (env, writes) = host_env()?;
        run("set p.label = \"moved\"", &env)?;
        assert_eq!(run("p.label", &env)?, Some(string("moved")));
        run("set p.origin.label = \"home\"", &env)?;
        assert_eq!(run("p.origin.label", &env)?, Some(string("home")));
        assert_eq!(writes.get(), 1);

        assert!(matches!(
            run("set p.label = 5", &env),
            Err(Error::PropertyAssignment { target, type_name })
                if target == "p.label" && type_name == "Number"
        ));
        assert!(matches!(run("set p.nope = 5", &env), Err(Error::PropertyNotFound { .. })));
        assert!(matches!(run("set p.gone.x = 5", &env), Err(Error::PropertyNotFound { .. })));
        assert!(matches!(
            run("var q = 1 set q.x = 5", &env),
            Err(Error::OperatorType { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_native_identity_equality() -> Result<()> {
        let (env, _) = host_env()?;
        run("const alias = p", &env)?;
        assert_eq!(run("alias = p", &env)?, Some(Value::Boolean(true)));
        assert_eq!(run("p.origin = p", &env)?, Some(Value::Boolean(false)));
        Ok(())
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", number(42)), "42");
        assert_eq!(format!("{}", Value::Number(Decimal::new(250, 2))), "2.50");
        assert_eq!(format!("{}", string("hello")), "hello");
        assert_eq!(format!("{:?}", string("hello")), "\"hello\"");
        assert_eq!(format!("{}", Value::Boolean(true)), "true");
        assert_eq!(format!("{}", Value::Internal(Sentinel::Void)), "Void");
    }
}
