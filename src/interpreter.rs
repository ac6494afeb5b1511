use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::environment::Environment;
use crate::error::{Result, RillError};
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, Value};

/// Non-local exits travel on the `Err` channel.  Loops consume
/// `Break`/`Continue`, function calls consume `Return`, and `Error` unwinds
/// all the way to the driver.  Nothing else catches, so a `break` nested in
/// blocks or conditionals reaches the enclosing loop.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Break,
    Continue,
    Error(RillError),
}

impl From<RillError> for Unwind {
    fn from(error: RillError) -> Self {
        Unwind::Error(error)
    }
}

type Exec<T> = std::result::Result<T, Unwind>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Resolver-recorded lexical distances, keyed by expression identity.
    /// An absent entry means the expression refers to a global.
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Build an interpreter whose `print` writes to the given sink.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        {
            let mut env = globals.borrow_mut();
            env.define(
                "clock",
                Value::NativeFunction {
                    name: "clock",
                    arity: 0,
                    func: native_clock,
                },
            );
            env.define(
                "print",
                Value::NativeFunction {
                    name: "print",
                    arity: 1,
                    func: native_print,
                },
            );
            env.define(
                "readLine",
                Value::NativeFunction {
                    name: "readLine",
                    arity: 0,
                    func: native_read_line,
                },
            );
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Resolver callback: this expression is a local at the given depth.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program.  Stray non-local exits cannot occur in
    /// programs the parser accepted; they degrade to runtime errors here.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => return Err(e),

                Err(Unwind::Return(_)) => {
                    return Err(RillError::runtime(0, "'return' outside of function"))
                }

                Err(Unwind::Break) => {
                    return Err(RillError::runtime(0, "'break' outside of a loop"))
                }

                Err(Unwind::Continue) => {
                    return Err(RillError::runtime(0, "'continue' outside of a loop"))
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Let { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                loop {
                    if !is_truthy(&self.evaluate(condition)?) {
                        break;
                    }

                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Unwind::Break) => break,
                        Err(Unwind::Continue) => {}
                        Err(other) => return Err(other),
                    }

                    // The desugared `for` increment runs after the body and
                    // after `continue`, never after `break`.
                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }

                Ok(())
            }

            Stmt::Function(decl) => {
                let function = Function {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Class { name, methods } => self.execute_class(name, methods),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Break(_) => Err(Unwind::Break),

            Stmt::Continue(_) => Err(Unwind::Continue),
        }
    }

    /// Run statements in the given environment, restoring the previous one
    /// on every exit path, including unwinds.
    fn execute_block(&mut self, statements: &[Stmt], env: Rc<RefCell<Environment>>) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, env);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(&mut self, name: &Token, methods: &[Rc<FunctionDecl>]) -> Exec<()> {
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let mut method_map: HashMap<String, Rc<Function>> = HashMap::new();
        let mut statics: Vec<Function> = Vec::new();

        for decl in methods {
            let function = Function {
                decl: Rc::clone(decl),
                closure: Rc::clone(&self.environment),
                is_initializer: decl.name.lexeme == "init" && !decl.is_static,
            };

            if decl.is_static {
                statics.push(function);
            } else {
                method_map.insert(decl.name.lexeme.clone(), Rc::new(function));
            }
        }

        let class = Rc::new(Class {
            name: name.lexeme.clone(),
            methods: method_map,
            fields: RefCell::new(HashMap::new()),
        });

        // Static methods become fields on the class value itself, each bound
        // so its `this` is the class.
        for function in statics {
            let bound = function.bind(Value::Class(Rc::clone(&class)));
            class.fields.borrow_mut().insert(
                bound.decl.name.lexeme.clone(),
                Value::Function(Rc::new(bound)),
            );
        }

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let value = self.evaluate(right)?;

                Ok(self.evaluate_unary(operator, value)?)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;

                Ok(self.evaluate_binary(left_val, operator, right_val)?)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),
                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => Ok(self.look_up_variable(*id, name)?),

            Expr::This { id, keyword } => Ok(self.look_up_variable(*id, keyword)?),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => Environment::assign_at(
                        &self.environment,
                        *distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, args, paren)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                Ok(self.evaluate_get(object, name)?)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        instance
                            .borrow_mut()
                            .fields
                            .insert(name.lexeme.clone(), value.clone());

                        Ok(value)
                    }

                    Value::Class(class) => {
                        let value = self.evaluate(value)?;

                        class
                            .fields
                            .borrow_mut()
                            .insert(name.lexeme.clone(), value.clone());

                        Ok(value)
                    }

                    _ => Err(RillError::runtime(name.line, "Only instances have fields.").into()),
                }
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => {
                Environment::get_at(&self.environment, *distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&self, op: &Token, value: Value) -> Result<Value> {
        match op.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(RillError::runtime(op.line, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(RillError::runtime(op.line, "Invalid unary operator.")),
        }
    }

    /// Both operands are already evaluated, left before right.
    fn evaluate_binary(&self, left: Value, op: &Token, right: Value) -> Result<Value> {
        match op.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // String concatenation coerces the other side to its
                // display form.
                (l, r) if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                    Ok(Value::Str(format!("{}{}", l, r)))
                }

                _ => Err(RillError::runtime(
                    op.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            // Division by zero follows IEEE-754 float semantics.
            TokenType::SLASH => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),

            TokenType::LESS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(RillError::runtime(op.line, "Operands must be numbers.")),
            },

            _ => Err(RillError::runtime(op.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_get(&self, object: Value, name: &Token) -> Result<Value> {
        match object {
            Value::Instance(instance) => {
                // Own fields shadow class methods.
                let field = instance.borrow().fields.get(&name.lexeme).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }

                let class = instance.borrow().class.clone();
                if let Some(class) = class {
                    if let Some(method) = class.find_method(&name.lexeme) {
                        let bound = method.bind(Value::Instance(Rc::clone(&instance)));
                        return Ok(Value::Function(Rc::new(bound)));
                    }
                }

                Err(undefined_property(name))
            }

            // Statics were stored as fields on the class at construction.
            Value::Class(class) => {
                let field = class.fields.borrow().get(&name.lexeme).cloned();
                field.ok_or_else(|| undefined_property(name))
            }

            _ => Err(RillError::runtime(
                name.line,
                "Only instances have properties.",
            )),
        }
    }

    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> Exec<Value> {
        match callee {
            Value::NativeFunction { arity, func, .. } => {
                check_arity(arity, arguments.len(), paren)?;

                Ok(func(self, &arguments)?)
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                self.call_function(&function, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                self.instantiate(&class, arguments)
            }

            _ => Err(RillError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }

    fn call_function(&mut self, function: &Function, arguments: Vec<Value>) -> Exec<Value> {
        let mut env = Environment::with_enclosing(Rc::clone(&function.closure));

        for (param, arg) in function.decl.params.iter().zip(arguments) {
            env.define(&param.lexeme, arg);
        }

        let result = self.execute_block(&function.decl.body, Rc::new(RefCell::new(env)));

        match result {
            Ok(()) => {
                if function.is_initializer {
                    Ok(self.initializer_this(function)?)
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                // An initializer always yields its instance, even through a
                // bare `return;`.
                if function.is_initializer {
                    Ok(self.initializer_this(function)?)
                } else {
                    Ok(value)
                }
            }

            Err(Unwind::Break) => Err(RillError::runtime(
                function.decl.name.line,
                "'break' outside of a loop",
            )
            .into()),

            Err(Unwind::Continue) => Err(RillError::runtime(
                function.decl.name.line,
                "'continue' outside of a loop",
            )
            .into()),

            Err(err) => Err(err),
        }
    }

    fn initializer_this(&self, function: &Function) -> Result<Value> {
        Environment::get_at(&function.closure, 0, "this", function.decl.name.line)
    }

    fn instantiate(&mut self, class: &Rc<Class>, arguments: Vec<Value>) -> Exec<Value> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        if let Some(init) = class.find_method("init") {
            let bound = init.bind(Value::Instance(Rc::clone(&instance)));
            self.call_function(&bound, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Only `nil` and `false` are falsey.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,

        (Value::Bool(a), Value::Bool(b)) => a == b,

        // IEEE-754: NaN is not equal to itself.
        (Value::Number(a), Value::Number(b)) => a == b,

        (Value::Str(a), Value::Str(b)) => a == b,

        (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => a == b,

        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),

        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),

        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),

        _ => false,
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),

        LiteralValue::Str(s) => Value::Str(s.clone()),

        LiteralValue::True => Value::Bool(true),

        LiteralValue::False => Value::Bool(false),

        LiteralValue::Nil => Value::Nil,
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(RillError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ))
    }
}

fn undefined_property(name: &Token) -> RillError {
    RillError::runtime(
        name.line,
        format!("Undefined property '{}'.", name.lexeme),
    )
}

fn native_clock(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    Ok(Value::Number(now.as_millis() as f64))
}

fn native_print(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if let Some(value) = args.first() {
        writeln!(interpreter.output, "{}", value)?;
    }

    Ok(Value::Nil)
}

fn native_read_line(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value> {
    let mut line = String::new();

    let bytes = io::stdin().read_line(&mut line)?;

    if bytes == 0 {
        return Ok(Value::Nil);
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(Value::Str(line))
}
