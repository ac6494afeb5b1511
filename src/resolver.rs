//! Static resolution pass for the Rill interpreter.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<&str,bool>` tracking declared
//!    (false) and fully defined (true) names in each nested block or function.
//! 2. **Enforce static rules**: reports errors such as redeclaration in the same scope,
//!    reading a variable in its own initializer, invalid `return` values in initializers,
//!    and illegal use of `this` outside of class methods.
//! 3. **Record binding distances**: for every variable occurrence (`Expr::Variable`,
//!    `Expr::Assign`, or `Expr::This`), calls back into the interpreter to note whether
//!    it is a local (and at what depth) or a global. This enables the runtime to perform
//!    lookups by climbing exactly the right number of environment frames.
//!
//! # Workflow Overview
//!
//! 1. **Instantiation** (`Resolver::new`)
//!    - Captures a mutable reference to the `Interpreter`, where binding distances will be recorded.
//!    - Initializes empty scope stack and function/class context flags.
//!
//! 2. **Resolution Entry Point** (`resolve(&[Stmt])`)
//!    - Walks each top-level statement via `resolve_stmt`, propagating errors.
//!
//! 3. **Statement Resolution** (`resolve_stmt`)
//!    - Declares and defines names for `let`, `fun`, and `class` declarations.
//!    - Handles nested scopes for blocks and the bodies of `if` and `while` statements.
//!    - Manages `return` validity depending on whether inside a function or initializer.
//!    - Injects `this` in class method scopes.
//!
//! 4. **Expression Resolution** (`resolve_expr`)
//!    - Recursively descends into expression nodes.
//!    - For variable reads and assignments, ensures no forward-read in initializers and
//!      calls `resolve_local`.
//!
//! 5. **Error Recovery**
//!    - No in-place recovery: resolution halts on the first static error, returning a
//!      `RillError::Resolve` for the driver to report.
//!
//! After parsing, before interpretation, invoke `resolve` on the accepted
//! statements; execution must be skipped if it fails.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Result, RillError};
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body are we inside?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration
    Class,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &'a [Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Class { name, methods } => {
                // 1. Declare & define the class name so methods can refer to it
                self.declare(name)?;
                self.define(name);

                // 2. Save and enter the class context
                let enclosing_class: ClassType = self.current_class;
                self.current_class = ClassType::Class;

                // 3. Open the implicit `this` scope for methods
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                // 4. Resolve each method in its own function context
                for method in methods {
                    let kind = if method.name.lexeme == "init" && !method.is_static {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(kind, method)?;
                }

                // 5. Close the `this` scope
                self.end_scope();

                // 6. Restore the outer class context
                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                // 1. Push a new anonymous scope for `{ ... }`
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                // 2. Pop the block scope
                self.end_scope();
            }

            Stmt::Let { name, initializer } => {
                // 1. Declare the variable name (marked but not yet defined)
                self.declare(name)?;

                // 2. Resolve the initializer expression, if any
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                // 3. Define the variable so it is available in this scope
                self.define(name);
            }

            Stmt::Function(decl) => {
                // 1. Declare the function name (so it is visible inside its own body)
                self.declare(&decl.name)?;

                // 2. Define it immediately (allow recursion)
                self.define(&decl.name);

                // 3. Resolve the parameters and body under a normal function context
                self.resolve_function(FunctionType::Function, decl)?;
            }

            Stmt::Expression(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                // 1. Resolve the condition expression
                self.resolve_expr(condition)?;

                // 2. Resolve the 'then' branch
                self.resolve_stmt(then_branch)?;

                // 3. Resolve the 'else' branch, if present
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                // 1. Resolve the loop condition
                self.resolve_expr(condition)?;

                // 2. Resolve the loop body
                self.resolve_stmt(body)?;

                // 3. Resolve the desugared `for` increment, if present
                if let Some(inc) = increment {
                    self.resolve_expr(inc)?;
                }
            }

            Stmt::Return { keyword, value } => {
                // 1. Ensure we're inside a function, method, or initializer
                if self.current_function == FunctionType::None {
                    return Err(RillError::resolve_at(
                        keyword,
                        "'return' used outside of function",
                    ));
                }

                // 2. In an initializer, only bare `return;` is allowed
                if self.current_function == FunctionType::Initializer {
                    if value.is_some() {
                        return Err(RillError::resolve_at(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }
                } else if let Some(expr) = value {
                    // 3. Normal function: resolve the return expression
                    self.resolve_expr(expr)?;
                }
            }

            // Loop exits carry no names to resolve; the parser has already
            // checked their placement.
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {
                // 1. Literals have no sub-expressions
            }

            Expr::Grouping(inner) => {
                // 2. Resolve the inner expression of a grouping
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                // 3. Resolve the operand of a unary expression
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                // 4. Resolve both sides of binary or logical operators
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                // 5. Prevent reading a variable in its own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(RillError::resolve_at(
                            name,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                // 6. Bind this variable occurrence at its lexical depth
                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // 7. Resolve the right-hand side first, then bind the assignment
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                // 8. Resolve the callee expression and each argument
                self.resolve_expr(callee)?;

                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::This { id, keyword } => {
                // 9. 'this' only valid inside class methods
                if self.current_class == ClassType::None {
                    return Err(RillError::resolve_at(
                        keyword,
                        "Cannot use 'this' outside of a class.",
                    ));
                }

                // 10. Bind 'this' like a local variable
                self.resolve_local(*id, keyword);
            }

            Expr::Get { object, .. } => {
                // 11. Resolve the object whose property is being accessed
                self.resolve_expr(object)?;
            }

            Expr::Set { object, value, .. } => {
                // 12. Resolve the target object then the value being assigned
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    ///
    /// `kind` indicates whether this is a normal function, a method, or an
    /// initializer.
    fn resolve_function(&mut self, kind: FunctionType, decl: &'a FunctionDecl) -> Result<()> {
        // 1. Save the enclosing function context so we can restore it later.
        let enclosing = self.current_function;

        // 2. Set the current function context to the passed-in kind.
        self.current_function = kind;

        // 3. Begin a new lexical scope for the function parameters & body.
        self.begin_scope();

        // 4. Declare and immediately define each parameter in this new scope.
        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }

        // 5. Resolve each statement in the function body under the current context.
        for stmt in &decl.body {
            self.resolve_stmt(stmt)?;
        }

        // 6. End the function's parameter/body scope, popping all parameter bindings.
        self.end_scope();

        // 7. Restore the previous function context.
        self.current_function = enclosing;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token) -> Result<()> {
        // 1. If in a local scope, ensure no duplicate declarations
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                return Err(RillError::resolve_at(
                    name,
                    "Variable already declared in this scope",
                ));
            }
            // 2. Mark the name as declared but not yet defined
            scope.insert(name.lexeme.as_str(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &'a Token) {
        // Mark the name as fully defined in the current scope
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at depth `d`; occurrences
    /// not found in any scope are globals and stay unrecorded, deferring to
    /// runtime lookup.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // 1. Search each scope from innermost outward
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                // 2. Tell the interpreter about the local binding
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        // 3. Not found in any scope: it's a global
        debug!("Resolved '{}' as global", name.lexeme);
    }
}
