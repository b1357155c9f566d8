//! Shared helpers: running sessions and evaluating rewritten bodies.
//!
//! The evaluator treats a call to a declaration without a body as a
//! constructor-like effect: it counts the call and returns a value recording
//! who made it from which arguments. That is enough to observe both the
//! shape of the injected object graph and how often each provider ran.

use std::cell::RefCell;
use std::rc::Rc;

use inj_diagnostic::ErrorCode;
use inj_hir::{DeclId, ExprId, ExprKind, Intrinsic, Module};
use inj_ir::StringInterner;
use inj_types::ClassifierTable;
use injc::{Session, SessionConfig};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Unit,
    Null,
    Int(i64),
    Str(String),
    /// Result of calling a declaration that has no body.
    Made { by: String, args: Vec<Value> },
    List(Rc<RefCell<Vec<Value>>>),
    Function(DeclId),
}

/// `by(args...)`.
pub fn made(by: &str, args: Vec<Value>) -> Value {
    Value::Made {
        by: by.to_owned(),
        args,
    }
}

pub fn list(items: Vec<Value>) -> Value {
    Value::List(Rc::new(RefCell::new(items)))
}

/// Run a session that must succeed.
pub fn compile(module: Module, table: ClassifierTable, interner: StringInterner) -> Session {
    let mut session = Session::new(SessionConfig::default(), module, table, interner);
    if session.run().is_err() {
        panic!("session failed:\n{}", session.render_diagnostics());
    }
    session
}

/// Run a session that must fail; returns it with its error codes.
pub fn compile_err(module: Module, table: ClassifierTable, interner: StringInterner) -> (Session, Vec<ErrorCode>) {
    let mut session = Session::new(SessionConfig::default(), module, table, interner);
    assert!(session.run().is_err(), "session unexpectedly succeeded");
    let codes = session.diagnostics().map(|diagnostic| diagnostic.code).collect();
    (session, codes)
}

pub struct Evaluator<'s> {
    module: &'s Module,
    table: &'s ClassifierTable,
    interner: &'s StringInterner,
    store: FxHashMap<DeclId, Value>,
    calls: FxHashMap<String, usize>,
}

impl<'s> Evaluator<'s> {
    pub fn new(session: &'s Session) -> Self {
        Evaluator {
            module: session.module(),
            table: session.table(),
            interner: session.interner(),
            store: FxHashMap::default(),
            calls: FxHashMap::default(),
        }
    }

    /// How often a declaration named `name` was called.
    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    /// Evaluate the body of a parameterless function.
    pub fn run(&mut self, function: DeclId) -> Value {
        match self.module.decl(function).body {
            Some(body) => self.eval(body),
            None => Value::Unit,
        }
    }

    pub fn invoke(&mut self, function: &Value, arguments: Vec<Value>) -> Value {
        let Value::Function(lambda) = function else {
            panic!("invoked a non-function: {function:?}");
        };
        let d = self.module.decl(*lambda);
        for (param, value) in d.value_parameters.iter().zip(arguments) {
            self.store.insert(*param, value);
        }
        match d.body {
            Some(body) => self.eval(body),
            None => Value::Unit,
        }
    }

    fn name(&self, decl: DeclId) -> String {
        self.interner.lookup(self.module.decl(decl).name).to_owned()
    }

    fn list_items(value: &Value) -> Rc<RefCell<Vec<Value>>> {
        match value {
            Value::List(items) => Rc::clone(items),
            other => panic!("expected a list, found {other:?}"),
        }
    }

    fn eval(&mut self, expr: ExprId) -> Value {
        match self.module.exprs.kind(expr).clone() {
            ExprKind::Call(call) => {
                for receiver in call.dispatch_receiver.iter().chain(&call.extension_receiver) {
                    self.eval(*receiver);
                }
                let name = self.name(call.callee);
                *self.calls.entry(name.clone()).or_default() += 1;
                let params = self.module.decl(call.callee).value_parameters.clone();
                let mut args = Vec::new();
                for (slot, argument) in call.arguments.iter().enumerate() {
                    if let Some(argument) = argument {
                        let value = self.eval(*argument);
                        if let Some(param) = params.get(slot) {
                            self.store.insert(*param, value.clone());
                        }
                        args.push(value);
                    }
                }
                match self.module.decl(call.callee).body {
                    Some(body) => self.eval(body),
                    None => Value::Made { by: name, args },
                }
            }
            ExprKind::Get(decl) => match self.store.get(&decl) {
                Some(value) => value.clone(),
                None => panic!("read of unbound `{}`", self.name(decl)),
            },
            ExprKind::GetObject(classifier) => Value::Made {
                by: self.interner.lookup(self.table.get(classifier).name).to_owned(),
                args: Vec::new(),
            },
            ExprKind::Lambda(lambda) => Value::Function(lambda),
            ExprKind::Invoke { function, arguments } => {
                let function = self.eval(function);
                let arguments = arguments.iter().map(|argument| self.eval(*argument)).collect();
                self.invoke(&function, arguments)
            }
            ExprKind::Block { statements, result } => {
                for statement in statements {
                    self.eval(statement);
                }
                result.map_or(Value::Unit, |result| self.eval(result))
            }
            ExprKind::LocalDecl(_) | ExprKind::Unit => Value::Unit,
            ExprKind::Variable { decl, initializer } => {
                let value = initializer.map_or(Value::Null, |initializer| self.eval(initializer));
                self.store.insert(decl, value);
                Value::Unit
            }
            ExprKind::Assign { variable, value } => {
                let value = self.eval(value);
                self.store.insert(variable, value);
                Value::Unit
            }
            ExprKind::NonNull(inner) => {
                let value = self.eval(inner);
                assert_ne!(value, Value::Null, "null assertion failed");
                value
            }
            ExprKind::Null => Value::Null,
            ExprKind::Int(value) => Value::Int(value),
            ExprKind::Str(value) => Value::Str(value),
            ExprKind::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    match self.eval(part) {
                        Value::Str(text) => out.push_str(&text),
                        other => panic!("concatenated a non-string: {other:?}"),
                    }
                }
                Value::Str(out)
            }
            ExprKind::Intrinsic { op, arguments } => {
                let values: Vec<Value> = arguments.iter().map(|argument| self.eval(*argument)).collect();
                match op {
                    Intrinsic::MutableListOf => list(Vec::new()),
                    Intrinsic::ListAdd => {
                        Self::list_items(&values[0]).borrow_mut().push(values[1].clone());
                        Value::Unit
                    }
                    Intrinsic::ListAddAll => {
                        let added = Self::list_items(&values[1]).borrow().clone();
                        Self::list_items(&values[0]).borrow_mut().extend(added);
                        Value::Unit
                    }
                    Intrinsic::ListOf => list(values),
                    Intrinsic::ToList => list(Self::list_items(&values[0]).borrow().clone()),
                }
            }
            ExprKind::Return(value) => self.eval(value),
        }
    }
}
