use super::*;
use crate::ast::*;
use crate::error::RuntimeError;
use crate::types::JsValue;
use log::trace;

/// Names that pre-bind to undefined before a block runs: every `var`
/// introduced anywhere in the block plus every function declaration's name.
/// The scan recurses through control structures but stops at nested function
/// bodies, whose own hoisting happens at call time.
pub(crate) fn hoisted_names(stmts: &[Statement]) -> Vec<String> {
    let mut names = Vec::new();
    collect_hoisted(stmts, &mut names);
    names
}

fn collect_hoisted(stmts: &[Statement], out: &mut Vec<String>) {
    for s in stmts {
        collect_hoisted_statement(s, out);
    }
}

fn collect_hoisted_statement(s: &Statement, out: &mut Vec<String>) {
    match s {
        Statement::Block(inner) => collect_hoisted(inner, out),
        Statement::Variable(decls) => {
            out.extend(decls.iter().map(|d| d.name.clone()));
        }
        Statement::If(stmt) => {
            collect_hoisted_statement(&stmt.then_branch, out);
            if let Some(else_branch) = &stmt.else_branch {
                collect_hoisted_statement(else_branch, out);
            }
        }
        Statement::While(stmt) => collect_hoisted_statement(&stmt.body, out),
        Statement::For(stmt) => {
            if let Some(init) = &stmt.init {
                collect_hoisted_statement(init, out);
            }
            collect_hoisted_statement(&stmt.body, out);
        }
        Statement::With(stmt) => collect_hoisted_statement(&stmt.body, out),
        Statement::Function(decl) => out.push(decl.name.clone()),
        Statement::Empty
        | Statement::Expression(_)
        | Statement::Continue
        | Statement::Break
        | Statement::Return(_) => {}
    }
}

impl Interpreter {
    /// Execute one statement, firing the trace hook afterwards.
    pub(crate) fn exec_statement(&mut self, s: &Statement) -> Result<Completion, RuntimeError> {
        let completion = self.exec_statement_inner(s)?;
        if let Some(hook) = self.on_statement.as_mut() {
            hook(s, &completion);
        }
        Ok(completion)
    }

    /// Block composition rule: the first abrupt completion wins, otherwise
    /// the block completes normally with undefined.
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement]) -> Result<Completion, RuntimeError> {
        for s in stmts {
            let c = self.exec_statement(s)?;
            if c.is_abrupt() {
                return Ok(c);
            }
        }
        Ok(Completion::Normal(JsValue::Undefined))
    }

    fn exec_statement_inner(&mut self, s: &Statement) -> Result<Completion, RuntimeError> {
        match s {
            Statement::Block(stmts) => self.exec_statements(stmts),
            Statement::Variable(decls) => {
                for d in decls {
                    // The name itself was hoisted; only initializers act here.
                    if let Some(init) = &d.init {
                        let v = self.eval_expr(init)?;
                        let value = self.get_value(&v)?;
                        trace!("var {} = {}", d.name, value);
                        self.scopes.object.borrow_mut().put(&d.name, value);
                    }
                }
                Ok(Completion::Normal(JsValue::Undefined))
            }
            Statement::Empty => Ok(Completion::Normal(JsValue::Undefined)),
            Statement::Expression(e) => {
                let v = self.eval_expr(e)?;
                Ok(Completion::Normal(self.get_value(&v)?))
            }
            Statement::If(stmt) => {
                let cond = self.eval_expr(&stmt.cond)?;
                if to_boolean(&self.get_value(&cond)?) {
                    self.exec_statement(&stmt.then_branch)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.exec_statement(else_branch)
                } else {
                    Ok(Completion::Normal(JsValue::Undefined))
                }
            }
            Statement::While(stmt) => self.exec_while(stmt),
            Statement::For(stmt) => self.exec_for(stmt),
            Statement::Continue => Ok(Completion::Continue),
            Statement::Break => Ok(Completion::Break),
            Statement::Return(e) => {
                let value = match e {
                    Some(e) => {
                        let v = self.eval_expr(e)?;
                        self.get_value(&v)?
                    }
                    None => JsValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Function(decl) => {
                let func = self.make_user_function(decl);
                self.scopes.object.borrow_mut().put(&decl.name, func);
                Ok(Completion::Normal(JsValue::Undefined))
            }
            Statement::With(_) => Err(RuntimeError::not_implemented("with statement")),
        }
    }

    fn exec_while(&mut self, stmt: &WhileStatement) -> Result<Completion, RuntimeError> {
        loop {
            let cond = self.eval_expr(&stmt.cond)?;
            if !to_boolean(&self.get_value(&cond)?) {
                return Ok(Completion::Normal(JsValue::Undefined));
            }
            match self.exec_statement(&stmt.body)? {
                Completion::Break => return Ok(Completion::Normal(JsValue::Undefined)),
                c @ Completion::Return(_) => return Ok(c),
                Completion::Normal(_) | Completion::Continue => {}
            }
        }
    }

    fn exec_for(&mut self, stmt: &ForStatement) -> Result<Completion, RuntimeError> {
        if let Some(init) = &stmt.init {
            self.exec_statement(init)?;
        }
        loop {
            if let Some(cond) = &stmt.cond {
                let c = self.eval_expr(cond)?;
                if !to_boolean(&self.get_value(&c)?) {
                    return Ok(Completion::Normal(JsValue::Undefined));
                }
            }
            match self.exec_statement(&stmt.body)? {
                Completion::Break => return Ok(Completion::Normal(JsValue::Undefined)),
                c @ Completion::Return(_) => return Ok(c),
                Completion::Normal(_) | Completion::Continue => {}
            }
            // A continue still runs the iteration clause.
            if let Some(iter) = &stmt.iter {
                let v = self.eval_expr(iter)?;
                self.get_value(&v)?;
            }
        }
    }
}
