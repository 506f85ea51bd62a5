use crate::ast::*;
use crate::error::SourceExtent;
use crate::lexer::{Keyword, LexError, Lexer, Token};
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub extent: SourceExtent,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {} at {}", self.message, self.extent)
    }
}

/// Parse a whole program. `file` is used in source extents and error messages.
pub fn parse(source: &str, file: &str) -> Result<Program, ParseError> {
    Parser::new(source, file)?.parse_program()
}

pub struct Parser {
    lexer: Lexer,
    file: Rc<str>,
    current: Token,
    current_extent: SourceExtent,
}

impl Parser {
    pub fn new(source: &str, file: &str) -> Result<Self, ParseError> {
        let file: Rc<str> = Rc::from(file);
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token().map_err(|e| lex_to_parse(e, &file))?;
        let current_extent =
            SourceExtent::new(file.clone(), lexer.token_line(), lexer.token_column());
        Ok(Self {
            lexer,
            file,
            current,
            current_extent,
        })
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while self.current != Token::Eof {
            body.push(self.parse_statement_or_function()?);
        }
        Ok(Program { body })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self
            .lexer
            .next_token()
            .map_err(|e| lex_to_parse(e, &self.file))?;
        self.current_extent = SourceExtent::new(
            self.file.clone(),
            self.lexer.token_line(),
            self.lexer.token_column(),
        );
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn eat(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if !self.eat(expected)? {
            return Err(self.error(format!("Expected {expected:?}, got {:?}", self.current)));
        }
        Ok(())
    }

    fn eat_keyword(&mut self, kw: Keyword) -> Result<bool, ParseError> {
        self.eat(&Token::Keyword(kw))
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current {
            Token::Identifier(_) => {
                let Token::Identifier(name) = self.advance()? else {
                    unreachable!()
                };
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, got {other:?}"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            extent: self.current_extent.clone(),
        }
    }

    fn expr(&self, kind: ExprKind, extent: SourceExtent) -> Expression {
        Expression { kind, extent }
    }

    //
    // Expressions
    //

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let extent = self.current_extent.clone();
        let literal = match &self.current {
            Token::Identifier(_) => {
                let name = self.expect_identifier()?;
                return Ok(self.expr(ExprKind::Identifier(name), extent));
            }
            Token::LeftParen => {
                self.advance()?;
                let e = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                return Ok(e);
            }
            Token::NumericLiteral(n) => Literal::Number(*n),
            Token::StringLiteral(s) => Literal::String(s.clone()),
            Token::BooleanLiteral(b) => Literal::Boolean(*b),
            Token::NullLiteral => Literal::Null,
            Token::UndefinedLiteral => Literal::Undefined,
            other => return Err(self.error(format!("Unexpected token {other:?}"))),
        };
        self.advance()?;
        Ok(self.expr(ExprKind::Literal(literal), extent))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RightParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment_expression()?);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RightParen)?;
        Ok(args)
    }

    /// MemberExpression, including `new X` / `new X(args)` which binds the
    /// argument list to the constructor rather than to a surrounding call.
    fn parse_member_expression(&mut self) -> Result<Expression, ParseError> {
        let extent = self.current_extent.clone();
        let mut me = if self.eat_keyword(Keyword::New)? {
            let mut target = self.parse_member_expression()?;
            if self.current == Token::LeftParen {
                let args = self.parse_argument_list()?;
                target = self.expr(ExprKind::Call(Box::new(target), args), extent.clone());
            }
            self.expr(
                ExprKind::Prefix(PrefixOp::New, Box::new(target)),
                extent.clone(),
            )
        } else {
            self.parse_primary_expression()?
        };
        loop {
            if self.eat(&Token::LeftBracket)? {
                let index = self.parse_expression()?;
                self.expect(&Token::RightBracket)?;
                me = self.expr(
                    ExprKind::Binary(BinaryOp::Index, Box::new(me), Box::new(index)),
                    extent.clone(),
                );
            } else if self.eat(&Token::Dot)? {
                let name_extent = self.current_extent.clone();
                let name = self.expect_identifier()?;
                let prop = self.expr(ExprKind::Literal(Literal::String(name)), name_extent);
                me = self.expr(
                    ExprKind::Binary(BinaryOp::Member, Box::new(me), Box::new(prop)),
                    extent.clone(),
                );
            } else {
                return Ok(me);
            }
        }
    }

    /// CallExpression chains: calls, index and member accesses compose
    /// left-to-right, so `f().x` and `f()(g)` parse the obvious way.
    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let extent = self.current_extent.clone();
        let mut e = self.parse_member_expression()?;
        loop {
            match &self.current {
                Token::LeftParen => {
                    let args = self.parse_argument_list()?;
                    e = self.expr(ExprKind::Call(Box::new(e), args), extent.clone());
                }
                Token::LeftBracket => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(&Token::RightBracket)?;
                    e = self.expr(
                        ExprKind::Binary(BinaryOp::Index, Box::new(e), Box::new(index)),
                        extent.clone(),
                    );
                }
                Token::Dot => {
                    self.advance()?;
                    let name_extent = self.current_extent.clone();
                    let name = self.expect_identifier()?;
                    let prop = self.expr(ExprKind::Literal(Literal::String(name)), name_extent);
                    e = self.expr(
                        ExprKind::Binary(BinaryOp::Member, Box::new(e), Box::new(prop)),
                        extent.clone(),
                    );
                }
                _ => return Ok(e),
            }
        }
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, ParseError> {
        let extent = self.current_extent.clone();
        let lhs = self.parse_left_hand_side_expression()?;
        let op = match self.current {
            Token::Increment => PostfixOp::Increment,
            Token::Decrement => PostfixOp::Decrement,
            _ => return Ok(lhs),
        };
        self.advance()?;
        Ok(self.expr(ExprKind::Postfix(op, Box::new(lhs)), extent))
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, ParseError> {
        let op = match &self.current {
            Token::Keyword(Keyword::Delete) => PrefixOp::Delete,
            Token::Keyword(Keyword::Void) => PrefixOp::Void,
            Token::Keyword(Keyword::TypeOf) => PrefixOp::TypeOf,
            Token::Increment => PrefixOp::Increment,
            Token::Decrement => PrefixOp::Decrement,
            Token::Plus => PrefixOp::Plus,
            Token::Minus => PrefixOp::Minus,
            Token::Tilde => PrefixOp::BitNot,
            Token::Bang => PrefixOp::Not,
            _ => return self.parse_postfix_expression(),
        };
        let extent = self.current_extent.clone();
        self.advance()?;
        let operand = self.parse_unary_expression()?;
        Ok(self.expr(ExprKind::Prefix(op, Box::new(operand)), extent))
    }

    /// Precedence climbing over the binary operator table. `?:` sits at the
    /// assignment level and is right-to-left, like assignment itself.
    fn parse_expression_at(
        &mut self,
        mut lhs: Expression,
        outer_precedence: u8,
    ) -> Result<Expression, ParseError> {
        loop {
            let Some(precedence) = token_precedence(&self.current) else {
                return Ok(lhs);
            };
            if precedence > outer_precedence {
                return Ok(lhs);
            }
            if self.current == Token::Question {
                self.advance()?;
                let then_e = self.parse_assignment_expression()?;
                self.expect(&Token::Colon)?;
                let else_e = self.parse_assignment_expression()?;
                let extent = lhs.extent.clone();
                lhs = self.expr(
                    ExprKind::Conditional(Box::new(lhs), Box::new(then_e), Box::new(else_e)),
                    extent,
                );
                continue;
            }
            let op = binary_op_of(&self.current).expect("token has a precedence");
            self.advance()?;
            let mut rhs = self.parse_unary_expression()?;
            loop {
                let Some(look_ahead) = token_precedence(&self.current) else {
                    break;
                };
                if look_ahead > precedence
                    || (look_ahead == precedence && !is_right_to_left(look_ahead))
                {
                    break;
                }
                rhs = self.parse_expression_at(rhs, look_ahead)?;
            }
            let extent = lhs.extent.clone();
            lhs = self.expr(
                ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                extent,
            );
        }
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_unary_expression()?;
        self.parse_expression_at(lhs, ASSIGNMENT_PRECEDENCE)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_assignment_expression()?;
        self.parse_expression_at(lhs, COMMA_PRECEDENCE)
    }

    //
    // Statements
    //

    fn parse_statement_or_function(&mut self) -> Result<Statement, ParseError> {
        let s = if self.current == Token::Keyword(Keyword::Function) {
            self.parse_function()?
        } else {
            self.parse_statement()?
        };
        self.eat(&Token::Semicolon)?;
        Ok(s)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::LeftBrace => Ok(Statement::Block(self.parse_brace_list()?)),
            Token::Semicolon => Ok(Statement::Empty),
            Token::Keyword(Keyword::Var) => {
                self.advance()?;
                Ok(Statement::Variable(self.parse_declarator_list()?))
            }
            Token::Keyword(Keyword::If) => {
                self.advance()?;
                self.expect(&Token::LeftParen)?;
                let cond = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                let then_branch = Box::new(self.parse_statement()?);
                self.eat(&Token::Semicolon)?;
                let else_branch = if self.eat_keyword(Keyword::Else)? {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Statement::If(IfStatement {
                    cond,
                    then_branch,
                    else_branch,
                }))
            }
            Token::Keyword(Keyword::While) => {
                self.advance()?;
                self.expect(&Token::LeftParen)?;
                let cond = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(Statement::While(WhileStatement {
                    cond,
                    body: Box::new(self.parse_statement()?),
                }))
            }
            Token::Keyword(Keyword::For) => {
                self.advance()?;
                self.expect(&Token::LeftParen)?;
                let init = if self.eat(&Token::Semicolon)? {
                    None
                } else {
                    let s = if self.eat_keyword(Keyword::Var)? {
                        Statement::Variable(self.parse_declarator_list()?)
                    } else {
                        Statement::Expression(self.parse_expression()?)
                    };
                    self.expect(&Token::Semicolon)?;
                    Some(Box::new(s))
                };
                let cond = if self.eat(&Token::Semicolon)? {
                    None
                } else {
                    let e = self.parse_expression()?;
                    self.expect(&Token::Semicolon)?;
                    Some(e)
                };
                let iter = if self.eat(&Token::RightParen)? {
                    None
                } else {
                    let e = self.parse_expression()?;
                    self.expect(&Token::RightParen)?;
                    Some(e)
                };
                Ok(Statement::For(ForStatement {
                    init,
                    cond,
                    iter,
                    body: Box::new(self.parse_statement()?),
                }))
            }
            Token::Keyword(Keyword::Continue) => {
                self.advance()?;
                Ok(Statement::Continue)
            }
            Token::Keyword(Keyword::Break) => {
                self.advance()?;
                Ok(Statement::Break)
            }
            Token::Keyword(Keyword::Return) => {
                self.advance()?;
                let e = if matches!(
                    self.current,
                    Token::Semicolon | Token::RightBrace | Token::Eof
                ) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Statement::Return(e))
            }
            Token::Keyword(Keyword::With) => {
                self.advance()?;
                self.expect(&Token::LeftParen)?;
                let object = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(Statement::With(WithStatement {
                    object,
                    body: Box::new(self.parse_statement()?),
                }))
            }
            _ => Ok(Statement::Expression(self.parse_expression()?)),
        }
    }

    fn parse_function(&mut self) -> Result<Statement, ParseError> {
        self.expect(&Token::Keyword(Keyword::Function))?;
        let name = self.expect_identifier()?;
        self.expect(&Token::LeftParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RightParen)? {
            loop {
                params.push(self.expect_identifier()?);
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
            self.expect(&Token::RightParen)?;
        }
        let body = self.parse_brace_list()?;
        Ok(Statement::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
        })))
    }

    fn parse_brace_list(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(&Token::LeftBrace)?;
        let mut stmts = Vec::new();
        while !self.eat(&Token::RightBrace)? {
            if self.current == Token::Eof {
                return Err(self.error("Unexpected end of input, expected RightBrace"));
            }
            stmts.push(self.parse_statement_or_function()?);
        }
        Ok(stmts)
    }

    fn parse_declarator_list(&mut self) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut decls = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&Token::Assign)? {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            decls.push(VariableDeclarator { name, init });
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        Ok(decls)
    }
}

fn lex_to_parse(e: LexError, file: &Rc<str>) -> ParseError {
    ParseError {
        message: e.message,
        extent: SourceExtent::new(file.clone(), e.line, e.column),
    }
}

fn binary_op_of(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::LeftShift => BinaryOp::LeftShift,
        Token::RightShift => BinaryOp::RightShift,
        Token::UnsignedRightShift => BinaryOp::UnsignedRightShift,
        Token::LessThan => BinaryOp::Less,
        Token::LessThanEqual => BinaryOp::LessEq,
        Token::GreaterThan => BinaryOp::Greater,
        Token::GreaterThanEqual => BinaryOp::GreaterEq,
        Token::Equal => BinaryOp::Eq,
        Token::NotEqual => BinaryOp::NotEq,
        Token::Ampersand => BinaryOp::BitAnd,
        Token::Caret => BinaryOp::BitXor,
        Token::Pipe => BinaryOp::BitOr,
        Token::LogicalAnd => BinaryOp::And,
        Token::LogicalOr => BinaryOp::Or,
        Token::Assign => BinaryOp::Assign,
        Token::PlusAssign => BinaryOp::AddAssign,
        Token::MinusAssign => BinaryOp::SubAssign,
        Token::StarAssign => BinaryOp::MulAssign,
        Token::SlashAssign => BinaryOp::DivAssign,
        Token::PercentAssign => BinaryOp::RemAssign,
        Token::LeftShiftAssign => BinaryOp::LeftShiftAssign,
        Token::RightShiftAssign => BinaryOp::RightShiftAssign,
        Token::UnsignedRightShiftAssign => BinaryOp::UnsignedRightShiftAssign,
        Token::AmpersandAssign => BinaryOp::BitAndAssign,
        Token::CaretAssign => BinaryOp::BitXorAssign,
        Token::PipeAssign => BinaryOp::BitOrAssign,
        Token::Comma => BinaryOp::Comma,
        _ => return None,
    };
    Some(op)
}

fn token_precedence(token: &Token) -> Option<u8> {
    if *token == Token::Question {
        return Some(ASSIGNMENT_PRECEDENCE);
    }
    binary_op_of(token).map(BinaryOp::precedence)
}

fn is_right_to_left(precedence: u8) -> bool {
    precedence >= ASSIGNMENT_PRECEDENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src, "test").unwrap()
    }

    fn first_expr(src: &str) -> Expression {
        match parse_ok(src).body.into_iter().next().unwrap() {
            Statement::Expression(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty() {
        assert!(parse_ok("").body.is_empty());
    }

    #[test]
    fn parse_var_declaration() {
        let prog = parse_ok("var x = 42, y;");
        assert_eq!(prog.body.len(), 1);
        let Statement::Variable(decls) = &prog.body[0] else {
            panic!("expected variable statement");
        };
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "x");
        assert!(decls[0].init.is_some());
        assert!(decls[1].init.is_none());
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = first_expr("1 + 2 * 3");
        let ExprKind::Binary(BinaryOp::Add, _, rhs) = &e.kind else {
            panic!("expected addition at the top, got {e:?}");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = first_expr("a = b = 1");
        let ExprKind::Binary(BinaryOp::Assign, lhs, rhs) = &e.kind else {
            panic!("expected assignment at the top");
        };
        assert!(matches!(lhs.kind, ExprKind::Identifier(_)));
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary(BinaryOp::Assign, _, _)
        ));
    }

    #[test]
    fn member_chain() {
        let e = first_expr("a.b.c");
        let ExprKind::Binary(BinaryOp::Member, inner, prop) = &e.kind else {
            panic!("expected member access");
        };
        assert!(matches!(
            inner.kind,
            ExprKind::Binary(BinaryOp::Member, _, _)
        ));
        assert!(matches!(
            &prop.kind,
            ExprKind::Literal(Literal::String(s)) if s == "c"
        ));
    }

    #[test]
    fn new_without_arguments_binds_member() {
        let e = first_expr("new Object");
        assert!(matches!(e.kind, ExprKind::Prefix(PrefixOp::New, _)));

        let e = first_expr("new Object(o)");
        let ExprKind::Prefix(PrefixOp::New, target) = &e.kind else {
            panic!("expected new expression");
        };
        assert!(matches!(target.kind, ExprKind::Call(_, _)));
    }

    #[test]
    fn call_result_member_access() {
        let e = first_expr("f().x");
        let ExprKind::Binary(BinaryOp::Member, callee, _) = &e.kind else {
            panic!("expected member access on call result");
        };
        assert!(matches!(callee.kind, ExprKind::Call(_, _)));
    }

    #[test]
    fn conditional_at_assignment_level() {
        let e = first_expr("a == 1 ? b : c = 2");
        let ExprKind::Conditional(cond, _, else_e) = &e.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(cond.kind, ExprKind::Binary(BinaryOp::Eq, _, _)));
        assert!(matches!(
            else_e.kind,
            ExprKind::Binary(BinaryOp::Assign, _, _)
        ));
    }

    #[test]
    fn parse_if_else() {
        let prog = parse_ok("if (1) 2; else 3;");
        let Statement::If(s) = &prog.body[0] else {
            panic!("expected if statement");
        };
        assert!(s.else_branch.is_some());
    }

    #[test]
    fn parse_for_loop_forms() {
        let prog = parse_ok("for (var i = 0; i < 10; ++i) x;");
        let Statement::For(s) = &prog.body[0] else {
            panic!("expected for statement");
        };
        assert!(s.init.is_some());
        assert!(s.cond.is_some());
        assert!(s.iter.is_some());

        let prog = parse_ok("for (;;) break;");
        let Statement::For(s) = &prog.body[0] else {
            panic!("expected for statement");
        };
        assert!(s.init.is_none() && s.cond.is_none() && s.iter.is_none());
    }

    #[test]
    fn parse_function_declaration() {
        let prog = parse_ok("function add(a, b) { return a + b; }");
        let Statement::Function(decl) = &prog.body[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(decl.name, "add");
        assert_eq!(decl.params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(decl.body.len(), 1);
    }

    #[test]
    fn parse_with_statement() {
        let prog = parse_ok("with (o) x;");
        assert!(matches!(&prog.body[0], Statement::With(_)));
    }

    #[test]
    fn semicolons_are_optional_between_statements() {
        assert_eq!(parse_ok("x = 1 y = 2").body.len(), 2);
        assert_eq!(parse_ok("f(); g();").body.len(), 2);
    }

    #[test]
    fn display_round_trip() {
        assert_eq!(first_expr("1 + 2 * 3").to_string(), "1 + 2 * 3");
        assert_eq!(first_expr("(1 + 2) * 3").to_string(), "(1 + 2) * 3");
        assert_eq!(first_expr("a.b[c]").to_string(), "a.b[c]");
        assert_eq!(first_expr("f(x, 1)").to_string(), "f(x, 1)");
        assert_eq!(first_expr("new Object").to_string(), "new Object");
        assert_eq!(
            parse_ok("var x = 1;").body[0].to_string(),
            "var x = 1;"
        );
    }

    #[test]
    fn missing_paren_is_an_error() {
        assert!(parse("if (1 { }", "test").is_err());
        assert!(parse("f(1, ", "test").is_err());
    }
}
