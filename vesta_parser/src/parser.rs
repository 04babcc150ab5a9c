//! Recursive-descent statement parsing over a precedence-climbing
//! expression core, with automatic semicolon insertion.
//!
//! Expression parsing follows the climbing rule: parse a unary expression,
//! then fold in operators while their precedence binds at least as tightly
//! as the surrounding context, extending the right operand first whenever
//! the lookahead binds tighter or is right-associative at the same level.
//! The `?:` triple is special-cased at assignment precedence.

use std::fmt;

use crate::ast::{
    BinaryOp, Expr, ExprKind, FunctionDefinition, Literal, PostfixOp, PrefixOp, Stmt, StmtKind,
    VarDecl,
};
use crate::lexer::{
    self, Lexer, NumberError, Token, ASSIGNMENT_PRECEDENCE, COMMA_PRECEDENCE,
};
use crate::span::{positions, SourcePosition, Span};

/// Nesting bound for expression recursion; pathological inputs fail with a
/// parse error instead of exhausting the stack.
const MAX_EXPRESSION_DEPTH: u32 = 500;

/// A fatal syntax error, carrying where it happened.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub position: SourcePosition,
    message: String,
}

impl ParseError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a whole program into a block statement holding its top-level
/// statements and function declarations.
pub fn parse(source: &str) -> Result<Stmt, ParseError> {
    Parser::new(source).parse_program()
}

pub struct Parser<'a> {
    source: &'a str,
    lex: Lexer<'a>,
    depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lex = Lexer::new(source);
        lex.next();
        Self {
            source,
            lex,
            depth: 0,
        }
    }

    /// Start offset of the current (unconsumed) token. Node extents end
    /// here: just past the last consumed token and its trailing trivia.
    fn token_start(&self) -> u32 {
        self.lex.start as u32
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(
            Span {
                start: self.token_start(),
                end: self.lex.index as u32,
            },
            message,
        )
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError {
            span,
            position: positions(self.source, span).0,
            message: message.into(),
        }
    }

    /// Consumes the current token, returning its span.
    fn bump(&mut self) -> Span {
        let span = Span {
            start: self.lex.start as u32,
            end: self.lex.index as u32,
        };
        self.lex.next();
        span
    }

    fn accept(&mut self, token: Token) -> bool {
        if self.lex.token == token {
            self.lex.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.lex.token == token {
            self.lex.next();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                token.describe(),
                self.lex.token.describe()
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<Box<str>, ParseError> {
        if self.lex.token != Token::Ident {
            return Err(self.error(format!(
                "expected identifier, found {}",
                self.lex.token.describe()
            )));
        }
        let span = self.bump();
        Ok(span.text(self.source).into())
    }

    fn stmt(&self, start: u32, kind: StmtKind) -> Stmt {
        Stmt {
            span: Span {
                start,
                end: self.token_start(),
            },
            kind,
        }
    }

    fn expr(&self, start: u32, kind: ExprKind) -> Expr {
        Expr {
            span: Span {
                start,
                end: self.token_start(),
            },
            kind,
        }
    }

    pub fn parse_program(&mut self) -> Result<Stmt, ParseError> {
        let mut statements = Vec::new();
        while self.lex.token != Token::EOF {
            statements.push(self.parse_statement_or_function()?);
        }
        Ok(self.stmt(0, StmtKind::Block(statements)))
    }

    fn parse_statement_or_function(&mut self) -> Result<Stmt, ParseError> {
        if self.lex.token == Token::KeywordFunction {
            self.parse_function()
        } else {
            self.parse_statement()
        }
    }

    /// A missing statement terminator is tolerated when a line terminator
    /// was skipped, at `}`, and at end of input; a literal semicolon is
    /// consumed if present.
    fn expect_semicolon_allow_insertion(&mut self) -> Result<(), ParseError> {
        if !self.lex.has_newline_before
            && self.lex.token != Token::RBrace
            && self.lex.token != Token::EOF
        {
            self.expect(Token::Semi)
        } else {
            self.accept(Token::Semi);
            Ok(())
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.token_start();
        match self.lex.token {
            Token::LBrace => self.parse_block(),
            Token::KeywordVar => {
                self.lex.next();
                let declarations = self.parse_variable_declarations()?;
                self.expect_semicolon_allow_insertion()?;
                Ok(self.stmt(start, StmtKind::Variable(declarations)))
            }
            Token::Semi => {
                self.lex.next();
                Ok(self.stmt(start, StmtKind::Empty))
            }
            Token::KeywordIf => {
                self.lex.next();
                self.expect(Token::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let consequent = Box::new(self.parse_statement()?);
                self.accept(Token::Semi);
                let alternate = if self.accept(Token::KeywordElse) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(self.stmt(
                    start,
                    StmtKind::If {
                        condition,
                        consequent,
                        alternate,
                    },
                ))
            }
            Token::KeywordWhile => {
                self.lex.next();
                self.expect(Token::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(self.stmt(start, StmtKind::While { condition, body }))
            }
            Token::KeywordFor => self.parse_for(start),
            Token::KeywordContinue => {
                self.lex.next();
                self.expect_semicolon_allow_insertion()?;
                Ok(self.stmt(start, StmtKind::Continue))
            }
            Token::KeywordBreak => {
                self.lex.next();
                self.expect_semicolon_allow_insertion()?;
                Ok(self.stmt(start, StmtKind::Break))
            }
            Token::KeywordReturn => {
                self.lex.next();
                // No line terminator may separate `return` from its value.
                let value = if !self.lex.has_newline_before
                    && !matches!(self.lex.token, Token::Semi | Token::RBrace | Token::EOF)
                {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.expect_semicolon_allow_insertion()?;
                Ok(self.stmt(start, StmtKind::Return(value)))
            }
            Token::KeywordWith => {
                self.lex.next();
                self.expect(Token::LParen)?;
                let object = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(self.stmt(start, StmtKind::With { object, body }))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon_allow_insertion()?;
                Ok(self.stmt(start, StmtKind::Expression(expr)))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        let start = self.token_start();
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        while !self.accept(Token::RBrace) {
            if self.lex.token == Token::EOF {
                return Err(self.error("unexpected end of input inside a block"));
            }
            statements.push(self.parse_statement_or_function()?);
        }
        Ok(self.stmt(start, StmtKind::Block(statements)))
    }

    fn parse_variable_declarations(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.accept(Token::Equal) {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            declarations.push(VarDecl { name, init });
            if !self.accept(Token::Comma) {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_for(&mut self, start: u32) -> Result<Stmt, ParseError> {
        self.lex.next();
        self.expect(Token::LParen)?;
        let mut init = None;
        if !self.accept(Token::Semi) {
            let init_start = self.token_start();
            let init_stmt = if self.accept(Token::KeywordVar) {
                let declarations = self.parse_variable_declarations()?;
                self.stmt(init_start, StmtKind::Variable(declarations))
            } else {
                let expr = self.parse_expression()?;
                self.stmt(init_start, StmtKind::Expression(expr))
            };
            if self.accept(Token::KeywordIn) {
                if let StmtKind::Variable(declarations) = &init_stmt.kind {
                    if declarations.len() != 1 {
                        return Err(self.error_at(
                            init_stmt.span,
                            "a for-in loop must declare exactly one variable",
                        ));
                    }
                }
                let object = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(self.stmt(
                    start,
                    StmtKind::ForIn {
                        binding: Box::new(init_stmt),
                        object,
                        body,
                    },
                ));
            }
            self.expect(Token::Semi)?;
            init = Some(Box::new(init_stmt));
        }
        let condition = if self.accept(Token::Semi) {
            None
        } else {
            let expr = self.parse_expression()?;
            self.expect(Token::Semi)?;
            Some(expr)
        };
        let update = if self.accept(Token::RParen) {
            None
        } else {
            let expr = self.parse_expression()?;
            self.expect(Token::RParen)?;
            Some(expr)
        };
        let body = Box::new(self.parse_statement()?);
        Ok(self.stmt(
            start,
            StmtKind::For {
                init,
                condition,
                update,
                body,
            },
        ))
    }

    fn parse_function(&mut self) -> Result<Stmt, ParseError> {
        let start = self.token_start();
        self.expect(Token::KeywordFunction)?;
        let name = self.expect_identifier()?;
        let body_start = self.token_start();
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !self.accept(Token::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.accept(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }
        let body = self.parse_block()?;
        let body_span = Span {
            start: body_start,
            end: body.span.end,
        };
        Ok(self.stmt(
            start,
            StmtKind::Function(FunctionDefinition {
                name,
                params,
                body: Box::new(body),
                body_span,
            }),
        ))
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        let lhs = self.parse_assignment_expression()?;
        self.parse_expression_rest(lhs, start, COMMA_PRECEDENCE)
    }

    fn parse_assignment_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        let lhs = self.parse_unary_expression()?;
        self.parse_expression_rest(lhs, start, ASSIGNMENT_PRECEDENCE)
    }

    /// Folds binary operators into `lhs` while they bind at least as
    /// tightly as `outer_precedence`. `start` is the offset of the first
    /// token of `lhs`, which may sit before `lhs.span` when the operand is
    /// parenthesized.
    fn parse_expression_rest(
        &mut self,
        mut lhs: Expr,
        start: u32,
        outer_precedence: u8,
    ) -> Result<Expr, ParseError> {
        loop {
            let op_token = self.lex.token;
            let precedence = op_token.precedence();
            if precedence > outer_precedence {
                return Ok(lhs);
            }
            self.lex.next();
            if op_token == Token::Question {
                let consequent = self.parse_assignment_expression()?;
                self.expect(Token::Colon)?;
                let alternate = self.parse_assignment_expression()?;
                lhs = self.expr(
                    start,
                    ExprKind::Conditional {
                        condition: Box::new(lhs),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    },
                );
                continue;
            }
            let rhs_start = self.token_start();
            let mut rhs = self.parse_unary_expression()?;
            loop {
                let look_ahead = self.lex.token;
                let look_ahead_precedence = look_ahead.precedence();
                if look_ahead_precedence > precedence
                    || (look_ahead_precedence == precedence && !look_ahead.is_right_associative())
                {
                    break;
                }
                rhs = self.parse_expression_rest(rhs, rhs_start, look_ahead_precedence)?;
            }
            lhs = self.expr(
                start,
                ExprKind::Binary {
                    op: BinaryOp::from(op_token),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
    }

    fn parse_unary_expression(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.error("expression is nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_unary_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        match self.lex.token {
            token @ (Token::KeywordDelete
            | Token::KeywordVoid
            | Token::KeywordTypeOf
            | Token::Inc
            | Token::Dec
            | Token::Add
            | Token::Sub
            | Token::BNot
            | Token::Not) => {
                self.lex.next();
                let operand = self.parse_unary_expression()?;
                Ok(self.expr(
                    start,
                    ExprKind::Prefix {
                        op: PrefixOp::from(token),
                        operand: Box::new(operand),
                    },
                ))
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        let lhs = self.parse_left_hand_side_expression()?;
        // A postfix operator may not be separated from its operand by a
        // line terminator.
        if self.lex.has_newline_before {
            return Ok(lhs);
        }
        match self.lex.token {
            token @ (Token::Inc | Token::Dec) => {
                self.lex.next();
                Ok(self.expr(
                    start,
                    ExprKind::Postfix {
                        op: PostfixOp::from(token),
                        operand: Box::new(lhs),
                    },
                ))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        let mut expr = self.parse_member_expression()?;
        loop {
            expr = match self.lex.token {
                Token::LParen => {
                    let arguments = self.parse_argument_list()?;
                    self.expr(
                        start,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                    )
                }
                Token::LBrack => self.parse_index_suffix(expr, start)?,
                Token::Dot => self.parse_dot_suffix(expr, start)?,
                _ => return Ok(expr),
            };
        }
    }

    fn parse_member_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        let mut expr = if self.accept(Token::KeywordNew) {
            // `new M Arguments?`: an argument list directly after the
            // member expression belongs to the `new`.
            let callee_start = self.token_start();
            let mut callee = self.parse_member_expression()?;
            if self.lex.token == Token::LParen {
                let arguments = self.parse_argument_list()?;
                callee = self.expr(
                    callee_start,
                    ExprKind::Call {
                        callee: Box::new(callee),
                        arguments,
                    },
                );
            }
            self.expr(
                start,
                ExprKind::Prefix {
                    op: PrefixOp::New,
                    operand: Box::new(callee),
                },
            )
        } else {
            self.parse_primary_expression()?
        };
        loop {
            expr = match self.lex.token {
                Token::LBrack => self.parse_index_suffix(expr, start)?,
                Token::Dot => self.parse_dot_suffix(expr, start)?,
                _ => return Ok(expr),
            };
        }
    }

    fn parse_index_suffix(&mut self, lhs: Expr, start: u32) -> Result<Expr, ParseError> {
        self.expect(Token::LBrack)?;
        let index = self.parse_expression()?;
        self.expect(Token::RBrack)?;
        Ok(self.expr(
            start,
            ExprKind::Binary {
                op: BinaryOp::Index,
                lhs: Box::new(lhs),
                rhs: Box::new(index),
            },
        ))
    }

    /// `a.b` parses as a binary dot whose right side is a string literal
    /// of the property name.
    fn parse_dot_suffix(&mut self, lhs: Expr, start: u32) -> Result<Expr, ParseError> {
        self.expect(Token::Dot)?;
        let name_start = self.token_start();
        let name = self.expect_identifier()?;
        let property = self.expr(name_start, ExprKind::Literal(Literal::String(name)));
        Ok(self.expr(
            start,
            ExprKind::Binary {
                op: BinaryOp::Dot,
                lhs: Box::new(lhs),
                rhs: Box::new(property),
            },
        ))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen)?;
        let mut arguments = Vec::new();
        if !self.accept(Token::RParen) {
            loop {
                arguments.push(self.parse_assignment_expression()?);
                if !self.accept(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.token_start();
        match self.lex.token {
            Token::Ident => {
                let span = self.bump();
                let name = span.text(self.source).into();
                Ok(self.expr(start, ExprKind::Identifier(name)))
            }
            Token::KeywordThis => {
                self.lex.next();
                Ok(self.expr(start, ExprKind::Identifier("this".into())))
            }
            Token::LParen => {
                self.lex.next();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Number => {
                let span = self.bump();
                match lexer::number_value(span.text(self.source)) {
                    Ok(value) => Ok(self.expr(start, ExprKind::Literal(Literal::Number(value)))),
                    Err(NumberError::TooManyDigits) => Err(self.error_at(
                        span,
                        "number literal has more than 17 significant digits",
                    )),
                    Err(NumberError::Malformed) => {
                        Err(self.error_at(span, "malformed number literal"))
                    }
                }
            }
            Token::String => {
                let span = self.bump();
                let value = lexer::string_value(span.text(self.source));
                Ok(self.expr(start, ExprKind::Literal(Literal::String(value.into()))))
            }
            Token::Regex => {
                let span = self.bump();
                let text = span.text(self.source).into();
                Ok(self.expr(start, ExprKind::Literal(Literal::Regex(text))))
            }
            Token::KeywordTrue => {
                self.lex.next();
                Ok(self.expr(start, ExprKind::Literal(Literal::Boolean(true))))
            }
            Token::KeywordFalse => {
                self.lex.next();
                Ok(self.expr(start, ExprKind::Literal(Literal::Boolean(false))))
            }
            Token::KeywordNull => {
                self.lex.next();
                Ok(self.expr(start, ExprKind::Literal(Literal::Null)))
            }
            token @ (Token::Invalid
            | Token::InvalidString
            | Token::InvalidNumber
            | Token::InvalidRegex
            | Token::InvalidComment) => Err(self.error(token.describe().to_string())),
            token => Err(self.error(format!(
                "expected an expression, found {}",
                token.describe()
            ))),
        }
    }
}
