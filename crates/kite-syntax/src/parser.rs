//! Recursive-descent parser for Kite script.
//!
//! Statements end at a newline, `;` or `}`. An expression continues onto
//! the next line only when that line starts with `.`, `?:`, `&&` or `||`,
//! or when the line break sits inside parentheses.
//!
//! The parser never fails: problems become diagnostics and the tree gets
//! [`NodeKind::Missing`] placeholders.

use crate::ast::{BinaryOp, NodeArena, NodeIndex, NodeKind, NodeList, UnaryOp};
use crate::scanner::ScannerState;
use crate::token::SyntaxKind;
use kite_common::diagnostics::diagnostic_codes;
use kite_common::limits::MAX_EXPR_DEPTH;
use kite_common::{Diagnostic, Span};
use tracing::{debug, trace};

#[derive(Clone, Debug)]
struct Token {
    kind: SyntaxKind,
    start: u32,
    end: u32,
    value: String,
    line_break_before: bool,
}

impl Token {
    fn text(&self) -> &str {
        match self.kind {
            SyntaxKind::Identifier | SyntaxKind::IntLiteral => &self.value,
            kind => kind.text(),
        }
    }
}

#[derive(Clone, Copy)]
struct Snapshot {
    pos: usize,
    last_end: u32,
    diagnostics: usize,
    nodes: usize,
}

pub struct ParserState {
    file_name: String,
    source_len: u32,
    tokens: Vec<Token>,
    pos: usize,
    last_end: u32,
    arena: NodeArena,
    diagnostics: Vec<Diagnostic>,
    recursion_depth: u32,
    depth_reported: bool,
}

impl ParserState {
    pub fn new(file_name: String, source: String) -> Self {
        let mut scanner = ScannerState::new(file_name.clone(), source);
        let mut tokens = Vec::new();
        let mut pending_break = false;
        loop {
            let kind = scanner.scan();
            let line_break_before = pending_break || scanner.has_preceding_line_break();
            if kind == SyntaxKind::Unknown {
                // Already reported by the scanner.
                pending_break = line_break_before;
                continue;
            }
            pending_break = false;
            tokens.push(Token {
                kind,
                start: scanner.token_start(),
                end: scanner.token_end(),
                value: scanner.token_value().to_string(),
                line_break_before,
            });
            if kind == SyntaxKind::EndOfFile {
                break;
            }
        }
        let source_len = scanner.text().len() as u32;
        let diagnostics = scanner.take_diagnostics();
        trace!(file = %file_name, tokens = tokens.len(), "scanned");
        ParserState {
            file_name,
            source_len,
            tokens,
            pos: 0,
            last_end: 0,
            arena: NodeArena::new(),
            diagnostics,
            recursion_depth: 0,
            depth_reported: false,
        }
    }

    pub fn get_arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn into_arena(self) -> NodeArena {
        self.arena
    }

    pub fn get_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn source_len(&self) -> u32 {
        self.source_len
    }

    /// True when there are errors and every one of them sits exactly at
    /// the end of the input, meaning more text could complete the source.
    pub fn all_errors_at_end_of_input(&self) -> bool {
        let mut errors = self.diagnostics.iter().filter(|d| d.is_error()).peekable();
        errors.peek().is_some() && errors.all(|d| d.start == self.source_len)
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn kind(&self) -> SyntaxKind {
        self.current().kind
    }

    fn nth_kind(&self, n: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + n)
            .map_or(SyntaxKind::EndOfFile, |token| token.kind)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.kind() == kind
    }

    /// `kind` on the same line as the previous token.
    fn at_same_line(&self, kind: SyntaxKind) -> bool {
        self.at(kind) && !self.current().line_break_before
    }

    fn start(&self) -> u32 {
        self.current().start
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.last_end.max(start))
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != SyntaxKind::EndOfFile {
            self.pos += 1;
            self.last_end = token.end;
        }
        token
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error_at_current(diagnostic_codes::EXPECTING_TOKEN, &[kind.text()]);
        false
    }

    fn at_identifier(&self) -> bool {
        self.at(SyntaxKind::Identifier) || self.kind().is_soft_keyword()
    }

    fn expect_identifier(&mut self) -> (String, Span) {
        if self.at_identifier() {
            let token = self.bump();
            let name = match token.kind {
                SyntaxKind::Identifier => token.value,
                kind => kind.text().to_string(),
            };
            return (name, Span::new(token.start, token.end));
        }
        self.error_at_current(diagnostic_codes::EXPECTING_IDENTIFIER, &[]);
        (String::new(), Span::at(self.start()))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.kind(),
            SyntaxKind::Semicolon | SyntaxKind::CloseBrace | SyntaxKind::EndOfFile
        ) || self.current().line_break_before
    }

    fn skip_semicolons(&mut self) {
        while self.eat(SyntaxKind::Semicolon) {}
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            last_end: self.last_end,
            diagnostics: self.diagnostics.len(),
            nodes: self.arena.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.last_end = snapshot.last_end;
        self.diagnostics.truncate(snapshot.diagnostics);
        self.arena.truncate(snapshot.nodes);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn error_at(&mut self, start: u32, length: u32, code: u32, args: &[&str]) {
        // One error per position; follow-on errors from recovery add noise.
        if self.diagnostics.last().is_some_and(|last| last.start == start) {
            return;
        }
        self.diagnostics
            .push(Diagnostic::from_code(&self.file_name, start, length, code, args));
    }

    fn error_at_current(&mut self, code: u32, args: &[&str]) {
        let token = self.current();
        let (start, length) = match token.kind {
            SyntaxKind::EndOfFile => (self.source_len, 0),
            _ => (token.start, token.end - token.start),
        };
        self.error_at(start, length, code, args);
    }

    fn missing(&mut self) -> NodeIndex {
        let at = self.start();
        self.arena.add(NodeKind::Missing, Span::at(at))
    }

    /// Require a statement terminator, skipping the rest of the line if
    /// something else follows.
    fn expect_statement_end(&mut self) {
        if self.eat(SyntaxKind::Semicolon) || self.at_statement_end() {
            return;
        }
        let text = self.current().text().to_string();
        self.error_at_current(diagnostic_codes::UNEXPECTED_TOKEN, &[&text]);
        while !self.at_statement_end() {
            self.bump();
        }
        self.eat(SyntaxKind::Semicolon);
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Parse the whole input as a script.
    pub fn parse_source_file(&mut self) -> NodeIndex {
        let mut imports = NodeList::new();
        let mut statements = NodeList::new();
        self.skip_semicolons();
        while self.at(SyntaxKind::ImportKeyword) {
            imports.push(self.parse_import());
            self.expect_statement_end();
            self.skip_semicolons();
        }
        while !self.at(SyntaxKind::EndOfFile) {
            let before = self.pos;
            statements.push(self.parse_statement(true));
            self.expect_statement_end();
            if self.pos == before {
                let text = self.current().text().to_string();
                self.error_at_current(diagnostic_codes::UNEXPECTED_TOKEN, &[&text]);
                self.bump();
            }
            self.skip_semicolons();
        }
        debug!(
            file = %self.file_name,
            statements = statements.len(),
            errors = self.diagnostics.len(),
            "parsed source file"
        );
        self.arena.add(
            NodeKind::SourceFile { imports, statements },
            Span::new(0, self.source_len),
        )
    }

    fn parse_import(&mut self) -> NodeIndex {
        let start = self.start();
        self.bump();
        let mut path = vec![self.expect_identifier().0];
        let mut all_under = false;
        while self.at_same_line(SyntaxKind::Dot) {
            self.bump();
            if self.eat(SyntaxKind::Asterisk) {
                all_under = true;
                break;
            }
            path.push(self.expect_identifier().0);
        }
        let span = self.span_from(start);
        self.arena.add(NodeKind::Import { path, all_under }, span)
    }

    fn parse_statement(&mut self, top_level: bool) -> NodeIndex {
        let start = self.start();
        let is_private = self.at(SyntaxKind::PrivateKeyword);
        if is_private {
            if !top_level {
                self.error_at_current(diagnostic_codes::UNEXPECTED_TOKEN, &["private"]);
            }
            self.bump();
        }
        match self.kind() {
            SyntaxKind::ValKeyword | SyntaxKind::VarKeyword => self.parse_property(start, is_private),
            SyntaxKind::FunKeyword if top_level => self.parse_function(start, is_private),
            SyntaxKind::FunKeyword | SyntaxKind::ImportKeyword => {
                let text = self.kind().text();
                self.error_at_current(diagnostic_codes::UNEXPECTED_TOKEN, &[text]);
                while !self.at_statement_end() {
                    self.bump();
                }
                self.missing()
            }
            _ if is_private => {
                self.error_at_current(diagnostic_codes::EXPECTING_TOKEN, &["val"]);
                self.missing()
            }
            SyntaxKind::WhileKeyword => self.parse_while(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_property(&mut self, start: u32, is_private: bool) -> NodeIndex {
        let is_var = self.bump().kind == SyntaxKind::VarKeyword;
        let (name, name_span) = self.expect_identifier();
        let ty = if self.eat(SyntaxKind::Colon) {
            self.parse_type()
        } else {
            NodeIndex::NONE
        };
        let initializer = if self.expect(SyntaxKind::Equals) {
            self.parse_expression()
        } else {
            NodeIndex::NONE
        };
        let span = self.span_from(start);
        self.arena.add(
            NodeKind::Property {
                is_private,
                is_var,
                name,
                name_span,
                ty,
                initializer,
            },
            span,
        )
    }

    fn parse_function(&mut self, start: u32, is_private: bool) -> NodeIndex {
        self.bump();
        let mut type_parameters = self.parse_type_parameters();
        let (name, name_span) = self.expect_identifier();
        if type_parameters.is_empty() {
            type_parameters = self.parse_type_parameters();
        }

        let mut parameters = NodeList::new();
        if self.expect(SyntaxKind::OpenParen) {
            while !self.at(SyntaxKind::CloseParen) && !self.at(SyntaxKind::EndOfFile) {
                let parameter_start = self.start();
                let (parameter_name, _) = self.expect_identifier();
                let ty = if self.expect(SyntaxKind::Colon) {
                    self.parse_type()
                } else {
                    self.missing()
                };
                let span = self.span_from(parameter_start);
                parameters.push(self.arena.add(
                    NodeKind::Parameter {
                        name: parameter_name,
                        ty,
                    },
                    span,
                ));
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::CloseParen);
        }

        let return_type = if self.eat(SyntaxKind::Colon) {
            self.parse_type()
        } else {
            NodeIndex::NONE
        };
        let (body, expression_body) = if self.eat(SyntaxKind::Equals) {
            (self.parse_expression(), true)
        } else if self.at(SyntaxKind::OpenBrace) {
            (self.parse_block(), false)
        } else {
            self.error_at_current(diagnostic_codes::EXPECTING_TOKEN, &["{"]);
            (NodeIndex::NONE, false)
        };
        let span = self.span_from(start);
        self.arena.add(
            NodeKind::Function {
                is_private,
                name,
                name_span,
                type_parameters,
                parameters,
                return_type,
                body,
                expression_body,
            },
            span,
        )
    }

    fn parse_type_parameters(&mut self) -> NodeList {
        let mut parameters = NodeList::new();
        if !self.eat(SyntaxKind::LessThan) {
            return parameters;
        }
        loop {
            let start = self.start();
            let (name, _) = self.expect_identifier();
            let bound = if self.eat(SyntaxKind::Colon) {
                self.parse_type()
            } else {
                NodeIndex::NONE
            };
            let span = self.span_from(start);
            parameters.push(self.arena.add(NodeKind::TypeParameter { name, bound }, span));
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::GreaterThan);
        parameters
    }

    pub(crate) fn parse_type(&mut self) -> NodeIndex {
        if !self.at_identifier() {
            self.error_at_current(diagnostic_codes::EXPECTING_TYPE, &[]);
            return self.missing();
        }
        let start = self.start();
        let mut segments = vec![self.expect_identifier().0];
        while self.at(SyntaxKind::Dot) && self.nth_kind(1) == SyntaxKind::Identifier {
            self.bump();
            segments.push(self.expect_identifier().0);
        }
        let mut arguments = NodeList::new();
        if self.at_same_line(SyntaxKind::LessThan) {
            self.bump();
            loop {
                arguments.push(self.parse_type());
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::GreaterThan);
        }
        let nullable = self.at_same_line(SyntaxKind::Question) && {
            self.bump();
            true
        };
        let name = segments.pop().unwrap_or_default();
        let span = self.span_from(start);
        self.arena.add(
            NodeKind::TypeReference {
                qualifier: segments,
                name,
                arguments,
                nullable,
            },
            span,
        )
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> NodeIndex {
        let start = self.start();
        let mut statements = NodeList::new();
        self.expect(SyntaxKind::OpenBrace);
        loop {
            self.skip_semicolons();
            if self.at(SyntaxKind::CloseBrace) || self.at(SyntaxKind::EndOfFile) {
                break;
            }
            let before = self.pos;
            statements.push(self.parse_statement(false));
            self.expect_statement_end();
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(SyntaxKind::CloseBrace);
        let span = self.span_from(start);
        self.arena.add(NodeKind::Block { statements }, span)
    }

    fn parse_expression_statement(&mut self) -> NodeIndex {
        let start = self.start();
        let target = self.parse_expression();
        if !self.at_same_line(SyntaxKind::Equals) {
            return target;
        }
        self.bump();
        let value = self.parse_expression();
        let span = self.span_from(start);
        self.arena.add(NodeKind::Assign { target, value }, span)
    }

    /// Body of `if`, `while`, `when` branches: a block or a single statement.
    fn parse_control_body(&mut self) -> NodeIndex {
        match self.kind() {
            SyntaxKind::OpenBrace => self.parse_block(),
            SyntaxKind::WhileKeyword => self.parse_while(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_while(&mut self) -> NodeIndex {
        let start = self.start();
        self.bump();
        self.expect(SyntaxKind::OpenParen);
        let condition = self.parse_expression();
        self.expect(SyntaxKind::CloseParen);
        let body = self.parse_control_body();
        let span = self.span_from(start);
        self.arena.add(NodeKind::While { condition, body }, span)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub(crate) fn parse_expression(&mut self) -> NodeIndex {
        if !self.enter_nesting() {
            return self.missing();
        }
        let expression = self.parse_binary(1);
        self.recursion_depth -= 1;
        expression
    }

    fn enter_nesting(&mut self) -> bool {
        if self.recursion_depth >= MAX_EXPR_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                self.error_at_current(diagnostic_codes::EXPRESSION_TOO_DEEP, &[]);
            }
            return false;
        }
        self.recursion_depth += 1;
        true
    }

    fn parse_binary(&mut self, min_precedence: u8) -> NodeIndex {
        let start = self.start();
        let mut left = self.parse_prefix();
        loop {
            let Some(op) = binary_op(self.kind()) else {
                break;
            };
            let precedence = precedence(op);
            if precedence < min_precedence {
                break;
            }
            if self.current().line_break_before && !may_start_line(op) {
                break;
            }
            self.bump();
            let right = self.parse_binary(precedence + 1);
            let span = self.span_from(start);
            left = self.arena.add(NodeKind::Binary { op, left, right }, span);
        }
        left
    }

    fn parse_prefix(&mut self) -> NodeIndex {
        let start = self.start();
        let op = match self.kind() {
            SyntaxKind::Minus => UnaryOp::Minus,
            SyntaxKind::Exclamation => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        if op == UnaryOp::Minus && self.is_negative_literal() {
            self.bump();
            let literal = self.bump();
            let value = match literal.value.parse::<u64>() {
                Ok(value) if value <= 1 << 31 => (-(value as i64)) as i32,
                _ => {
                    let text = format!("-{}", literal.value);
                    self.error_at(start, literal.end - start, diagnostic_codes::INT_LITERAL_OUT_OF_RANGE, &[&text]);
                    0
                }
            };
            let span = self.span_from(start);
            return self.arena.add(NodeKind::IntLiteral(value), span);
        }
        self.bump();
        if !self.enter_nesting() {
            return self.missing();
        }
        let operand = self.parse_prefix();
        self.recursion_depth -= 1;
        let span = self.span_from(start);
        self.arena.add(NodeKind::Unary { op, operand }, span)
    }

    /// `-123` not followed by a member access folds into one literal.
    fn is_negative_literal(&self) -> bool {
        if self.nth_kind(1) != SyntaxKind::IntLiteral {
            return false;
        }
        match self.tokens.get(self.pos + 2) {
            Some(next) => next.kind != SyntaxKind::Dot || next.line_break_before,
            None => true,
        }
    }

    fn parse_postfix(&mut self) -> NodeIndex {
        let start = self.start();
        let mut expression = self.parse_primary();
        loop {
            match self.kind() {
                SyntaxKind::Dot => {
                    self.bump();
                    let (name, name_span) = self.expect_identifier();
                    let type_arguments = self.try_parse_call_type_arguments().unwrap_or_default();
                    if self.at_same_line(SyntaxKind::OpenParen) {
                        let arguments = self.parse_arguments();
                        let span = self.span_from(start);
                        expression = self.arena.add(
                            NodeKind::Call {
                                receiver: expression,
                                name,
                                name_span,
                                type_arguments,
                                arguments,
                            },
                            span,
                        );
                    } else {
                        let span = self.span_from(start);
                        expression = self.arena.add(
                            NodeKind::Dot {
                                receiver: expression,
                                name,
                                name_span,
                            },
                            span,
                        );
                    }
                }
                SyntaxKind::OpenParen | SyntaxKind::LessThan if !self.current().line_break_before => {
                    let NodeKind::Name(name) = self.arena.kind(expression).clone() else {
                        break;
                    };
                    let type_arguments = if self.at(SyntaxKind::LessThan) {
                        match self.try_parse_call_type_arguments() {
                            Some(arguments) => arguments,
                            None => break,
                        }
                    } else {
                        NodeList::new()
                    };
                    let name_span = self.arena.span(expression);
                    let arguments = self.parse_arguments();
                    let span = self.span_from(start);
                    expression = self.arena.add(
                        NodeKind::Call {
                            receiver: NodeIndex::NONE,
                            name,
                            name_span,
                            type_arguments,
                            arguments,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        expression
    }

    /// `<T, U>` directly followed by `(`. Anything else rewinds, so `a < b`
    /// stays a comparison.
    fn try_parse_call_type_arguments(&mut self) -> Option<NodeList> {
        if !self.at_same_line(SyntaxKind::LessThan) {
            return None;
        }
        let snapshot = self.snapshot();
        self.bump();
        let mut arguments = NodeList::new();
        loop {
            if !self.at_identifier() {
                self.restore(snapshot);
                return None;
            }
            arguments.push(self.parse_type());
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        let closed = self.eat(SyntaxKind::GreaterThan);
        if !closed
            || !self.at_same_line(SyntaxKind::OpenParen)
            || self.diagnostics.len() != snapshot.diagnostics
        {
            self.restore(snapshot);
            return None;
        }
        Some(arguments)
    }

    fn parse_arguments(&mut self) -> NodeList {
        let mut arguments = NodeList::new();
        self.expect(SyntaxKind::OpenParen);
        while !self.at(SyntaxKind::CloseParen) && !self.at(SyntaxKind::EndOfFile) {
            arguments.push(self.parse_expression());
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::CloseParen);
        arguments
    }

    fn parse_primary(&mut self) -> NodeIndex {
        let start = self.start();
        let kind = match self.kind() {
            SyntaxKind::IntLiteral => {
                let token = self.bump();
                match token.value.parse::<u64>() {
                    Ok(value) if value <= i32::MAX as u64 => NodeKind::IntLiteral(value as i32),
                    _ => {
                        self.error_at(
                            token.start,
                            token.end - token.start,
                            diagnostic_codes::INT_LITERAL_OUT_OF_RANGE,
                            &[&token.value],
                        );
                        NodeKind::IntLiteral(0)
                    }
                }
            }
            SyntaxKind::StringLiteral => NodeKind::StringLiteral(self.bump().value),
            SyntaxKind::TrueKeyword => {
                self.bump();
                NodeKind::BooleanLiteral(true)
            }
            SyntaxKind::FalseKeyword => {
                self.bump();
                NodeKind::BooleanLiteral(false)
            }
            SyntaxKind::NullKeyword => {
                self.bump();
                NodeKind::NullLiteral
            }
            SyntaxKind::Identifier | SyntaxKind::InKeyword | SyntaxKind::OutKeyword => {
                NodeKind::Name(self.expect_identifier().0)
            }
            SyntaxKind::OpenParen => {
                self.bump();
                let inner = self.parse_expression();
                self.expect(SyntaxKind::CloseParen);
                NodeKind::Parenthesized(inner)
            }
            SyntaxKind::IfKeyword => return self.parse_if(),
            SyntaxKind::WhenKeyword => return self.parse_when(),
            SyntaxKind::TryKeyword => return self.parse_try(),
            SyntaxKind::ThrowKeyword => {
                self.bump();
                NodeKind::Throw {
                    value: self.parse_expression(),
                }
            }
            SyntaxKind::ReturnKeyword => {
                self.bump();
                let value = if self.at_statement_end() || self.at(SyntaxKind::CloseParen) {
                    NodeIndex::NONE
                } else {
                    self.parse_expression()
                };
                NodeKind::Return { value }
            }
            _ => {
                self.error_at_current(diagnostic_codes::EXPECTING_EXPRESSION, &[]);
                return self.missing();
            }
        };
        let span = self.span_from(start);
        self.arena.add(kind, span)
    }

    fn parse_if(&mut self) -> NodeIndex {
        let start = self.start();
        self.bump();
        self.expect(SyntaxKind::OpenParen);
        let condition = self.parse_expression();
        self.expect(SyntaxKind::CloseParen);
        let then_branch = self.parse_control_body();
        if self.at(SyntaxKind::Semicolon) && self.nth_kind(1) == SyntaxKind::ElseKeyword {
            self.bump();
        }
        let else_branch = if self.eat(SyntaxKind::ElseKeyword) {
            self.parse_control_body()
        } else {
            NodeIndex::NONE
        };
        let span = self.span_from(start);
        self.arena.add(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    fn parse_when(&mut self) -> NodeIndex {
        let start = self.start();
        self.bump();
        let subject = if self.eat(SyntaxKind::OpenParen) {
            let subject = self.parse_expression();
            self.expect(SyntaxKind::CloseParen);
            subject
        } else {
            NodeIndex::NONE
        };
        let mut entries = NodeList::new();
        if self.expect(SyntaxKind::OpenBrace) {
            loop {
                self.skip_semicolons();
                if self.at(SyntaxKind::CloseBrace) || self.at(SyntaxKind::EndOfFile) {
                    break;
                }
                let before = self.pos;
                entries.push(self.parse_when_entry());
                self.expect_statement_end();
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(SyntaxKind::CloseBrace);
        }
        let span = self.span_from(start);
        self.arena.add(NodeKind::When { subject, entries }, span)
    }

    fn parse_when_entry(&mut self) -> NodeIndex {
        let start = self.start();
        let mut conditions = NodeList::new();
        if !self.eat(SyntaxKind::ElseKeyword) {
            loop {
                conditions.push(self.parse_expression());
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
        }
        let body = if self.expect(SyntaxKind::Arrow) {
            self.parse_control_body()
        } else {
            self.missing()
        };
        let span = self.span_from(start);
        self.arena.add(NodeKind::WhenEntry { conditions, body }, span)
    }

    fn parse_try(&mut self) -> NodeIndex {
        let start = self.start();
        self.bump();
        let body = self.parse_block();
        let mut catches = NodeList::new();
        while self.at(SyntaxKind::CatchKeyword) {
            let catch_start = self.start();
            self.bump();
            self.expect(SyntaxKind::OpenParen);
            let (name, _) = self.expect_identifier();
            let ty = if self.expect(SyntaxKind::Colon) {
                self.parse_type()
            } else {
                self.missing()
            };
            self.expect(SyntaxKind::CloseParen);
            let catch_body = self.parse_block();
            let span = self.span_from(catch_start);
            catches.push(self.arena.add(
                NodeKind::Catch {
                    name,
                    ty,
                    body: catch_body,
                },
                span,
            ));
        }
        let finally = if self.eat(SyntaxKind::FinallyKeyword) {
            self.parse_block()
        } else {
            NodeIndex::NONE
        };
        if catches.is_empty() && finally.is_none() {
            self.error_at_current(diagnostic_codes::EXPECTING_TOKEN, &["catch"]);
        }
        let span = self.span_from(start);
        self.arena.add(
            NodeKind::Try {
                body,
                catches,
                finally,
            },
            span,
        )
    }
}

fn binary_op(kind: SyntaxKind) -> Option<BinaryOp> {
    Some(match kind {
        SyntaxKind::Asterisk => BinaryOp::Times,
        SyntaxKind::Slash => BinaryOp::Div,
        SyntaxKind::Percent => BinaryOp::Rem,
        SyntaxKind::Plus => BinaryOp::Plus,
        SyntaxKind::Minus => BinaryOp::Minus,
        SyntaxKind::LessThan => BinaryOp::Less,
        SyntaxKind::LessThanEquals => BinaryOp::LessEq,
        SyntaxKind::GreaterThan => BinaryOp::Greater,
        SyntaxKind::GreaterThanEquals => BinaryOp::GreaterEq,
        SyntaxKind::EqualsEquals => BinaryOp::Eq,
        SyntaxKind::ExclamationEquals => BinaryOp::NotEq,
        SyntaxKind::AmpersandAmpersand => BinaryOp::And,
        SyntaxKind::BarBar => BinaryOp::Or,
        SyntaxKind::QuestionColon => BinaryOp::Elvis,
        _ => return None,
    })
}

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::NotEq => 3,
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => 4,
        BinaryOp::Elvis => 5,
        BinaryOp::Plus | BinaryOp::Minus => 6,
        BinaryOp::Times | BinaryOp::Div | BinaryOp::Rem => 7,
    }
}

fn may_start_line(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Elvis)
}

#[cfg(test)]
#[path = "../tests/parser_tests.rs"]
mod parser_tests;
