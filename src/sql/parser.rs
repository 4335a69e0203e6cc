//! SQL Parser
//!
//! This module parses SQL tokens into an AST by recursive descent.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::ColumnType;
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        // Consume optional trailing semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }
        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create(),
            Token::Use => self.parse_use(),
            Token::Close => self.parse_close(),
            Token::Show => self.parse_show(),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Eof => Err(Error::UnexpectedEof("a statement".to_string())),
            other => Err(Error::UnexpectedToken {
                expected: "CREATE, USE, CLOSE, SHOW, INSERT, SELECT, UPDATE, or DELETE"
                    .to_string(),
                found: format!("{}", other),
            }),
        }
    }

    // ========== CREATE ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;
        match self.current() {
            Token::Database => {
                self.advance();
                Ok(Statement::CreateDatabase(self.expect_identifier()?))
            }
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Index => self.parse_create_index().map(Statement::CreateIndex),
            other => Err(Error::UnexpectedToken {
                expected: "DATABASE, TABLE, or INDEX".to_string(),
                found: format!("{}", other),
            }),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let ty = self.parse_column_type()?;
            columns.push(ColumnDecl { name, ty });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
        })
    }

    fn parse_column_type(&mut self) -> Result<ColumnType> {
        match self.current().clone() {
            Token::Int | Token::Integer => {
                self.advance();
                Ok(ColumnType::Int32)
            }
            Token::Float | Token::Real => {
                self.advance();
                Ok(ColumnType::Float32)
            }
            Token::Char => {
                self.advance();
                self.expect(&Token::LParen)?;
                let n = match self.current().clone() {
                    Token::IntegerLiteral(n) => {
                        self.advance();
                        n
                    }
                    other => {
                        return Err(Error::UnexpectedToken {
                            expected: "CHAR width".to_string(),
                            found: format!("{}", other),
                        })
                    }
                };
                self.expect(&Token::RParen)?;
                if !(1..=65535).contains(&n) {
                    return Err(Error::BadCharWidth(n));
                }
                Ok(ColumnType::Char(n as u16))
            }
            other => Err(Error::BadTypeDeclaration(format!("{}", other))),
        }
    }

    fn parse_create_index(&mut self) -> Result<CreateIndexStatement> {
        self.expect(&Token::Index)?;
        let index_name = self.expect_identifier()?;
        self.expect(&Token::On)?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::LParen)?;
        let column = self.expect_identifier()?;
        self.expect(&Token::RParen)?;

        Ok(CreateIndexStatement {
            index_name,
            table_name,
            column,
        })
    }

    // ========== USE / CLOSE / SHOW ==========

    fn parse_use(&mut self) -> Result<Statement> {
        self.expect(&Token::Use)?;
        Ok(Statement::UseDatabase(self.expect_identifier()?))
    }

    fn parse_close(&mut self) -> Result<Statement> {
        self.expect(&Token::Close)?;
        if self.check(&Token::Database) {
            self.advance();
        }
        Ok(Statement::CloseDatabase)
    }

    fn parse_show(&mut self) -> Result<Statement> {
        self.expect(&Token::Show)?;
        self.expect(&Token::Tables)?;
        Ok(Statement::ShowTables)
    }

    // ========== INSERT ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;
        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        if columns.len() != values.len() {
            return Err(Error::ParseError(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== SELECT ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let projection = if self.check(&Token::Asterisk) {
            self.advance();
            Projection::Wildcard
        } else {
            Projection::Columns(self.parse_identifier_list()?)
        };

        self.expect(&Token::From)?;
        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_optional_where()?;

        Ok(SelectStatement {
            projection,
            table_name,
            where_clause,
        })
    }

    // ========== UPDATE ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let literal = self.parse_literal()?;
            assignments.push((column, literal));

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;
        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    // ========== WHERE ==========

    fn parse_optional_where(&mut self) -> Result<Option<WhereExpr>> {
        if !self.check(&Token::Where) {
            return Ok(None);
        }
        self.advance();

        let first = self.parse_predicate()?;
        let rest = match self.current() {
            Token::And => {
                self.advance();
                Some((Connective::And, self.parse_predicate()?))
            }
            Token::Or => {
                self.advance();
                Some((Connective::Or, self.parse_predicate()?))
            }
            _ => None,
        };
        Ok(Some(WhereExpr { first, rest }))
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        let column = self.expect_identifier()?;
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "a comparison operator".to_string(),
                    found: format!("{}", other),
                })
            }
        };
        self.advance();
        let literal = self.parse_literal()?;

        Ok(Predicate {
            column,
            op,
            literal,
        })
    }

    // ========== Building blocks ==========

    /// A literal: number, quoted string, or bare word (CHAR literals may
    /// be unquoted)
    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.current().clone() {
            Token::IntegerLiteral(n) => Literal::Integer(n),
            Token::FloatLiteral(n) => Literal::Float(n),
            Token::StringLiteral(s) => Literal::Str(s),
            Token::Identifier(s) => Literal::Str(s),
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "a literal".to_string(),
                    found: format!("{}", other),
                })
            }
        };
        self.advance();
        Ok(literal)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut names = vec![self.expect_identifier()?];
        while self.check(&Token::Comma) {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            Token::Eof => Err(Error::UnexpectedEof("an identifier".to_string())),
            other => Err(Error::UnexpectedToken {
                expected: "an identifier".to_string(),
                found: format!("{}", other),
            }),
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else if self.check(&Token::Eof) {
            Err(Error::UnexpectedEof(format!("{}", token)))
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn is_at_end(&self) -> bool {
        self.check(&Token::Eof)
    }
}
