//! A reader for the canonical textual IR form printed by [`crate::display`]:
//! `fun @name(%p0: i32) : i32 { block0: ... }`.
//!
//! Hand-rolled recursive-descent rather than a parser-combinator crate: this
//! grammar is small and fixed, so a direct lexer/parser pair is simpler than pulling
//! in a dependency for it.
//!
//! Limitation: a `phi` source may only name a value already bound earlier in
//! the text (forward references across a loop back-edge are rejected). This
//! covers every program this workspace itself prints, since `AllocToPhi`
//! always places a phi after the definitions it merges.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::entities::BasicBlock;
use crate::entities::Value;
use crate::error::IrError;
use crate::function::Signature;
use crate::instruction::Instruction;
use crate::ops::{BinaryOpKind, UnaryOpKind};
use crate::program::Program;
use crate::terminator::Terminator;
use crate::types::Type;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("invalid integer literal: {0}")]
    InvalidInt(String),
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),
    #[error("undefined name: {0}")]
    UndefinedName(String),
    #[error("duplicate function: {0}")]
    DuplicateFunction(String),
    /// A `call`'s `@name` callee names a function not declared anywhere in
    /// the program being parsed.
    #[error(transparent)]
    UnknownFunction(#[from] IrError),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Fun,
    Global(String),
    Local(String),
    Ident(String),
    Int(i64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Eq,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Fun => "`fun`".into(),
            Token::Global(s) => format!("@{s}"),
            Token::Local(s) => format!("%{s}"),
            Token::Ident(s) => s.clone(),
            Token::Int(n) => n.to_string(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBrace => "{".into(),
            Token::RBrace => "}".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::Colon => ":".into(),
            Token::Comma => ",".into(),
            Token::Eq => "=".into(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars().peekable() }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    // Line comment, also used for `//before`/`//after`/`//unchanged`
                    // fixture annotations, which the reader skips entirely.
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '(' => {
                    self.chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    tokens.push(Token::RParen);
                }
                '{' => {
                    self.chars.next();
                    tokens.push(Token::LBrace);
                }
                '}' => {
                    self.chars.next();
                    tokens.push(Token::RBrace);
                }
                '[' => {
                    self.chars.next();
                    tokens.push(Token::LBracket);
                }
                ']' => {
                    self.chars.next();
                    tokens.push(Token::RBracket);
                }
                ':' => {
                    self.chars.next();
                    tokens.push(Token::Colon);
                }
                ',' => {
                    self.chars.next();
                    tokens.push(Token::Comma);
                }
                '=' => {
                    self.chars.next();
                    tokens.push(Token::Eq);
                }
                '@' => {
                    self.chars.next();
                    tokens.push(Token::Global(self.read_word()));
                }
                '%' => {
                    self.chars.next();
                    tokens.push(Token::Local(self.read_word()));
                }
                c if c == '-' || c.is_ascii_digit() => {
                    tokens.push(self.read_int()?);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_word();
                    if word == "fun" {
                        tokens.push(Token::Fun);
                    } else {
                        tokens.push(Token::Ident(word));
                    }
                }
                other => return Err(ParseError::UnexpectedToken {
                    expected: "a token".into(),
                    found: other.to_string(),
                }),
            }
        }
        Ok(tokens)
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn read_int(&mut self) -> Result<Token, ParseError> {
        let mut text = String::new();
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.chars.next();
        }
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse::<i64>().map(Token::Int).map_err(|_| ParseError::InvalidInt(text))
    }
}

/// A block body as parsed, before the containing function's blocks have all
/// been allocated (needed so forward jump/branch targets resolve).
struct RawBlock {
    label: String,
    lines: Vec<RawLine>,
}

enum RawLine {
    Inst { result: Option<String>, mnemonic: String, args: Vec<RawOperand> },
    Terminator(RawTerminator),
}

enum RawTerminator {
    Branch { cond: RawOperand, if_true: RawOperand, if_false: RawOperand },
    Jump { target: RawOperand },
    Return { value: Option<RawOperand> },
    Exit,
}

#[derive(Clone)]
enum RawOperand {
    Local(String),
    Global(String),
    Int(i64, Type),
    Undef(Type),
    BlockLabel(String),
    Phi(Vec<(String, RawOperand)>, Type),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        let found = self.advance()?;
        if &found == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken { expected: expected.describe(), found: found.describe() })
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance()? {
            Token::Ident(s) => Ok(s),
            other => Err(ParseError::UnexpectedToken { expected: "an identifier".into(), found: other.describe() }),
        }
    }

    fn expect_global(&mut self) -> Result<String, ParseError> {
        match self.advance()? {
            Token::Global(s) => Ok(s),
            other => Err(ParseError::UnexpectedToken { expected: "a @name".into(), found: other.describe() }),
        }
    }

    fn expect_local(&mut self) -> Result<String, ParseError> {
        match self.advance()? {
            Token::Local(s) => Ok(s),
            other => Err(ParseError::UnexpectedToken { expected: "a %name".into(), found: other.describe() }),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let word = self.expect_ident()?;
        parse_type_word(&word)
    }

    fn parse_program(&mut self) -> Result<Vec<ParsedFunction>, ParseError> {
        let mut functions = Vec::new();
        while !self.at_end() {
            functions.push(self.parse_function()?);
        }
        Ok(functions)
    }

    fn parse_function(&mut self) -> Result<ParsedFunction, ParseError> {
        self.expect(&Token::Fun)?;
        let name = self.expect_global()?;
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                let param_name = self.expect_local()?;
                self.expect(&Token::Colon)?;
                let ty = self.parse_type()?;
                params.push((param_name, ty));
                if self.peek() == Some(&Token::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        self.expect(&Token::Colon)?;
        let ret = self.parse_type()?;
        self.expect(&Token::LBrace)?;
        let mut blocks = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            blocks.push(self.parse_block()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(ParsedFunction { name, params, ret, blocks })
    }

    fn parse_block(&mut self) -> Result<RawBlock, ParseError> {
        let label = self.expect_ident()?;
        self.expect(&Token::Colon)?;
        let mut lines = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Ident(_)) if self.is_next_a_label() => break,
                Some(Token::RBrace) | None => break,
                _ => lines.push(self.parse_line()?),
            }
        }
        Ok(RawBlock { label, lines })
    }

    /// Disambiguates a bare identifier that starts a new block label (e.g.
    /// `block1:`) from one that is the first token of a terminator mnemonic
    /// sharing the same shape; in this grammar only block labels are
    /// followed directly by a colon at statement position.
    fn is_next_a_label(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1), Some(Token::Colon))
    }

    fn parse_line(&mut self) -> Result<RawLine, ParseError> {
        if let Some(Token::Local(_)) = self.peek() {
            let result = self.expect_local()?;
            self.expect(&Token::Eq)?;
            let mnemonic = self.expect_ident()?;
            let args = self.parse_args(&mnemonic)?;
            return Ok(RawLine::Inst { result: Some(result), mnemonic, args });
        }
        let mnemonic = self.expect_ident()?;
        match mnemonic.as_str() {
            "store" => {
                let ptr = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let value = self.parse_operand()?;
                Ok(RawLine::Inst { result: None, mnemonic, args: vec![ptr, value] })
            }
            "branch" => {
                let cond = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let if_true = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let if_false = self.parse_operand()?;
                Ok(RawLine::Terminator(RawTerminator::Branch { cond, if_true, if_false }))
            }
            "jump" => {
                let target = self.parse_operand()?;
                Ok(RawLine::Terminator(RawTerminator::Jump { target }))
            }
            "return" => {
                let has_value = match self.peek() {
                    Some(Token::Local(_)) | Some(Token::Int(_)) => true,
                    Some(Token::Ident(word)) => word == "undef",
                    _ => false,
                };
                let value = if has_value { Some(self.parse_operand()?) } else { None };
                Ok(RawLine::Terminator(RawTerminator::Return { value }))
            }
            "exit" => Ok(RawLine::Terminator(RawTerminator::Exit)),
            other => Err(ParseError::UnknownMnemonic(other.to_string())),
        }
    }

    fn parse_args(&mut self, mnemonic: &str) -> Result<Vec<RawOperand>, ParseError> {
        match mnemonic {
            "alloc" => Ok(vec![RawOperand::Undef(self.parse_type()?)]),
            "load" => Ok(vec![self.parse_operand()?]),
            "neg" | "not" => Ok(vec![self.parse_operand()?]),
            "phi" => {
                let ty = Type::Void; // placeholder, resolved from first source at build time
                let mut sources = Vec::new();
                loop {
                    self.expect(&Token::LBracket)?;
                    let label = self.expect_ident()?;
                    self.expect(&Token::Colon)?;
                    let value = self.parse_operand()?;
                    self.expect(&Token::RBracket)?;
                    sources.push((label, value));
                    if self.peek() == Some(&Token::Comma) {
                        self.advance()?;
                    } else {
                        break;
                    }
                }
                Ok(vec![RawOperand::Phi(sources, ty)])
            }
            "call" => {
                let callee = self.parse_operand()?;
                self.expect(&Token::LParen)?;
                let mut args = vec![callee];
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_operand()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.advance()?;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(args)
            }
            binop if BinaryOpKind::from_mnemonic(binop).is_some() => {
                let lhs = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let rhs = self.parse_operand()?;
                Ok(vec![lhs, rhs])
            }
            other => Err(ParseError::UnknownMnemonic(other.to_string())),
        }
    }

    fn parse_operand(&mut self) -> Result<RawOperand, ParseError> {
        match self.advance()? {
            Token::Local(name) => Ok(RawOperand::Local(name)),
            Token::Global(name) => Ok(RawOperand::Global(name)),
            Token::Int(n) => {
                let ty = self.parse_type()?;
                Ok(RawOperand::Int(n, ty))
            }
            Token::Ident(word) if word == "undef" => Ok(RawOperand::Undef(self.parse_type()?)),
            Token::Ident(word) => Ok(RawOperand::BlockLabel(word)),
            other => Err(ParseError::UnexpectedToken { expected: "an operand".into(), found: other.describe() }),
        }
    }
}

fn parse_type_word(word: &str) -> Result<Type, ParseError> {
    match word {
        "void" => Ok(Type::Void),
        "bool" => Ok(Type::bool()),
        _ if word.starts_with('i') && word[1..].chars().all(|c| c.is_ascii_digit()) && word.len() > 1 => {
            word[1..].parse::<u32>().map(Type::Integer).map_err(|_| ParseError::InvalidType(word.to_string()))
        }
        _ => Err(ParseError::InvalidType(word.to_string())),
    }
}

impl BinaryOpKind {
    fn from_mnemonic(s: &str) -> Option<BinaryOpKind> {
        Some(match s {
            "add" => BinaryOpKind::Add,
            "sub" => BinaryOpKind::Sub,
            "mul" => BinaryOpKind::Mul,
            "div" => BinaryOpKind::Div,
            "mod" => BinaryOpKind::Mod,
            "and" => BinaryOpKind::And,
            "or" => BinaryOpKind::Or,
            "xor" => BinaryOpKind::Xor,
            "shl" => BinaryOpKind::Shl,
            "shr" => BinaryOpKind::Shr,
            "eq" => BinaryOpKind::Eq,
            "ne" => BinaryOpKind::Ne,
            "lt" => BinaryOpKind::Lt,
            "le" => BinaryOpKind::Le,
            "gt" => BinaryOpKind::Gt,
            "ge" => BinaryOpKind::Ge,
            _ => return None,
        })
    }
}

impl UnaryOpKind {
    fn from_mnemonic(s: &str) -> Option<UnaryOpKind> {
        Some(match s {
            "neg" => UnaryOpKind::Neg,
            "not" => UnaryOpKind::Not,
            _ => return None,
        })
    }
}

struct ParsedFunction {
    name: String,
    params: Vec<(String, Type)>,
    ret: Type,
    blocks: Vec<RawBlock>,
}

/// Parses a program in the canonical textual form and builds it into
/// `program`. Each `fun` becomes a declared function; the first one parsed
/// is set as the entrypoint if none is set yet.
pub fn parse_into(program: &mut Program, src: &str) -> Result<Vec<crate::entities::Function>, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let parsed = parser.parse_program()?;
    let mut handles = Vec::new();
    for function in parsed {
        if program.function_by_name(&function.name).is_some() {
            return Err(ParseError::DuplicateFunction(function.name));
        }
        let handle = build_function(program, function)?;
        if program.entrypoint().is_none() {
            program.set_entrypoint(handle);
        }
        handles.push(handle);
    }
    Ok(handles)
}

fn build_function(
    program: &mut Program,
    function: ParsedFunction,
) -> Result<crate::entities::Function, ParseError> {
    let signature = Signature::new(function.params.iter().map(|(_, ty)| ty.clone()).collect(), function.ret);
    let handle = program.declare_function(function.name, signature);
    let entry = program.function(handle).entry();

    let mut locals: FxHashMap<String, Value> = FxHashMap::default();
    for (param, value) in function.params.iter().zip(program.function(handle).params.clone()) {
        locals.insert(param.0.clone(), value);
    }

    let mut label_to_block: FxHashMap<String, BasicBlock> = FxHashMap::default();
    for (i, raw) in function.blocks.iter().enumerate() {
        let block = if i == 0 { entry } else { program.create_block(handle) };
        label_to_block.insert(raw.label.clone(), block);
    }

    for raw in &function.blocks {
        let block = label_to_block[&raw.label];
        for line in &raw.lines {
            match line {
                RawLine::Inst { result, mnemonic, args } => {
                    let data = build_instruction(program, &locals, &label_to_block, mnemonic, args)?;
                    let inst = program.push_back(block, data);
                    if let Some(name) = result {
                        let value = program.inst_result(inst).ok_or_else(|| ParseError::UndefinedName(name.clone()))?;
                        locals.insert(name.clone(), value);
                    }
                }
                RawLine::Terminator(term) => {
                    let built = build_terminator(program, &locals, &label_to_block, term)?;
                    program.set_terminator(block, built);
                }
            }
        }
    }
    Ok(handle)
}

fn resolve_operand(
    program: &mut Program,
    locals: &FxHashMap<String, Value>,
    blocks: &FxHashMap<String, BasicBlock>,
    operand: &RawOperand,
) -> Result<Value, ParseError> {
    match operand {
        RawOperand::Local(name) => {
            locals.get(name).copied().ok_or_else(|| ParseError::UndefinedName(format!("%{name}")))
        }
        RawOperand::Global(name) => {
            let function = program.resolve_function(name)?;
            Ok(program.function(function).value)
        }
        RawOperand::Int(n, ty) => Ok(program.make_constant(ty.clone(), *n)),
        RawOperand::Undef(ty) => Ok(program.make_undef(ty.clone())),
        RawOperand::BlockLabel(label) => {
            let block = blocks.get(label).copied().ok_or_else(|| ParseError::UndefinedName(label.clone()))?;
            Ok(program.block(block).value)
        }
        RawOperand::Phi(..) => unreachable!("phi operand only appears as the sole argument of a phi instruction"),
    }
}

fn build_instruction(
    program: &mut Program,
    locals: &FxHashMap<String, Value>,
    blocks: &FxHashMap<String, BasicBlock>,
    mnemonic: &str,
    args: &[RawOperand],
) -> Result<Instruction, ParseError> {
    match mnemonic {
        "alloc" => match &args[0] {
            RawOperand::Undef(ty) => Ok(Instruction::Alloc { inner: ty.clone() }),
            _ => unreachable!(),
        },
        "store" => {
            let ptr = resolve_operand(program, locals, blocks, &args[0])?;
            let value = resolve_operand(program, locals, blocks, &args[1])?;
            Ok(Instruction::Store { ptr, value })
        }
        "load" => {
            let ptr = resolve_operand(program, locals, blocks, &args[0])?;
            Ok(Instruction::Load { ptr })
        }
        "phi" => match &args[0] {
            RawOperand::Phi(sources, _) => {
                let mut map = BTreeMap::new();
                let mut ty = None;
                for (label, operand) in sources {
                    let block = blocks.get(label).copied().ok_or_else(|| ParseError::UndefinedName(label.clone()))?;
                    let value = resolve_operand(program, locals, blocks, operand)?;
                    if ty.is_none() {
                        ty = Some(program.value_type(value).clone());
                    }
                    map.insert(block, value);
                }
                Ok(Instruction::Phi { ty: ty.unwrap_or(Type::Void), sources: map })
            }
            _ => unreachable!(),
        },
        "call" => {
            let callee = resolve_operand(program, locals, blocks, &args[0])?;
            let rest = args[1..]
                .iter()
                .map(|a| resolve_operand(program, locals, blocks, a))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction::Call { callee, args: rest })
        }
        "neg" | "not" => {
            let value = resolve_operand(program, locals, blocks, &args[0])?;
            let op = UnaryOpKind::from_mnemonic(mnemonic).expect("checked by caller");
            Ok(Instruction::UnaryOp { op, value })
        }
        binop => {
            let op = BinaryOpKind::from_mnemonic(binop).ok_or_else(|| ParseError::UnknownMnemonic(binop.to_string()))?;
            let lhs = resolve_operand(program, locals, blocks, &args[0])?;
            let rhs = resolve_operand(program, locals, blocks, &args[1])?;
            Ok(Instruction::BinaryOp { op, lhs, rhs })
        }
    }
}

fn build_terminator(
    program: &mut Program,
    locals: &FxHashMap<String, Value>,
    blocks: &FxHashMap<String, BasicBlock>,
    term: &RawTerminator,
) -> Result<Terminator, ParseError> {
    match term {
        RawTerminator::Branch { cond, if_true, if_false } => Ok(Terminator::Branch {
            cond: resolve_operand(program, locals, blocks, cond)?,
            if_true: resolve_operand(program, locals, blocks, if_true)?,
            if_false: resolve_operand(program, locals, blocks, if_false)?,
        }),
        RawTerminator::Jump { target } => {
            Ok(Terminator::Jump { target: resolve_operand(program, locals, blocks, target)? })
        }
        RawTerminator::Return { value } => Ok(Terminator::Return {
            value: value.as_ref().map(|v| resolve_operand(program, locals, blocks, v)).transpose()?,
        }),
        RawTerminator::Exit => Ok(Terminator::Exit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::FunctionPrinter;

    #[test]
    fn parses_the_canonical_example() {
        let src = r#"
            fun @name(%p0: i32, %p1: i1) : i32 {
              block0:
                %a = alloc i32
                store %a, 5 i32
                jump block1
              block1:
                %v = load %a
                return %v
            }
        "#;
        let mut program = Program::new();
        let handles = parse_into(&mut program, src).unwrap();
        assert_eq!(handles.len(), 1);
        let f = handles[0];
        assert_eq!(program.function(f).name, "name");
        assert_eq!(program.function(f).blocks().len(), 2);
        let printed = format!("{}", FunctionPrinter::new(&program, f));
        assert!(printed.contains("alloc i32"));
        assert!(printed.contains("load"));
    }

    #[test]
    fn parses_a_phi_over_two_predecessors() {
        let src = r#"
            fun @f(%c: i1) : i32 {
              entry:
                %a = alloc i32
                branch %c, then, else
              then:
                store %a, 1 i32
                jump join
              else:
                store %a, 2 i32
                jump join
              join:
                %v = phi [then: 1 i32], [else: 2 i32]
                return %v
            }
        "#;
        let mut program = Program::new();
        let handles = parse_into(&mut program, src).unwrap();
        let f = handles[0];
        assert_eq!(program.function(f).blocks().len(), 4);
    }

    #[test]
    fn rejects_unknown_mnemonics() {
        let src = "fun @f() : void { block0: frobnicate }";
        let mut program = Program::new();
        assert!(matches!(parse_into(&mut program, src), Err(ParseError::UnknownMnemonic(_))));
    }

    #[test]
    fn parses_a_call_to_a_previously_declared_function() {
        let src = r#"
            fun @double(%p0: i32) : i32 {
              block0:
                %r = mul %p0, 2 i32
                return %r
            }

            fun @main() : i32 {
              block0:
                %v = call @double(5 i32)
                return %v
            }
        "#;
        let mut program = Program::new();
        let handles = parse_into(&mut program, src).unwrap();
        let main = handles[1];
        assert!(program.block(program.function(main).entry()).insts().iter().any(|&i| program.inst(i).data.is_call()));
    }

    #[test]
    fn rejects_a_call_to_an_undeclared_function() {
        let src = r#"
            fun @main() : i32 {
              block0:
                %v = call @missing(5 i32)
                return %v
            }
        "#;
        let mut program = Program::new();
        assert!(matches!(parse_into(&mut program, src), Err(ParseError::UnknownFunction(IrError::NotFound(_)))));
    }
}
