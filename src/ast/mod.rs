pub mod bind;
pub mod comments;
pub mod js_number;
pub mod visit;

pub use js_number::JsNumber;
use num_bigint::BigInt;

use crate::ast::bind::SymbolId;

/// Byte range into the original source, used to attribute diagnostics and to
/// attach leading comments. Positions are parser-supplied and never
/// interpreted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub lo: u32,
    pub hi: u32,
}

pub const DUMMY_SP: Span = Span { lo: 0, hi: 0 };

impl Span {
    pub fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }
}

/// A parsed module body as supplied by the host parser. Identifiers carry no
/// symbols until [`bind::bind_module`] has run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub sym: String,
    pub span: Span,
    /// Filled in by the binder. `None` means unbound, either because binding
    /// has not run yet or because the name resolves to nothing in scope.
    pub symbol: Option<SymbolId>,
}

impl Ident {
    pub fn new(sym: impl Into<String>, span: Span) -> Self {
        Self {
            sym: sym.into(),
            span,
            symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Import(ImportDecl),
    ExportDecl(ExportDecl),
    ExportNamed(NamedExport),
    ExportDefault(ExportDefault),
    ExportStar(ExportStar),
    Decl(Decl),
    Expr(ExprStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Break(Span),
    Continue(Span),
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Import(s) => s.span,
            Stmt::ExportDecl(s) => s.span,
            Stmt::ExportNamed(s) => s.span,
            Stmt::ExportDefault(s) => s.span,
            Stmt::ExportStar(s) => s.span,
            Stmt::Decl(d) => d.span(),
            Stmt::Expr(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Empty(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import { imported as local }`. `imported` is `None` when the local
    /// name is the imported name.
    Named {
        local: Ident,
        imported: Option<String>,
    },
    Default { local: Ident },
    Namespace { local: Ident },
}

impl ImportSpecifier {
    pub fn local(&self) -> &Ident {
        match self {
            ImportSpecifier::Named { local, .. }
            | ImportSpecifier::Default { local }
            | ImportSpecifier::Namespace { local } => local,
        }
    }

    /// Name under which the source module exports this binding. Namespace
    /// imports have no single source name.
    pub fn imported_name(&self) -> Option<&str> {
        match self {
            ImportSpecifier::Named { local, imported } => {
                Some(imported.as_deref().unwrap_or(&local.sym))
            }
            ImportSpecifier::Default { .. } => Some("default"),
            ImportSpecifier::Namespace { .. } => None,
        }
    }
}

/// `export const x = ...`, `export function f() {}`, `export class C {}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDecl {
    pub decl: Decl,
    pub span: Span,
}

/// `export { a as b }` and `export { a as b } from "m"`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedExport {
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    /// Local binding (or source-module name for the `from` form).
    pub orig: Ident,
    pub exported: Option<String>,
    pub span: Span,
}

impl ExportSpecifier {
    pub fn exported_name(&self) -> &str {
        self.exported.as_deref().unwrap_or(&self.orig.sym)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefault {
    pub decl: DefaultDecl,
    /// Filled by the binder. Anonymous defaults get a synthetic symbol so
    /// the export participates in liveness like any named binding.
    pub symbol: Option<SymbolId>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultDecl {
    Fn(FnExpr),
    Class(ClassExpr),
    Expr(Expr),
}

/// `export * from "m"` and `export * as ns from "m"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportStar {
    pub source: String,
    pub alias: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Class(ClassDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Var(d) => d.span,
            Decl::Fn(d) => d.span,
            Decl::Class(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarDeclKind,
    pub decls: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: Pat,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub ident: Ident,
    pub function: Function,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub ident: Ident,
    pub class: Class,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<Pat>,
    pub body: BlockStmt,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub super_class: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub key: PropName,
    pub is_static: bool,
    pub body: ClassMemberBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberBody {
    Method(Function),
    Property(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    Ident(Ident),
    /// `pat = default`.
    Assign(AssignPat),
    /// `...pat`.
    Rest(Box<Pat>),
    Array(ArrayPat),
    Object(ObjectPat),
}

impl Pat {
    /// Whether binding this pattern is more than a plain rename. Inlining
    /// declines parameters for which this holds.
    pub fn is_complex(&self) -> bool {
        !matches!(self, Pat::Ident(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignPat {
    pub pat: Box<Pat>,
    pub default: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPat {
    pub elems: Vec<Option<Pat>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPat {
    pub props: Vec<ObjectPatProp>,
    pub rest: Option<Box<Pat>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatProp {
    pub key: PropName,
    /// `None` for the shorthand form, where the key ident is the binding.
    pub value: Option<Pat>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub test: Expr,
    pub cons: Box<Stmt>,
    pub alt: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<ForInit>,
    pub test: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub arg: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStmt {
    pub arg: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Lit(Lit),
    Tpl(Tpl),
    Unary(UnaryExpr),
    Update(UpdateExpr),
    Bin(BinExpr),
    Cond(CondExpr),
    Assign(AssignExpr),
    Call(CallExpr),
    New(NewExpr),
    Member(MemberExpr),
    Seq(SeqExpr),
    Fn(FnExpr),
    Arrow(ArrowExpr),
    Object(ObjectLit),
    Array(ArrayLit),
    Class(ClassExpr),
    /// `import.meta`.
    MetaProp(Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(i) => i.span,
            Expr::Lit(_) => DUMMY_SP,
            Expr::Tpl(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Update(e) => e.span,
            Expr::Bin(e) => e.span,
            Expr::Cond(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Seq(e) => e.span,
            Expr::Fn(e) => e.function.span,
            Expr::Arrow(e) => e.span,
            Expr::Object(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Class(e) => e.class.span,
            Expr::MetaProp(span) => *span,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Expr::Ident(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_lit(&self) -> Option<&Lit> {
        match self {
            Expr::Lit(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str_lit(&self) -> Option<&str> {
        match self {
            Expr::Lit(Lit::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn undefined() -> Expr {
        Expr::Lit(Lit::Undefined)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Str(String),
    Num(JsNumber),
    BigInt(BigInt),
    Bool(bool),
    Null,
    /// Produced by folding (`void 0`, calls of empty functions). Parsers emit
    /// the `undefined` identifier instead, which binding leaves unbound.
    Undefined,
}

/// Template literal; `quasis` holds the cooked string parts and is always one
/// longer than `exprs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tpl {
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Bang,
    Tilde,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub arg: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Incr,
    Decr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpr {
    pub op: UpdateOp,
    pub prefix: bool,
    pub arg: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    LShift,
    RShift,
    ZeroFillRShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    InstanceOf,
    And,
    Or,
    NullishCoalescing,
}

impl BinaryOp {
    pub fn is_equality(&self) -> bool {
        matches!(
            self,
            BinaryOp::EqEq | BinaryOp::NotEq | BinaryOp::EqEqEq | BinaryOp::NotEqEq
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondExpr {
    pub test: Box<Expr>,
    pub cons: Box<Expr>,
    pub alt: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr {
    /// `None` is plain `=`; `Some(op)` is the compound form.
    pub op: Option<BinaryOp>,
    pub target: AssignTarget,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Ident(Ident),
    Member(MemberExpr),
    Pat(Pat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Arg>,
    /// Set when a `@__PURE__`/`#__PURE__` block comment immediately precedes
    /// the call. See [`comments::CommentStore::stamp_pure_calls`].
    pub pure: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Expr(Box<Expr>),
    /// Dynamic `import(...)`.
    Import,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Arg>,
    pub pure: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub spread: bool,
    pub expr: Expr,
}

impl Arg {
    pub fn plain(expr: Expr) -> Arg {
        Arg {
            spread: false,
            expr,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub obj: Box<Expr>,
    pub prop: MemberProp,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Ident(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeqExpr {
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnExpr {
    pub ident: Option<Ident>,
    pub function: Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowExpr {
    pub params: Vec<Pat>,
    pub body: Box<ArrowBody>,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Block(BlockStmt),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLit {
    pub props: Vec<Prop>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue { key: PropName, value: Expr },
    Shorthand(Ident),
    Method { key: PropName, function: Function },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropName {
    Ident(String),
    Str(String),
    Num(JsNumber),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLit {
    /// `None` is an elision.
    pub elems: Vec<Option<Arg>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassExpr {
    pub ident: Option<Ident>,
    pub class: Class,
}
