//! Parse Module for the styles injector
//!
//! Parses a module with oxc and lowers the parts of the program the query
//! engine cares about into the owned [`SourceTree`]. The oxc allocator lives
//! only for the duration of [`parse_module`].

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, AssignmentTarget, Declaration, ExportDefaultDeclarationKind,
    Expression, Function, ImportDeclarationSpecifier, ModuleExportName, Program, Statement,
    StringLiteral,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use regex::Regex;
use serde_json::{Number, Value};

use crate::tree::{Comment, Identifier, Node, NodeKind, SourceTree, Span};
use crate::validate::{Result, StylesInjectError};

lazy_static! {
    static ref TS_RE: Regex = Regex::new(r"(?:lang\.tsx?(?:$|&))|(?:\.tsx?$)").unwrap();
    static ref JSX_RE: Regex = Regex::new(r"(?:lang\.[jt]sx(?:$|&))|(?:\.[jt]sx$)").unwrap();
}

/// Pick the oxc source type for a module identity.
///
/// Modules are always ES modules. TypeScript and JSX are only switched on when
/// the identity says so, since the TS grammar rejects some valid JS.
pub fn source_type_for(identity: &str) -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(TS_RE.is_match(identity))
        .with_jsx(JSX_RE.is_match(identity))
}

/// Parse one module's source into a [`SourceTree`].
///
/// Any syntax error is fatal: skipping a module could emit a component with
/// its injection call missing.
pub fn parse_module(code: &str, identity: &str) -> Result<SourceTree> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, source_type_for(identity)).parse();

    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        let (line, column) = line_column(code, offset);
        return Err(StylesInjectError::parse(
            &format!("Invalid module syntax: {}", error),
            identity,
            line,
            column,
        ));
    }
    if ret.panicked {
        return Err(StylesInjectError::parse(
            "Parser aborted without a diagnostic.",
            identity,
            0,
            0,
        ));
    }

    Ok(SourceTree {
        root: lower_program(&ret.program),
        comments: collect_comments(&ret.program, code),
    })
}

fn line_column(code: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(code.len());
    let before = code.get(..offset).unwrap_or(code);
    let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    (line as u32, column as u32)
}

fn collect_comments(program: &Program, code: &str) -> Vec<Comment> {
    program
        .comments
        .iter()
        .filter_map(|comment| {
            let raw = code.get(comment.span.start as usize..comment.span.end as usize)?;
            let text = if let Some(line) = raw.strip_prefix("//") {
                line
            } else {
                raw.strip_prefix("/*")
                    .and_then(|r| r.strip_suffix("*/"))
                    .unwrap_or(raw)
            };
            Some(Comment {
                text: text.trim().to_string(),
                span: comment.span.into(),
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

fn lower_program(program: &Program) -> Node {
    Node::new(
        NodeKind::Program {
            body: program.body.iter().map(lower_statement).collect(),
        },
        program.span.into(),
    )
}

fn lower_statement(stmt: &Statement) -> Node {
    match stmt {
        Statement::ImportDeclaration(decl) => {
            let specifiers = decl
                .specifiers
                .as_ref()
                .map(|specs| specs.iter().map(lower_import_specifier).collect())
                .unwrap_or_default();
            Node::new(
                NodeKind::ImportDeclaration {
                    source: Box::new(lower_string_literal(&decl.source)),
                    specifiers,
                },
                decl.span.into(),
            )
        }
        Statement::ExportNamedDeclaration(decl) => Node::new(
            NodeKind::ExportNamedDeclaration {
                declaration: decl
                    .declaration
                    .as_ref()
                    .map(|d| Box::new(lower_declaration(d))),
                source: decl
                    .source
                    .as_ref()
                    .map(|s| Box::new(lower_string_literal(s))),
            },
            decl.span.into(),
        ),
        Statement::ExportDefaultDeclaration(decl) => {
            let inner = match &decl.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => lower_function(func),
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    Node::other("ClassDeclaration", class.span.into())
                }
                other => match other.as_expression() {
                    Some(expr) => lower_expression(expr),
                    None => Node::other("Declaration", other.span().into()),
                },
            };
            Node::new(
                NodeKind::ExportDefaultDeclaration {
                    declaration: Box::new(inner),
                },
                decl.span.into(),
            )
        }
        Statement::FunctionDeclaration(func) => lower_function(func),
        Statement::ExpressionStatement(stmt) => Node::new(
            NodeKind::ExpressionStatement {
                expression: Box::new(lower_expression(&stmt.expression)),
            },
            stmt.span.into(),
        ),
        other => Node::other(statement_tag(other), other.span().into()),
    }
}

fn lower_declaration(decl: &Declaration) -> Node {
    match decl {
        Declaration::FunctionDeclaration(func) => lower_function(func),
        Declaration::VariableDeclaration(var) => {
            Node::other("VariableDeclaration", var.span.into())
        }
        Declaration::ClassDeclaration(class) => Node::other("ClassDeclaration", class.span.into()),
        other => Node::other("Declaration", other.span().into()),
    }
}

fn lower_function(func: &Function) -> Node {
    Node::new(
        NodeKind::FunctionDeclaration {
            id: func
                .id
                .as_ref()
                .map(|id| Identifier::new(id.name.to_string(), id.span.into())),
            body: func.body.as_ref().map(|body| body.span.into()),
            is_async: func.r#async,
            generator: func.generator,
        },
        func.span.into(),
    )
}

fn lower_import_specifier(specifier: &ImportDeclarationSpecifier) -> Node {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(s) => {
            let imported = match &s.imported {
                ModuleExportName::IdentifierName(id) => {
                    Identifier::new(id.name.to_string(), id.span.into())
                }
                ModuleExportName::IdentifierReference(id) => {
                    Identifier::new(id.name.to_string(), id.span.into())
                }
                ModuleExportName::StringLiteral(lit) => {
                    Identifier::new(lit.value.to_string(), lit.span.into())
                }
            };
            Node::new(
                NodeKind::ImportSpecifier {
                    imported,
                    local: Identifier::new(s.local.name.to_string(), s.local.span.into()),
                },
                s.span.into(),
            )
        }
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => Node::new(
            NodeKind::ImportDefaultSpecifier {
                local: Identifier::new(s.local.name.to_string(), s.local.span.into()),
            },
            s.span.into(),
        ),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => Node::new(
            NodeKind::ImportNamespaceSpecifier {
                local: Identifier::new(s.local.name.to_string(), s.local.span.into()),
            },
            s.span.into(),
        ),
    }
}

fn lower_string_literal(lit: &StringLiteral) -> Node {
    Node::new(
        NodeKind::Literal {
            value: Value::from(lit.value.to_string()),
        },
        lit.span.into(),
    )
}

fn lower_expression(expr: &Expression) -> Node {
    let span: Span = expr.span().into();
    match expr {
        Expression::CallExpression(call) => Node::new(
            NodeKind::CallExpression {
                callee: Box::new(lower_expression(&call.callee)),
                arguments: call.arguments.iter().map(lower_argument).collect(),
            },
            span,
        ),
        Expression::ArrayExpression(array) => Node::new(
            NodeKind::ArrayExpression {
                elements: array.elements.iter().map(lower_array_element).collect(),
            },
            span,
        ),
        Expression::AssignmentExpression(assign) => {
            let left = match &assign.left {
                AssignmentTarget::AssignmentTargetIdentifier(id) => Node::new(
                    NodeKind::Identifier {
                        name: id.name.to_string(),
                    },
                    id.span.into(),
                ),
                AssignmentTarget::StaticMemberExpression(m) => {
                    Node::other("MemberExpression", m.span.into())
                }
                AssignmentTarget::ComputedMemberExpression(m) => {
                    Node::other("MemberExpression", m.span.into())
                }
                other => Node::other("Pattern", other.span().into()),
            };
            Node::new(
                NodeKind::AssignmentExpression {
                    operator: assign.operator.as_str().to_string(),
                    left: Box::new(left),
                    right: Box::new(lower_expression(&assign.right)),
                },
                span,
            )
        }
        Expression::Identifier(id) => Node::new(
            NodeKind::Identifier {
                name: id.name.to_string(),
            },
            span,
        ),
        Expression::StringLiteral(lit) => lower_string_literal(lit),
        Expression::NumericLiteral(lit) => Node::new(
            NodeKind::Literal {
                value: Number::from_f64(lit.value).map_or(Value::Null, Value::Number),
            },
            span,
        ),
        Expression::BooleanLiteral(lit) => Node::new(
            NodeKind::Literal {
                value: Value::Bool(lit.value),
            },
            span,
        ),
        Expression::NullLiteral(_) => Node::new(NodeKind::Literal { value: Value::Null }, span),
        Expression::ParenthesizedExpression(paren) => lower_expression(&paren.expression),
        other => Node::other(expression_tag(other), span),
    }
}

fn lower_argument(arg: &Argument) -> Node {
    match arg.as_expression() {
        Some(expr) => lower_expression(expr),
        None => Node::other("SpreadElement", arg.span().into()),
    }
}

fn lower_array_element(element: &ArrayExpressionElement) -> Node {
    match element {
        ArrayExpressionElement::SpreadElement(spread) => {
            Node::other("SpreadElement", spread.span.into())
        }
        ArrayExpressionElement::Elision(elision) => Node::other("Elision", elision.span.into()),
        other => match other.as_expression() {
            Some(expr) => lower_expression(expr),
            None => Node::other("Expression", other.span().into()),
        },
    }
}

fn statement_tag(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::VariableDeclaration(_) => "VariableDeclaration",
        Statement::ClassDeclaration(_) => "ClassDeclaration",
        Statement::ExportAllDeclaration(_) => "ExportAllDeclaration",
        Statement::BlockStatement(_) => "BlockStatement",
        Statement::IfStatement(_) => "IfStatement",
        Statement::ReturnStatement(_) => "ReturnStatement",
        Statement::EmptyStatement(_) => "EmptyStatement",
        _ => "Statement",
    }
}

fn expression_tag(expr: &Expression) -> &'static str {
    match expr {
        Expression::ArrowFunctionExpression(_) => "ArrowFunctionExpression",
        Expression::FunctionExpression(_) => "FunctionExpression",
        Expression::ObjectExpression(_) => "ObjectExpression",
        Expression::StaticMemberExpression(_) | Expression::ComputedMemberExpression(_) => {
            "MemberExpression"
        }
        Expression::TemplateLiteral(_) => "TemplateLiteral",
        Expression::ConditionalExpression(_) => "ConditionalExpression",
        Expression::BinaryExpression(_) => "BinaryExpression",
        Expression::LogicalExpression(_) => "LogicalExpression",
        Expression::UnaryExpression(_) => "UnaryExpression",
        Expression::SequenceExpression(_) => "SequenceExpression",
        Expression::NewExpression(_) => "NewExpression",
        Expression::ClassExpression(_) => "ClassExpression",
        Expression::AwaitExpression(_) => "AwaitExpression",
        _ => "Expression",
    }
}
