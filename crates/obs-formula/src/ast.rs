/// A binary arithmetic operator recognized by the formula grammar (spec
/// §4.7: "infix arithmetic expression ... with binary `+ - * /`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed formula tree. A leaf is a raw node-name token (already decoded
/// back from its parser-safe encoding); an interior node is a binary
/// operator over two subexpressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Node(String),
    BinOp(Op, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Appends the decoded node-name text of every leaf, left to right.
    pub fn node_names(&self, out: &mut Vec<String>) {
        match self {
            Expr::Node(name) => out.push(name.clone()),
            Expr::BinOp(_, lhs, rhs) => {
                lhs.node_names(out);
                rhs.node_names(out);
            }
        }
    }

    /// Rewrites every leaf's text with `f`, used to turn the encoded
    /// parser output back into the caller's original node syntax.
    pub fn map_nodes(self, f: &impl Fn(&str) -> String) -> Expr {
        match self {
            Expr::Node(name) => Expr::Node(f(&name)),
            Expr::BinOp(op, lhs, rhs) => {
                Expr::BinOp(op, Box::new(lhs.map_nodes(f)), Box::new(rhs.map_nodes(f)))
            }
        }
    }
}
