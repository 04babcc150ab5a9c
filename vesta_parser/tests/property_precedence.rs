//! Property: for any two binary operators, `a OP1 b OP2 c` groups left
//! exactly when OP1 binds at least as tightly as OP2 and is
//! left-associative on ties; and inserting explicit semicolons at ASI
//! newlines never changes the parse.

use proptest::prelude::*;

use vesta_parser::ast::StmtKind;
use vesta_parser::parse;

#[derive(Debug, Clone, Copy)]
struct Op {
    symbol: &'static str,
    precedence: u8,
    right_associative: bool,
}

const fn left(symbol: &'static str, precedence: u8) -> Op {
    Op {
        symbol,
        precedence,
        right_associative: false,
    }
}

const fn right(symbol: &'static str, precedence: u8) -> Op {
    Op {
        symbol,
        precedence,
        right_associative: true,
    }
}

const OPS: &[Op] = &[
    left("*", 5),
    left("/", 5),
    left("%", 5),
    left("+", 6),
    left("-", 6),
    left("<<", 7),
    left(">>", 7),
    left(">>>", 7),
    left("<", 8),
    left("<=", 8),
    left(">", 8),
    left(">=", 8),
    left("==", 9),
    left("!=", 9),
    left("&", 10),
    left("^", 11),
    left("|", 12),
    left("&&", 13),
    left("||", 13),
    right("=", 15),
    right("+=", 15),
    right("-=", 15),
    right("*=", 15),
    right("/=", 15),
    right("%=", 15),
    right("<<=", 15),
    right(">>=", 15),
    right(">>>=", 15),
    right("&=", 15),
    right("|=", 15),
    right("^=", 15),
];

fn single_statement(source: &str) -> String {
    let program = parse(source).unwrap_or_else(|e| panic!("parse of {source:?} failed: {e}"));
    let StmtKind::Block(statements) = program.kind else {
        panic!("program did not parse to a block");
    };
    assert_eq!(statements.len(), 1);
    statements[0].to_string()
}

proptest! {
    #[test]
    fn pairwise_precedence_and_associativity(
        first in 0..OPS.len(),
        second in 0..OPS.len(),
    ) {
        let (op1, op2) = (OPS[first], OPS[second]);
        let source = format!("a {} b {} c;", op1.symbol, op2.symbol);
        let groups_left = op1.precedence < op2.precedence
            || (op1.precedence == op2.precedence && !op1.right_associative);
        let expected = if groups_left {
            format!("({} ({} a b) c)", op2.symbol, op1.symbol)
        } else {
            format!("({} a ({} b c))", op1.symbol, op2.symbol)
        };
        prop_assert_eq!(single_statement(&source), expected);
    }

    #[test]
    fn newlines_and_semicolons_terminate_statements_identically(
        names in prop::collection::vec("[a-d]", 2..6),
    ) {
        let assignments: Vec<String> =
            names.iter().map(|name| format!("{name} = {name}")).collect();
        let with_newlines = assignments.join("\n");
        let with_semicolons = assignments.join("; ");

        let a = parse(&with_newlines).unwrap();
        let b = parse(&with_semicolons).unwrap();
        let (StmtKind::Block(a), StmtKind::Block(b)) = (a.kind, b.kind) else {
            panic!("programs did not parse to blocks");
        };
        let a: Vec<String> = a.iter().map(ToString::to_string).collect();
        let b: Vec<String> = b.iter().map(ToString::to_string).collect();
        prop_assert_eq!(a, b);
    }
}
