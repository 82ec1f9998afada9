//! Textual IR dump tests

use cyrex_ir::{dump_module, IrGen};
use pretty_assertions::assert_eq;

fn gen(source: &str) -> IrGen {
    let tokens = cyrex_lexer::tokenize(source).expect("tokenize");
    let program = cyrex_parser::parse(tokens).expect("parse");
    let mut ir = IrGen::new();
    ir.generate(&program);
    assert!(!ir.has_errors());
    ir
}

#[test]
fn dump_renders_blocks_and_typed_results() {
    let ir = gen("function main() : int { var x : int = 1 + 2 return x }");

    let expected = "\
func main
BB0:
L0:
v0 : int = alloc
v1 : int = const 1
v3 : int = const 2
v2 : int = add v1, v3
store v0, v2
ret v0
BB1:
L1:
";
    assert_eq!(dump_module(&ir, false), expected);
}

#[test]
fn dump_renders_branches_and_jumps() {
    let ir = gen("function main() : int { var i : int = 0 while i < 10 do i = i + 1 return i }");
    let dump = dump_module(&ir, false);

    assert!(dump.contains("b v2, L3, L4"));
    assert!(dump.contains("j L2"));
    assert!(dump.contains("v2 : int = lt v0, v3"));
    // The entry block's fallthrough repair shows up in the listing.
    assert!(dump.contains("BB0:"));
    assert!(dump.contains("BB2:"));
}

#[test]
fn return_without_value_prints_bare_ret() {
    let ir = gen("function main() : void { return }");
    let dump = dump_module(&ir, false);
    assert!(dump.contains("\nret\n"));
    assert!(!dump.contains("v-1"));
}

#[test]
fn dump_lists_every_function_in_source_order() {
    let ir = gen("function one() : int { return 1 } function two() : int { return 2 }");
    let dump = dump_module(&ir, false);

    let one_at = dump.find("func one").unwrap();
    let two_at = dump.find("func two").unwrap();
    assert!(one_at < two_at);
}

#[test]
fn liveness_annotations_appear_on_request() {
    let ir = gen("function main() : int { var x : int = 1 return x }");

    let plain = dump_module(&ir, false);
    assert!(!plain.contains("live-in"));

    let annotated = dump_module(&ir, true);
    assert!(annotated.contains("; live-in:"));
    assert!(annotated.contains("; live-out:"));
}
