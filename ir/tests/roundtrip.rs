//! Parsing the canonical textual form and printing it back should reach a
//! fixed point: print(parse(print(parse(src)))) == print(parse(src)).

use pretty_assertions::assert_eq;

use weft_ir::{text, Program, ProgramPrinter};

const SRC: &str = r#"
fun @helper(%p0: i32) : i32 {
  block0:
    %a = alloc i32
    store %a, %p0
    jump block1
  block1:
    %v = load %a
    return %v
}

fun @main(%c: i1) : i32 {
  block0:
    branch %c, block1, block2
  block1:
    jump block3
  block2:
    jump block3
  block3:
    %r = phi i32 [block1: 1 i32, block2: 2 i32]
    return %r
}
"#;

#[test]
fn parse_print_parse_is_a_fixpoint() {
    let mut first = Program::new();
    text::parse_into(&mut first, SRC).expect("valid program parses");
    let printed_once = ProgramPrinter::new(&first).to_string();

    let mut second = Program::new();
    text::parse_into(&mut second, &printed_once).expect("printed form reparses");
    let printed_twice = ProgramPrinter::new(&second).to_string();

    assert_eq!(printed_once, printed_twice);
}

#[test]
fn parsing_sets_the_first_function_as_entrypoint() {
    let mut program = Program::new();
    let functions = text::parse_into(&mut program, SRC).expect("valid program parses");
    assert_eq!(program.entrypoint(), Some(functions[0]));
    assert_eq!(program.function(functions[0]).name, "helper");
}

#[test]
fn rejects_malformed_source() {
    let mut program = Program::new();
    let result = text::parse_into(&mut program, "fun @f( : i32 { block0: return 1 i32 }");
    assert!(result.is_err());
}
