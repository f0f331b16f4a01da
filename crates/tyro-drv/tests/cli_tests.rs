//! Black-box CLI tests driving the built `tyro` binary against literal
//! source text, covering the end-to-end scenarios and boundary behaviors.

use assert_cmd::Command;
use predicates::prelude::*;

fn tyro() -> Command {
    Command::cargo_bin("tyro").unwrap()
}

#[test]
fn s1_string_concat_via_ir_then_run() {
    tyro()
        .write_stdin(r#"void main() { print("3" + "4") }"#)
        .assert()
        .success()
        .stdout(predicate::eq("34"));
}

#[test]
fn s2_while_loop_prints_each_iteration() {
    tyro()
        .write_stdin("void main() { int i = 0  while (i < 3) { print(i) i = i + 1 } }")
        .assert()
        .success()
        .stdout(predicate::eq("012"));
}

#[test]
fn s3_struct_field_assign_and_read() {
    tyro()
        .write_stdin("struct P { int x } void main() { P p = new P  p.x = 7  print(p.x) }")
        .assert()
        .success()
        .stdout(predicate::eq("7"));
}

#[test]
fn s4_class_member_assign_and_read_twice() {
    tyro()
        .write_stdin(
            "class C { public: int x } void main() { C c = new C  c.x = 3  print(c.x)  c.x = 4  print(c.x) }",
        )
        .assert()
        .success()
        .stdout(predicate::eq("34"));
}

#[test]
fn s5_array_length_builtin() {
    tyro()
        .write_stdin(
            "void main() { array int a = new int[3]  a[0] = 10  a[1] = 20  a[2] = 30  print(length(a)) }",
        )
        .assert()
        .success()
        .stdout(predicate::eq("3"));
}

#[test]
fn s6_private_member_access_is_a_static_error() {
    tyro()
        .write_stdin("class C { private: int x } void main() { C c = new C  int y = c.x }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Static Error:").and(predicate::str::contains("x")));
}

#[test]
fn leading_zero_integer_literal_is_a_lex_error() {
    tyro()
        .write_stdin("void main() { int x = 0123 }")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Lexer Error:"));
}

#[test]
fn ir_flag_prints_frame_header_and_main_ends_with_ret() {
    tyro()
        .arg("--ir")
        .write_stdin("void main() { print(1) }")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Frame 'main'")
                .and(predicate::str::contains("RET()")),
        );
}

#[test]
fn check_flag_is_silent_on_success() {
    tyro()
        .arg("--check")
        .write_stdin("void main() { int x = 1 }")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn print_flag_pretty_prints_the_parsed_program() {
    tyro()
        .arg("--print")
        .write_stdin("void main() { print(1) }")
        .assert()
        .success()
        .stdout(predicate::str::contains("void main() {"));
}

#[test]
fn lex_flag_lists_tokens_ending_in_eos() {
    tyro()
        .arg("--lex")
        .write_stdin("void main() {}")
        .assert()
        .success()
        .stdout(predicate::str::contains("EOS"));
}

#[test]
fn mutually_exclusive_flags_are_a_usage_error() {
    tyro()
        .arg("--lex")
        .arg("--parse")
        .write_stdin("")
        .assert()
        .failure();
}

#[test]
fn missing_input_file_is_a_usage_error() {
    tyro()
        .arg("/no/such/file/here.tyro")
        .assert()
        .failure()
        .code(1);
}
