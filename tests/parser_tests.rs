// Integration tests for the rbasic parser
//
// This file contains all parser robustness tests consolidated into a single
// integration test, plus structural checks for the line-number and label
// handling the grammar depends on.

use rbasic::ast::Item;
use rbasic::error::BasicError;
use rbasic::parser::{parse_int, Parser};

/// Test result for a single test case
#[derive(Debug)]
pub enum TestResult {
    Pass,
    Fail(String),
    Crash(String),
}

/// Individual test case
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub should_succeed: bool,
    pub expected_error_contains: Option<String>,
}

/// Test suite containing multiple test cases
#[derive(Debug)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Run all tests in this suite
    pub fn run(&self) -> TestSuiteResults {
        let mut results = TestSuiteResults::new(&self.name);

        println!("Running test suite: {}", self.name);
        println!("{}", "=".repeat(50));

        for test in &self.tests {
            let result = run_single_test(test);
            results.add_result(&test.name, result);
        }

        results.print_summary();
        results
    }
}

/// Results for a test suite run
#[derive(Debug)]
pub struct TestSuiteResults {
    pub suite_name: String,
    pub results: Vec<(String, TestResult)>,
    pub passed: usize,
    pub failed: usize,
    pub crashed: usize,
}

impl TestSuiteResults {
    pub fn new(suite_name: &str) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            results: Vec::new(),
            passed: 0,
            failed: 0,
            crashed: 0,
        }
    }

    pub fn add_result(&mut self, test_name: &str, result: TestResult) {
        match &result {
            TestResult::Pass => {
                self.passed += 1;
                println!("  ✓ {}", test_name);
            }
            TestResult::Fail(msg) => {
                self.failed += 1;
                println!("  ✗ {}: {}", test_name, msg);
            }
            TestResult::Crash(msg) => {
                self.crashed += 1;
                println!("  💥 {}: CRASHED - {}", test_name, msg);
            }
        }
        self.results.push((test_name.to_string(), result));
    }

    pub fn print_summary(&self) {
        println!();
        println!("Test Suite: {} - Summary", self.suite_name);
        println!("{}", "-".repeat(30));
        println!("Passed:  {}", self.passed);
        println!("Failed:  {}", self.failed);
        println!("Crashed: {}", self.crashed);
        println!("Total:   {}", self.results.len());
        println!();
    }

    pub fn is_all_passed(&self) -> bool {
        self.crashed == 0 && self.failed == 0
    }
}

/// Run a single test case
fn run_single_test(test: &TestCase) -> TestResult {
    // Catch any panics to detect crashes
    let result = std::panic::catch_unwind(|| parse_input(&test.input));

    match result {
        Ok(parse_result) => match (parse_result, test.should_succeed) {
            (Ok(_), true) => TestResult::Pass,
            (Ok(_), false) => {
                TestResult::Fail("Expected parsing to fail, but it succeeded".to_string())
            }
            (Err(error), false) => {
                // Check if error contains expected text
                if let Some(expected) = &test.expected_error_contains {
                    if error.message.contains(expected) {
                        TestResult::Pass
                    } else {
                        TestResult::Fail(format!(
                            "Error message '{}' doesn't contain expected text '{}'",
                            error.message, expected
                        ))
                    }
                } else {
                    TestResult::Pass // Any error is acceptable
                }
            }
            (Err(error), true) => TestResult::Fail(format!(
                "Expected parsing to succeed, but got error: {}",
                error.message
            )),
        },
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic".to_string()
            };
            TestResult::Crash(panic_msg)
        }
    }
}

/// Parse input and return result
fn parse_input(input: &str) -> Result<rbasic::ast::Program, BasicError> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

/// Test case builder for convenience
impl TestCase {
    pub fn should_succeed(name: &str, input: &str) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            should_succeed: true,
            expected_error_contains: None,
        }
    }

    pub fn should_fail(name: &str, input: &str) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            should_succeed: false,
            expected_error_contains: None,
        }
    }

    pub fn should_fail_with_message(name: &str, input: &str, expected_msg: &str) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            should_succeed: false,
            expected_error_contains: Some(expected_msg.to_string()),
        }
    }
}

// ============================================================================
// Test Suite Creation Functions
// ============================================================================

fn create_malformed_expressions_tests() -> TestSuite {
    let mut suite = TestSuite::new("Malformed Expressions");

    suite.add_test(TestCase::should_fail_with_message(
        "unmatched_opening_paren",
        "(1 + 2",
        "Unexpected end of input",
    ));

    suite.add_test(TestCase::should_fail_with_message(
        "unmatched_opening_paren_nested",
        "((1 + 2)",
        "Unexpected end of input",
    ));

    suite.add_test(TestCase::should_fail_with_message(
        "unmatched_closing_paren",
        "1 + 2)",
        "Expected expression",
    ));

    suite.add_test(TestCase::should_fail_with_message(
        "empty_parentheses",
        "()",
        "Expected expression",
    ));

    suite.add_test(TestCase::should_fail_with_message(
        "dangling_operator",
        "1 +",
        "expected an expression",
    ));

    suite.add_test(TestCase::should_fail("lone_star", "* 2"));

    // Consecutive +/- fold into unary operators
    suite.add_test(TestCase::should_succeed("double_minus", "x = 1 -- 2"));
    suite.add_test(TestCase::should_succeed("plus_minus", "x = 1 +- 2"));
    suite.add_test(TestCase::should_fail("double_star", "x = 1 ** 2"));

    suite
}

fn create_line_and_label_tests() -> TestSuite {
    let mut suite = TestSuite::new("Lines and Labels");

    suite.add_test(TestCase::should_succeed("numbered_line", "10 print 1"));
    suite.add_test(TestCase::should_succeed(
        "numbered_program",
        "10 let x = 1\n20 goto 10",
    ));
    suite.add_test(TestCase::should_succeed("hex_line_number", "0x10 print 1"));
    suite.add_test(TestCase::should_succeed("bare_label", "loop:"));
    suite.add_test(TestCase::should_succeed(
        "label_with_statement",
        "loop: print 1",
    ));
    suite.add_test(TestCase::should_succeed(
        "label_then_numbered_line",
        "start: let i = 0\n10 print i",
    ));

    // A leading integer followed by an operator is an expression, not a
    // line number
    suite.add_test(TestCase::should_succeed("leading_int_expression", "10 + 5"));
    suite.add_test(TestCase::should_fail_with_message(
        "integer_assignment_target",
        "10 = 5",
        "Invalid left-hand side",
    ));

    suite
}

fn create_statement_tests() -> TestSuite {
    let mut suite = TestSuite::new("Statements");

    suite.add_test(TestCase::should_succeed("print_empty", "print"));
    suite.add_test(TestCase::should_succeed("print_list", "print 1, 2; 3"));
    suite.add_test(TestCase::should_succeed("print_alias", "pr 1"));
    suite.add_test(TestCase::should_succeed("input_single", "input a"));
    suite.add_test(TestCase::should_succeed("input_multiple", "input a, b, c"));
    suite.add_test(TestCase::should_fail("input_number_target", "input 5"));
    suite.add_test(TestCase::should_succeed("let_statement", "let x = 1 + 2"));
    suite.add_test(TestCase::should_fail("let_missing_value", "let x ="));
    suite.add_test(TestCase::should_fail("let_missing_assign", "let x 5"));
    suite.add_test(TestCase::should_succeed("goto_number", "goto 10"));
    suite.add_test(TestCase::should_succeed("goto_label", "goto loop"));
    suite.add_test(TestCase::should_fail("goto_missing_target", "goto"));
    suite.add_test(TestCase::should_succeed("gosub_return", "gosub 100\nreturn"));
    suite.add_test(TestCase::should_succeed(
        "if_then_else",
        "if x > 1 then print 1 else print 2",
    ));
    suite.add_test(TestCase::should_succeed("if_without_then", "if x print 1"));
    suite.add_test(TestCase::should_succeed(
        "if_then_goto",
        "if i < 10 then goto loop",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "if_missing_condition",
        "if then print 1",
        "Expected expression",
    ));
    suite.add_test(TestCase::should_succeed("end_statement", "end"));
    suite.add_test(TestCase::should_succeed("clear_statement", "clear"));
    suite.add_test(TestCase::should_succeed("run_statement", "run"));
    suite.add_test(TestCase::should_succeed("list_statement", "list"));
    suite.add_test(TestCase::should_succeed("list_single_line", "list 10"));
    suite.add_test(TestCase::should_succeed("list_range", "list 10, 20"));
    suite.add_test(TestCase::should_succeed("list_ast_mode", "list ast"));
    suite.add_test(TestCase::should_succeed("list_range_mode", "list 10, 20 ast"));
    suite.add_test(TestCase::should_fail_with_message(
        "list_unknown_mode",
        "list foo",
        "Unknown list mode",
    ));

    suite
}

fn create_assignment_tests() -> TestSuite {
    let mut suite = TestSuite::new("Assignments");

    suite.add_test(TestCase::should_succeed("simple_assignment", "x = 1"));
    suite.add_test(TestCase::should_succeed("chained_assignment", "a = b = 1"));
    suite.add_test(TestCase::should_succeed("add_assign", "x += 1"));
    suite.add_test(TestCase::should_succeed("sub_assign", "x -= 1"));
    suite.add_test(TestCase::should_succeed("mul_assign", "x *= 2"));
    suite.add_test(TestCase::should_succeed("div_assign", "x /= 2"));
    suite.add_test(TestCase::should_fail("assignment_missing_value", "x ="));
    suite.add_test(TestCase::should_fail_with_message(
        "literal_assignment_target",
        "1 + 1 = x",
        "Invalid left-hand side",
    ));

    suite
}

fn create_literal_tests() -> TestSuite {
    let mut suite = TestSuite::new("Literals");

    suite.add_test(TestCase::should_succeed("integer_literal", "42"));
    suite.add_test(TestCase::should_succeed("float_literal", "3.14"));
    suite.add_test(TestCase::should_succeed("float_exponent", "1.5e3"));
    suite.add_test(TestCase::should_succeed("string_literal", "\"hello\""));
    suite.add_test(TestCase::should_succeed("hex_literal", "0xFF"));
    suite.add_test(TestCase::should_succeed("octal_literal", "077"));
    // A trailing dot still reads as a float
    suite.add_test(TestCase::should_succeed("trailing_dot", "x = 42."));

    suite.add_test(TestCase::should_fail("multiple_dots", "3.14.159"));
    suite.add_test(TestCase::should_fail("leading_dot", ".42"));
    suite.add_test(TestCase::should_fail_with_message(
        "empty_hex_literal",
        "0x",
        "Invalid hex literal",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unterminated_string",
        "\"hello",
        "Unterminated string",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "string_across_newline",
        "\"hello\nworld\"",
        "Unterminated string",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "stray_character",
        "x = @",
        "Unexpected character",
    ));
    suite.add_test(TestCase::should_fail("lone_ampersand", "1 & 2"));
    suite.add_test(TestCase::should_fail("lone_pipe", "1 | 2"));

    suite
}

fn create_builtin_call_tests() -> TestSuite {
    let mut suite = TestSuite::new("Built-in Calls");

    suite.add_test(TestCase::should_succeed("rnd_one_arg", "rnd(10)"));
    suite.add_test(TestCase::should_succeed("rnd_two_args", "rnd(1, 10)"));
    suite.add_test(TestCase::should_succeed("pow_call", "pow(2, 8)"));
    suite.add_test(TestCase::should_succeed("sqrt_call", "sqrt(2)"));
    suite.add_test(TestCase::should_succeed("uppercase_builtin", "RND(5)"));
    suite.add_test(TestCase::should_succeed(
        "nested_call",
        "sqrt(pow(3, 2) + pow(4, 2))",
    ));

    suite.add_test(TestCase::should_fail("builtin_without_parens", "rnd 10"));
    suite.add_test(TestCase::should_fail("unclosed_call", "rnd(1,"));
    suite.add_test(TestCase::should_fail("unclosed_call_args", "pow(1, 2"));

    suite
}

fn create_edge_case_tests() -> TestSuite {
    let mut suite = TestSuite::new("Edge Cases");

    suite.add_test(TestCase::should_succeed("empty_input", ""));
    suite.add_test(TestCase::should_succeed("only_whitespace", "   \n\t  "));
    suite.add_test(TestCase::should_succeed("only_comment", "rem nothing here"));
    suite.add_test(TestCase::should_succeed(
        "trailing_comment",
        "10 print 1 rem say hi",
    ));
    suite.add_test(TestCase::should_succeed("blank_lines", "print 1\n\n\nprint 2"));

    // Deep recursion through grouping must not blow the stack
    let deep_parens = "(".repeat(100) + "1" + &")".repeat(100);
    suite.add_test(TestCase::should_succeed("deeply_nested_parens", &deep_parens));

    suite
}

// ============================================================================
// Main Test Function
// ============================================================================

#[test]
fn comprehensive_parser_tests() {
    let mut all_passed = true;

    let suites = vec![
        create_malformed_expressions_tests(),
        create_line_and_label_tests(),
        create_statement_tests(),
        create_assignment_tests(),
        create_literal_tests(),
        create_builtin_call_tests(),
        create_edge_case_tests(),
    ];

    for suite in suites {
        let results = suite.run();
        if !results.is_all_passed() {
            all_passed = false;
        }
    }

    assert!(all_passed, "some parser test cases had unexpected results");
}

// ============================================================================
// Structural Checks
// ============================================================================

#[test]
fn leading_integer_becomes_line_number() {
    let program = parse_input("10 print 1").unwrap();
    assert_eq!(program.body.len(), 1);
    match &program.body[0] {
        Item::Line(line) => assert_eq!(line.linenum, 10),
        other => panic!("expected a line, got {:?}", other),
    }
}

#[test]
fn leading_integer_before_operator_stays_an_expression() {
    let program = parse_input("10 + 5").unwrap();
    assert_eq!(program.body.len(), 1);
    match &program.body[0] {
        Item::Line(line) => {
            assert_eq!(line.linenum, 0);
            assert_eq!(format!("{}", line.statement), "10 + 5");
        }
        other => panic!("expected a line, got {:?}", other),
    }
}

#[test]
fn radix_prefixed_line_numbers_resolve() {
    let program = parse_input("0x10 print 1").unwrap();
    match &program.body[0] {
        Item::Line(line) => assert_eq!(line.linenum, 16),
        other => panic!("expected a line, got {:?}", other),
    }
}

#[test]
fn label_with_trailing_statement_splits_in_two() {
    let program = parse_input("name: let i = 1").unwrap();
    assert_eq!(program.body.len(), 2);
    match &program.body[0] {
        Item::Label(label) => assert_eq!(label.name, "name"),
        other => panic!("expected a label, got {:?}", other),
    }
    match &program.body[1] {
        Item::Line(line) => {
            assert_eq!(line.linenum, 0);
            assert_eq!(format!("{}", line.statement), "let i = 1");
        }
        other => panic!("expected a line, got {:?}", other),
    }
}

#[test]
fn upsert_replaces_lines_by_number() {
    let mut program = parse_input("10 print 1\n20 print 2").unwrap();

    let mut parser = Parser::new("10 print 9").unwrap();
    for item in parser.parse_line().unwrap() {
        program.upsert(item);
    }

    assert_eq!(program.body.len(), 2);
    assert_eq!(format!("{}", program.body[0]), "10 print 9");
    assert_eq!(format!("{}", program.body[1]), "20 print 2");
}

#[test]
fn parse_line_rejects_trailing_garbage() {
    let mut parser = Parser::new("print 1\nprint 2").unwrap();
    assert!(parser.parse_line().is_err());
}

#[test]
fn parse_int_handles_radix_prefixes() {
    assert_eq!(parse_int("42"), Some(42));
    assert_eq!(parse_int("0xFF"), Some(255));
    assert_eq!(parse_int("0X10"), Some(16));
    assert_eq!(parse_int("077"), Some(63));
    assert_eq!(parse_int("0"), Some(0));
    // A leading zero with non-octal digits falls back to decimal
    assert_eq!(parse_int("08"), Some(8));
    assert_eq!(parse_int("nope"), None);
}
