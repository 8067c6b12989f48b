//! Integration tests for the tolstack CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BRACKET: &str = "\
*VERSIONINFO, 0.8.1, 4.0
*OPTIONS,False,False,False,False,False,mm,
*ANALYSISINFO
0,Bracket Gap
1,DOC-100
2,B
3,Gap between bracket and housing
*CONSTANTS, VALUE, NOTE
K,2,scale factor
*DIMENSIONS, NOMINAL, PLUS, MINUS, DISTRIBUTION, PART NUMBER, NOTE
D1,10,0.1,-0.1,U,PN-1,housing
D2,4,0.05,-0.05,3S,PN-2,bracket
*EXPRESSIONS, VALUE, LOWER, UPPER, METHOD, NOTE
GAP,D1 - D2 * K,1.5,2.5,W,gap
HALF,GAP / K,,,3S,half gap
";

/// Helper to get a tolstack command
fn tolstack() -> Command {
    Command::cargo_bin("tolstack").unwrap()
}

/// Helper to write a stack file into a temp directory
fn write_stack(tmp: &TempDir, contents: &str) -> PathBuf {
    let path = tmp.path().join("stack.tsf");
    fs::write(&path, contents).unwrap();
    path
}

fn analyze(tmp: &TempDir, extra: &[&str]) -> assert_cmd::assert::Assert {
    let path = write_stack(tmp, BRACKET);
    tolstack()
        .current_dir(tmp.path())
        .arg("analyze")
        .arg(&path)
        .args(["--samples", "2000", "--seed", "11"])
        .args(extra)
        .assert()
}

// ============================================================================
// Basic CLI
// ============================================================================

#[test]
fn test_help() {
    tolstack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("expand"));
}

#[test]
fn test_version() {
    tolstack()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tolstack"));
}

#[test]
fn test_unknown_command_fails() {
    tolstack().arg("frobnicate").assert().failure();
}

// ============================================================================
// Analyze
// ============================================================================

#[test]
fn test_analyze_text_report() {
    let tmp = TempDir::new().unwrap();
    analyze(&tmp, &[])
        .success()
        .stdout(predicate::str::contains("BRACKET GAP"))
        .stdout(predicate::str::contains("DOC-100-B"))
        .stdout(predicate::str::contains("THIS DOCUMENT IN MM."))
        .stdout(predicate::str::contains("EXPRESSION SUMMARY:"))
        .stdout(predicate::str::contains("Expansion:  D1 - D2 * K"))
        .stdout(predicate::str::contains("Statistical ±3σ"))
        .stdout(predicate::str::contains("Sensitivities:").not());
}

#[test]
fn test_analyze_optional_sections() {
    let tmp = TempDir::new().unwrap();
    analyze(&tmp, &["-S", "-T", "-W"])
        .success()
        .stdout(predicate::str::contains("Sensitivities:"))
        .stdout(predicate::str::contains("∂/∂D2"))
        .stdout(predicate::str::contains("Contributions:"))
        .stdout(predicate::str::contains("USED IN"))
        .stdout(predicate::str::contains("GAP, HALF"));
}

#[test]
fn test_analyze_json() {
    let tmp = TempDir::new().unwrap();
    let output = analyze(&tmp, &["-f", "json"]).success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    let outcomes = json.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["name"], "GAP");
    assert_eq!(outcomes[0]["status"], "evaluated");
    assert_eq!(outcomes[0]["method"], "W");
    assert!((outcomes[0]["nominal"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    assert!((outcomes[0]["lower_bound"].as_f64().unwrap() - 1.8).abs() < 1e-9);
    assert_eq!(outcomes[0]["passed"], true);
    assert_eq!(outcomes[1]["method"], "3S");
    assert!(outcomes[1]["upper_limit"].is_null());
}

#[test]
fn test_analyze_csv() {
    let tmp = TempDir::new().unwrap();
    analyze(&tmp, &["-f", "csv"])
        .success()
        .stdout(predicate::str::starts_with("name,expression,method"))
        .stdout(predicate::str::contains("GAP,D1 - D2 * K,W"));
}

#[test]
fn test_analyze_writes_output_file() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("report.txt");
    analyze(&tmp, &["-o", out.to_str().unwrap()])
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let report = fs::read_to_string(out).unwrap();
    assert!(report.contains("EXPRESSIONS:"));
}

#[test]
fn test_analyze_seed_is_reproducible() {
    let tmp = TempDir::new().unwrap();
    let first = analyze(&tmp, &["-f", "json"]).success().get_output().stdout.clone();
    let second = analyze(&tmp, &["-f", "json"]).success().get_output().stdout.clone();
    assert_eq!(first, second);
}

#[test]
fn test_analyze_reports_failures_and_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let contents = BRACKET.replace(
        "HALF,GAP / K,,,3S,half gap",
        "HALF,GAP / K,,,3S,half gap\nBAD,D1 + NOPE\nZERO,D1 / (D2 - 4)",
    );
    let path = write_stack(&tmp, &contents);

    tolstack()
        .current_dir(tmp.path())
        .arg("analyze")
        .arg(&path)
        .args(["--samples", "1000", "--seed", "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("GAP"))
        .stderr(predicate::str::contains("NOPE"));
}

#[test]
fn test_analyze_domain_error_is_local() {
    let tmp = TempDir::new().unwrap();
    let contents = BRACKET.replace(
        "HALF,GAP / K,,,3S,half gap",
        "HALF,GAP / K,,,3S,half gap\nZERO,D1 / (D2 - 4)",
    );
    let path = write_stack(&tmp, &contents);

    tolstack()
        .current_dir(tmp.path())
        .arg("analyze")
        .arg(&path)
        .args(["--samples", "1000", "--seed", "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ERROR: divisor"))
        .stdout(predicate::str::contains("HALF"))
        .stderr(predicate::str::contains("failed"));
}

#[test]
fn test_analyze_missing_file() {
    let tmp = TempDir::new().unwrap();
    tolstack()
        .current_dir(tmp.path())
        .args(["analyze", "missing.tsf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// ============================================================================
// Check
// ============================================================================

#[test]
fn test_check_valid_file() {
    let tmp = TempDir::new().unwrap();
    let path = write_stack(&tmp, BRACKET);
    tolstack()
        .current_dir(tmp.path())
        .env("TOLSTACK_SAMPLES", "500")
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("1 constants, 2 dimensions, 2 expressions"));
}

#[test]
fn test_check_lists_row_errors() {
    let tmp = TempDir::new().unwrap();
    let contents = BRACKET
        .replace("K,2,scale factor", "K,two,scale factor")
        .replace("D2,4,0.05,-0.05,3S", "D2,4,0.05,-0.05,XX");
    let path = write_stack(&tmp, &contents);

    tolstack()
        .current_dir(tmp.path())
        .env("TOLSTACK_SAMPLES", "500")
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("errors"))
        .stderr(predicate::str::contains("two"))
        .stderr(predicate::str::contains("XX"));
}

#[test]
fn test_check_rejects_newer_format() {
    let tmp = TempDir::new().unwrap();
    let path = write_stack(&tmp, &BRACKET.replacen("0.8.1, 4.0", "9.0.0, 9.0", 1));
    tolstack()
        .current_dir(tmp.path())
        .arg("check")
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn test_check_quiet() {
    let tmp = TempDir::new().unwrap();
    let path = write_stack(&tmp, BRACKET);
    tolstack()
        .current_dir(tmp.path())
        .env("TOLSTACK_SAMPLES", "500")
        .args(["-q", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ============================================================================
// Expand
// ============================================================================

#[test]
fn test_expand_shows_expansion_and_rpn() {
    let tmp = TempDir::new().unwrap();
    let path = write_stack(&tmp, BRACKET);
    tolstack()
        .current_dir(tmp.path())
        .env("TOLSTACK_SAMPLES", "500")
        .arg("expand")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("(D1 - D2 * K) / K"))
        .stdout(predicate::str::contains("D1 D2 K * -"))
        .stdout(predicate::str::contains("GAP K /"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    tolstack()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tolstack"));
}
