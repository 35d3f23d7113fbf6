mod common;
use common::*;

#[test]
fn test_postcode_sample_with_default_rules() {
    let ws = Workspace::new();
    let input = ws.write("import_data.csv", postcode_sample());

    let (_stdout, stderr, exit_code) = ws.run(&[&input]);
    assert_eq!(exit_code, 0, "rulesplit should succeed. stderr: {}", stderr);

    let accepted = ws.read(ACCEPTED).expect("accepted file written");
    let rejected = ws.read(REJECTED).expect("rejected file written");
    assert_eq!(accepted, "row_id,postcode\n1,EC1A 1BB\n4,GIR 0AA\n");
    assert_eq!(
        rejected,
        "row_id,postcode\n2,FY10 4PL\n3,SO1 4QQ\n5,ZZ99 9ZZ\n"
    );
}

#[test]
fn test_outputs_sorted_by_id_whatever_the_input_order() {
    let ws = Workspace::new();
    let mut content = String::from("id,value\n");
    for id in (1..=500u32).rev() {
        let value = if id % 2 == 0 { "keep" } else { "drop" };
        content.push_str(&format!("{},{}\n", id, value));
    }
    let input = ws.write("shuffled.csv", &content);

    let (_stdout, stderr, exit_code) = ws.run(&[
        &input,
        "--accept",
        "^keep$",
        "--workers",
        "8",
        "--batch-size",
        "7",
        "--queue-capacity",
        "2",
    ]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    let accepted = ids(&ws.read(ACCEPTED).unwrap());
    let rejected = ids(&ws.read(REJECTED).unwrap());
    assert_eq!(accepted, (1..=500).filter(|id| id % 2 == 0).collect::<Vec<_>>());
    assert_eq!(rejected, (1..=500).filter(|id| id % 2 == 1).collect::<Vec<_>>());
}

#[test]
fn test_rules_combine_with_and_in_given_order() {
    let ws = Workspace::new();
    let input = ws.write(
        "codes.csv",
        "id,code\n1,AB12\n2,AB1X\n3,CD34\n4,ABX\n",
    );

    // Must start with two letters, must not end with X
    let (_stdout, stderr, exit_code) =
        ws.run(&[&input, "--accept", "^[A-Z]{2}", "--reject", "X$"]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    assert_eq!(ids(&ws.read(ACCEPTED).unwrap()), vec![1, 3]);
    assert_eq!(ids(&ws.read(REJECTED).unwrap()), vec![2, 4]);
}

#[test]
fn test_duplicate_identifiers_are_all_kept() {
    let ws = Workspace::new();
    let input = ws.write("dupes.csv", "id,v\n3,a\n1,a\n3,b\n1,b\n");

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--accept", "^a$"]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    assert_eq!(ids(&ws.read(ACCEPTED).unwrap()), vec![1, 3]);
    assert_eq!(ids(&ws.read(REJECTED).unwrap()), vec![1, 3]);
}

#[test]
fn test_no_header_input() {
    let ws = Workspace::new();
    let input = ws.write("bare.csv", "2,FY10 4PL\n1,EC1A 1BB\n");

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--no-header"]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    assert_eq!(ws.read(ACCEPTED).unwrap(), "id,value\n1,EC1A 1BB\n");
    assert_eq!(ws.read(REJECTED).unwrap(), "id,value\n2,FY10 4PL\n");
}

#[test]
fn test_stdin_input() {
    let ws = Workspace::new();
    let (_stdout, stderr, exit_code) = ws.run_with_input(&["-"], postcode_sample());
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(ids(&ws.read(ACCEPTED).unwrap()), vec![1, 4]);
}

#[test]
fn test_empty_input_writes_header_only_files() {
    let ws = Workspace::new();
    let input = ws.write("empty.csv", "id,value\n");

    let (_stdout, stderr, exit_code) = ws.run(&[&input]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(ws.read(ACCEPTED).unwrap(), "id,value\n");
    assert_eq!(ws.read(REJECTED).unwrap(), "id,value\n");
}

#[test]
fn test_output_path_overrides() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());
    let good = ws.file("nested/good.csv");
    let good = good.to_string_lossy().to_string();

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--accepted-out", &good]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    assert!(!ws.exists(ACCEPTED));
    assert_eq!(ids(&ws.read("nested/good.csv").unwrap()), vec![1, 4]);
    assert_eq!(ids(&ws.read(REJECTED).unwrap()), vec![2, 3, 5]);
}

#[test]
fn test_text_report_on_stderr() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());

    let (stdout, stderr, exit_code) = ws.run(&[&input, "--report", "-w", "2"]);
    assert_eq!(exit_code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Completion Report"), "stderr: {}", stderr);
    assert!(stderr.contains("Total records: 5"));
    assert!(stderr.contains("Succeeded: 2"));
    assert!(stderr.contains("Failed: 3"));
    assert!(stderr.contains("Workers: 2"));
    assert!(stderr.contains("records per second"));
}

#[test]
fn test_json_report_on_stdout() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());

    let (stdout, stderr, exit_code) =
        ws.run(&[&input, "--report", "--report-format", "json"]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON report");
    assert_eq!(report["rows_read"], 5);
    assert_eq!(report["accepted"], 2);
    assert_eq!(report["rejected"], 3);
    assert_eq!(report["malformed"], 0);
    assert!(report["elapsed_ms"].is_u64());
}

#[test]
fn test_verbose_prints_summary() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "-v"]);
    assert_eq!(exit_code, 0);
    assert!(stderr.contains("[ingest]"), "stderr: {}", stderr);
    assert!(stderr.contains("Records processed: 5 total, 2 accepted, 3 rejected"));
}

#[test]
fn test_invalid_pattern_is_usage_error() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--accept", "([unclosed"]);
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("invalid rule pattern"), "stderr: {}", stderr);
    assert!(!ws.exists(ACCEPTED));
    assert!(!ws.exists(REJECTED));
}

#[test]
fn test_unknown_preset_is_usage_error() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());

    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--preset", "zip-code"]);
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("unknown rule preset 'zip-code'"), "stderr: {}", stderr);
}

#[test]
fn test_missing_input_file() {
    let ws = Workspace::new();
    let (_stdout, stderr, exit_code) = ws.run(&["no_such_file.csv"]);
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("Input file not found"), "stderr: {}", stderr);
}

#[test]
fn test_zero_batch_size_rejected() {
    let ws = Workspace::new();
    let input = ws.write("in.csv", postcode_sample());
    let (_stdout, stderr, exit_code) = ws.run(&[&input, "--batch-size", "0"]);
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("Batch size must be greater than 0"));
}

#[test]
fn test_completions_need_no_input() {
    let ws = Workspace::new();
    let (stdout, _stderr, exit_code) = ws.run(&["--completions", "bash"]);
    assert_eq!(exit_code, 0);
    assert!(stdout.contains("rulesplit"));
    assert!(!ws.exists(ACCEPTED));
}
