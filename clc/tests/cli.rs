use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn clc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clc"))
        .arg("--mock")
        .args(args)
        .env_remove("CLC_PLATFORM")
        .output()
        .unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("clc-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn list_json() {
    let output = clc(&["-l", "--json"]);
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let platform = &records[0];
    let name = platform["properties"]
        .as_array()
        .unwrap()
        .iter()
        .find(|x| x["name"] == "name")
        .unwrap();
    assert_eq!(name["value"], "Mock Platform");
    assert_eq!(platform["devices"].as_array().unwrap().len(), 1);
}

#[test]
fn list_text() {
    let output = clc(&["-l"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("0: Mock Platform"));
    assert!(stdout.contains("\t\tname: Mock GPU"));
}

#[test]
fn build_writes_artifacts() {
    let dir = temp_dir("build");
    let path = dir.join("fill.cl");
    fs::write(&path, "__kernel void fill(__global uint *y) {\n  y[0] = 1;\n}\n").unwrap();
    let output = clc(&[
        "--out-dir",
        dir.to_str().unwrap(),
        "-o",
        "-cl-fast-relaxed-math",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");
    let header = fs::read_to_string(dir.join("fill.hpp")).unwrap();
    assert!(header.starts_with("#ifndef _FILL_HPP_\n"));
    let source = fs::read_to_string(dir.join("fill.cpp")).unwrap();
    assert!(source.contains("const char *fill_source =\n"));
    assert!(source.ends_with("  \"}\\n\";\n"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn build_failure_prints_log() {
    let dir = temp_dir("failure");
    let path = dir.join("bad.cl");
    fs::write(&path, "__kernel void bad( {}").unwrap();
    let output = clc(&["--out-dir", dir.to_str().unwrap(), path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("1:18: error: unclosed '('"), "{stderr}");
    assert!(!dir.join("bad.hpp").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn platform_out_of_range() {
    let output = clc(&["-p", "3", "missing.cl"]);
    assert!(!output.status.success());
}
