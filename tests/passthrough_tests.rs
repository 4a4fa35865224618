use devshell::tools::TerminalPassthrough;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cd_is_resolved_without_a_subprocess() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir_all(temp.path().join("a/b")).expect("mkdir");
    let mut passthrough = TerminalPassthrough::new(temp.path().to_path_buf(), 10)
        .with_shell_program("/nonexistent/devsh-shell");

    passthrough
        .execute_command("cd a/b", &mut Vec::new())
        .expect("cd a/b");
    passthrough
        .execute_command("cd ../..", &mut Vec::new())
        .expect("cd ../..");

    assert_eq!(passthrough.current_dir(), temp.path());
}

#[test]
fn test_quoted_cd_target_with_spaces() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir(temp.path().join("My Docs")).expect("mkdir");
    let mut passthrough = TerminalPassthrough::new(temp.path().to_path_buf(), 10);

    passthrough
        .execute_command("cd \"My Docs\"", &mut Vec::new())
        .expect("quoted cd");
    assert_eq!(passthrough.display_location(), "My Docs");
}

#[test]
fn test_subprocess_sees_logical_cwd() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir(temp.path().join("inner")).expect("mkdir");
    let mut passthrough = TerminalPassthrough::new(temp.path().to_path_buf(), 10);

    passthrough
        .execute_command("cd inner", &mut Vec::new())
        .expect("cd inner");
    let mut out = Vec::new();
    passthrough
        .execute_command("touch created.txt && ls", &mut out)
        .expect("touch");

    assert!(temp.path().join("inner/created.txt").exists());
    assert_eq!(String::from_utf8_lossy(&out), "created.txt\n");
}

#[test]
fn test_chained_cd_runs_in_subprocess_and_keeps_cwd() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir(temp.path().join("inner")).expect("mkdir");
    let mut passthrough = TerminalPassthrough::new(temp.path().to_path_buf(), 10);

    let mut out = Vec::new();
    passthrough
        .execute_command("cd inner && pwd", &mut out)
        .expect("chained cd");

    assert!(String::from_utf8_lossy(&out).trim_end().ends_with("inner"));
    assert_eq!(passthrough.current_dir(), temp.path());
}
