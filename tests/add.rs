mod common;

use common::{grit, init_repo, write_file};
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;

#[test]
fn add_stages_a_file_and_status_reports_it() {
    let repo = init_repo();
    write_file(&repo, "staged.txt", "content\n");

    grit(&repo).args(["add", "staged.txt"]).assert().success();
    assert!(repo.path().join(".git/index").exists());

    grit(&repo)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes to be committed"))
        .stdout(predicate::str::contains("A staged.txt"));
}

#[test]
fn executable_files_are_staged_with_exec_mode() {
    let repo = init_repo();
    write_file(&repo, "run.sh", "#!/bin/sh\necho hi\n");
    let script = repo.path().join("run.sh");
    let mut permissions = std::fs::metadata(&script).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&script, permissions).unwrap();

    let commit = {
        grit(&repo).args(["add", "run.sh"]).assert().success();
        grit(&repo)
            .args(["commit", "-m", "add script"])
            .assert()
            .success();
        common::head_hash(&repo)
    };

    let tree = common::cat_file(&repo, &common::commit_tree_hash(&repo, &commit));
    assert!(tree.contains("100755 blob"));
    assert!(tree.contains("run.sh"));
}

#[test]
fn gitignored_files_are_not_staged_by_add_dot() {
    let repo = init_repo();
    write_file(&repo, ".gitignore", "*.log\n");
    write_file(&repo, "normal.txt", "keep me\n");
    write_file(&repo, "test.log", "drop me\n");

    grit(&repo).args(["add", "."]).assert().success();

    let status = grit(&repo).arg("status").assert().success();
    let stdout = String::from_utf8(status.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("A normal.txt"));
    assert!(stdout.contains("A .gitignore"));
    assert!(!stdout.contains("test.log"));
}

#[test]
fn negated_patterns_override_earlier_ignores() {
    let repo = init_repo();
    write_file(&repo, ".gitignore", "*.log\n!keep.log\n");
    write_file(&repo, "keep.log", "kept\n");
    write_file(&repo, "drop.log", "dropped\n");

    grit(&repo).args(["add", "."]).assert().success();

    let status = grit(&repo).arg("status").assert().success();
    let stdout = String::from_utf8(status.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("A keep.log"));
    assert!(!stdout.contains("A drop.log"));
}

#[test]
fn add_directory_stages_its_files_recursively() {
    let repo = init_repo();
    write_file(&repo, "src/a.rs", "a\n");
    write_file(&repo, "src/nested/b.rs", "b\n");
    write_file(&repo, "outside.txt", "o\n");

    grit(&repo).args(["add", "src"]).assert().success();

    let status = grit(&repo).arg("status").assert().success();
    let stdout = String::from_utf8(status.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("A src/a.rs"));
    assert!(stdout.contains("A src/nested/b.rs"));
    assert!(stdout.contains("outside.txt")); // untracked, not staged
    assert!(!stdout.contains("A outside.txt"));
}

#[test]
fn add_missing_pathspec_fails() {
    let repo = init_repo();
    grit(&repo)
        .args(["add", "ghost.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not match any files"));
}
