#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::TempDir;

/// A grit invocation inside the given repository directory
pub fn grit(repo: &TempDir) -> Command {
    let mut command = Command::cargo_bin("grit").expect("binary builds");
    command.current_dir(repo.path());
    command.env("GIT_AUTHOR_NAME", "Test Author");
    command.env("GIT_AUTHOR_EMAIL", "test@example.com");
    command
}

/// Fresh temp dir with an initialized repository
pub fn init_repo() -> TempDir {
    let repo = TempDir::new().expect("temp dir");
    grit(&repo).arg("init").assert().success();
    repo
}

pub fn write_file(repo: &TempDir, path: &str, content: &str) {
    let full = repo.path().join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("parent dirs");
    }
    std::fs::write(full, content).expect("write file");
}

pub fn read_file(repo: &TempDir, path: &str) -> String {
    std::fs::read_to_string(repo.path().join(path)).expect("read file")
}

/// Stage and commit in one step, returning the new HEAD hash
pub fn commit_all(repo: &TempDir, message: &str) -> String {
    grit(repo).args(["add", "."]).assert().success();
    grit(repo).args(["commit", "-m", message]).assert().success();
    head_hash(repo)
}

/// The hash HEAD currently resolves to
pub fn head_hash(repo: &TempDir) -> String {
    let head = read_file(repo, ".git/HEAD");
    let head = head.trim();
    if let Some(refname) = head.strip_prefix("ref: ") {
        read_file(repo, &format!(".git/{refname}")).trim().to_string()
    } else {
        head.to_string()
    }
}

/// Output of `grit cat-file -p <target>`
pub fn cat_file(repo: &TempDir, target: &str) -> String {
    let output = grit(repo)
        .args(["cat-file", "-p", target])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf-8 output")
}

/// The `tree <hash>` line of a commit
pub fn commit_tree_hash(repo: &TempDir, commit: &str) -> String {
    cat_file(repo, commit)
        .lines()
        .find_map(|line| line.strip_prefix("tree ").map(|h| h.to_string()))
        .expect("commit has a tree header")
}
