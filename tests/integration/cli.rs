//! Integration tests for `hxsema check`.

use tempfile::TempDir;

mod common;

use common::hxsema;

fn write(dir: &TempDir, rel: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn clean_files_exit_zero() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "src/game/Player.hx", "package game;\nclass Player { public var hp:Int = 10; }\n");
    write(&temp, "hxsema.toml", "[analysis]\nsource_roots = [\"src\"]\n");

    let output = hxsema().current_dir(temp.path()).arg("check").arg(&file).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn errors_exit_one() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "Main.hx", "class Main { var n:Int = 'hello'; }\n");

    let output = hxsema().current_dir(temp.path()).arg("check").arg(&file).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Incompatible type Int can't be assigned from String"), "stderr: {stderr}");
}

#[test]
fn syntax_errors_exit_one() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "Broken.hx", "class Broken { var = ; }\n");

    let output = hxsema().current_dir(temp.path()).arg("check").arg(&file).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Broken.hx"), "stderr: {stderr}");
    assert!(!stderr.contains("<unknown>"), "stderr: {stderr}");
}

#[test]
fn relative_paths_get_the_package_check() {
    let temp = TempDir::new().unwrap();
    write(&temp, "src/game/Player.hx", "package wrong;\nclass Player {}\n");
    write(&temp, "hxsema.toml", "[analysis]\nsource_roots = [\"src\"]\n");

    let output = hxsema().current_dir(temp.path()).arg("check").arg("src/game/Player.hx").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid package name! 'wrong' should be 'game'"), "stderr: {stderr}");
}

#[test]
fn json_report_includes_package_fix() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "src/game/ui/Button.hx", "package game.view;\nclass Button {}\n");
    let config = write(&temp, "hxsema.toml", "[analysis]\nsource_roots = [\"src\"]\n");

    let output = hxsema()
        .arg("check")
        .arg(&file)
        .arg("--config")
        .arg(&config)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let diagnostic = &report[0]["diagnostics"][0];
    assert_eq!(diagnostic["message"], "Invalid package name! 'game.view' should be 'game.ui'");
    assert_eq!(diagnostic["fixes"][0]["label"], "Fix package");
    assert_eq!(diagnostic["fixes"][0]["action"]["text"], "game.ui");
}

#[test]
fn warnings_alone_do_not_fail() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "Main.hx", "class Main { function f(a:Int, a:Int) {} }\n");

    let output = hxsema().current_dir(temp.path()).arg("check").arg(&file).arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report[0]["diagnostics"].as_array().unwrap().len(), 2);
    assert_eq!(report[0]["diagnostics"][0]["severity"], "warning");
}

#[test]
fn bad_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let file = write(&temp, "Main.hx", "class Main {}\n");
    let config = write(&temp, "hxsema.toml", "[analysis]\nbody_check = 3\n");

    let output = hxsema().arg("check").arg(&file).arg("--config").arg(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[config]"));
}
