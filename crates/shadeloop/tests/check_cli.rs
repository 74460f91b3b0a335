use std::fs;
use std::process::Command;

use tempfile::TempDir;

const GOOD_SHADER: &str = r"#version 300 es
precision highp float;
uniform float uTime;
uniform vec2 uResolution;
layout(location = 0) out vec4 fragColor;
void main() {
    vec2 st = gl_FragCoord.xy / uResolution;
    fragColor = vec4(st, 0.5 + 0.5 * sin(uTime), 1.0);
}
";

const BAD_SHADER: &str = r"#version 300 es
precision highp float;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(missing_value);
}
";

fn shadeloop(config_dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shadeloop"));
    command
        .env("SHADELOOP_CONFIG_DIR", config_dir.path())
        .env_remove("SHADELOOP_CONFIG")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn check_reports_resolved_uniforms() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("good.frag");
    fs::write(&shader, GOOD_SHADER).unwrap();

    let output = shadeloop(&root)
        .arg("check")
        .arg(&shader)
        .output()
        .expect("failed to run shadeloop check");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok:"));
    assert!(stdout.contains("uTime"));
    assert!(stdout.contains("uResolution"));
    assert!(stdout.contains("unused: uMouse"));
}

#[test]
fn check_fails_with_diagnostics() {
    let root = TempDir::new().unwrap();
    let shader = root.path().join("bad.frag");
    fs::write(&shader, BAD_SHADER).unwrap();

    let output = shadeloop(&root)
        .arg("check")
        .arg(&shader)
        .output()
        .expect("failed to run shadeloop check");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("fragment stage failed to compile"));
    assert!(stderr.contains("bad.frag"));
}

#[test]
fn default_shader_is_printed_and_checks_clean() {
    let root = TempDir::new().unwrap();
    let output = shadeloop(&root)
        .arg("default-shader")
        .output()
        .expect("failed to run shadeloop default-shader");
    assert!(output.status.success());

    let source = String::from_utf8(output.stdout).unwrap();
    assert!(source.starts_with("#version 300 es"));
    assert!(source.contains("uTime"));

    let shader = root.path().join("default.frag");
    fs::write(&shader, &source).unwrap();
    let status = shadeloop(&root)
        .arg("check")
        .arg(&shader)
        .status()
        .expect("failed to run shadeloop check");
    assert!(status.success());
}

#[test]
fn invalid_config_is_rejected_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("shadeloop.toml");
    fs::write(&config, "[window]\nwidth = 0\n").unwrap();

    let output = shadeloop(&root)
        .arg(root.path().join("shader.frag"))
        .output()
        .expect("failed to run shadeloop");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("window size must be non-zero"));
}

#[test]
fn missing_explicit_config_is_rejected() {
    let root = TempDir::new().unwrap();
    let output = shadeloop(&root)
        .env("SHADELOOP_CONFIG", root.path().join("absent.toml"))
        .output()
        .expect("failed to run shadeloop");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.toml"));
}
