//! Shared fixtures for integration tests: small design documents and
//! helpers to run the `canvas-merge` binary on files in a temp directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use canvas_merge::core::Document;
use serde_json::{Value, json};
use tempfile::TempDir;

pub const ARTBOARD: &str = "01HZY00000000000000000ART0";
pub const X: &str = "01HZY000000000000000000X00";
pub const Y: &str = "01HZY000000000000000000Y00";
pub const A: &str = "01HZY000000000000000000A00";
pub const B: &str = "01HZY000000000000000000B00";
pub const C: &str = "01HZY000000000000000000C00";

/// A rectangle node with the given identity and name.
pub fn rect(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "type": "vector",
        "name": name,
        "frame": { "x": 0, "y": 0, "width": 10, "height": 10 }
    })
}

/// A document with one artboard holding `children`.
pub fn doc(children: Vec<Value>) -> Document {
    serde_json::from_value(json!({
        "version": 1,
        "artboards": [{
            "id": ARTBOARD,
            "type": "frame",
            "name": "Home",
            "frame": { "x": 0, "y": 0, "width": 1440, "height": 900 },
            "children": children
        }]
    }))
    .expect("fixture is a valid document")
}

/// Three document versions written to a temp directory.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new(base: &Document, local: &Document, remote: &Document) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        for (name, doc) in [("base", base), ("local", local), ("remote", remote)] {
            let json = serde_json::to_string_pretty(doc).expect("serialize fixture");
            std::fs::write(dir.path().join(format!("{name}.json")), json).expect("write fixture");
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::write(self.file("canvas-merge.toml"), toml).expect("write config");
    }
}

/// Run canvas-merge with the given args in the given directory.
pub fn canvas_merge_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_canvas-merge"))
        .args(args)
        .current_dir(dir)
        .env_remove("CANVAS_MERGE_CONFIG")
        .env_remove("CANVAS_MERGE_LOG")
        .output()
        .expect("failed to execute canvas-merge")
}

/// Run canvas-merge and assert it succeeds. Returns stdout as string.
pub fn canvas_merge_ok(dir: &Path, args: &[&str]) -> String {
    let out = canvas_merge_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "canvas-merge {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run canvas-merge and assert it fails. Returns stderr as string.
pub fn canvas_merge_fails(dir: &Path, args: &[&str]) -> String {
    let out = canvas_merge_in(dir, args);
    assert!(
        !out.status.success(),
        "Expected canvas-merge {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}
