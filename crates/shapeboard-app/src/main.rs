//! Shapeboard command line entry point.
//!
//! Loads a scene, prints its tree outline and optionally writes it back out.

use anyhow::{Context, Result};
use clap::Parser;
use shapeboard_core::{CheckState, Editor, EditorConfig, EditorKey, Rect, ShapeColor};
use std::path::PathBuf;

/// Inspect and rewrite Shapeboard scene files
#[derive(Parser, Debug)]
#[command(name = "shapeboard")]
#[command(about = "Inspect and rewrite Shapeboard scene files")]
struct Cli {
    /// Scene file to load
    scene: PathBuf,

    /// Editor settings (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the scene to this file after loading
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recolor every top-level item (#rrggbb) before writing
    #[arg(long, value_parser = parse_color)]
    recolor: Option<ShapeColor>,

    /// Group all top-level items into one group before writing
    #[arg(long)]
    group_all: bool,

    /// Drop every top-level item before writing
    #[arg(long)]
    clear: bool,
}

fn parse_color(text: &str) -> Result<ShapeColor, String> {
    ShapeColor::from_hex(text).ok_or_else(|| format!("invalid color: {text}"))
}

/// Check every top-level node, which activates the items behind them.
fn select_all(editor: &Editor) {
    let tree = editor.tree();
    for node in tree.children(tree.root()) {
        tree.set_check_state(node, CheckState::Checked);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let (width, height) = config.min_window;
    let mut editor = Editor::new(Rect::new(0, 0, width, height), config);
    editor
        .load(&cli.scene)
        .with_context(|| format!("Failed to load {}", cli.scene.display()))?;

    // The canvas grows to whatever the loaded scene needs.
    let (width, height) = editor.minimum_size();
    *editor.bounds_mut() = Rect::new(0, 0, width + 1, height + 1);

    if let Some(color) = cli.recolor {
        for item in editor.storage() {
            item.borrow_mut().set_color(color);
        }
    }
    if cli.group_all {
        select_all(&editor);
        editor.group_active();
    }
    if cli.clear {
        select_all(&editor);
        editor.key(EditorKey::Delete);
    }
    editor.storage_mut().deactivate_all();

    print!("{}", editor.tree().outline());
    println!("{} items", editor.storage().len());

    if let Some(output) = &cli.output {
        editor
            .save(output)
            .with_context(|| format!("Failed to save {}", output.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting Shapeboard");

    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeboard_core::Storage;
    use tempfile::tempdir;

    const SCENE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<storage>
  <items count_elements="2">
    <Rectangle color="#0000ff" id="4">
      <rect left="10" top="10" width="40" height="20"/>
    </Rectangle>
    <Circle color="#00ff00" id="9">
      <rect left="900" top="300" width="50" height="50"/>
    </Circle>
  </items>
</storage>
"##;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shapeboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        let parsed = cli(&["scene.xml", "-o", "out.xml", "--recolor", "#ff0000", "--group-all"]);
        assert_eq!(parsed.scene, PathBuf::from("scene.xml"));
        assert_eq!(parsed.output, Some(PathBuf::from("out.xml")));
        assert_eq!(parsed.recolor, Some(ShapeColor::RED));
        assert!(parsed.group_all);
        assert!(!parsed.clear);
    }

    #[test]
    fn test_bad_color_argument() {
        let result = Cli::try_parse_from(["shapeboard", "scene.xml", "--recolor", "red"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rewrite_scene() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.xml");
        let output = dir.path().join("out.xml");
        std::fs::write(&input, SCENE).unwrap();

        let args = [
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--recolor",
            "#123456",
            "--group-all",
        ];
        run(cli(&args)).unwrap();

        let mut storage = Storage::new();
        storage.load(&output).unwrap();
        assert_eq!(storage.len(), 1);
        let group = storage.get(0).unwrap().borrow();
        let children = group.as_group().unwrap().children();
        assert_eq!(children.len(), 2);
        for child in children {
            assert_eq!(child.borrow().color(), ShapeColor::new(0x12, 0x34, 0x56));
        }
    }

    #[test]
    fn test_missing_scene_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.xml");
        assert!(run(cli(&[missing.to_str().unwrap()])).is_err());
    }
}
