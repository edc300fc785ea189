use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;

pub fn dynblock_cmd(root: &Path) -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_dynblock"));
	cmd.env("NO_COLOR", "1")
		.env_remove("RUST_LOG")
		.current_dir(root);
	cmd
}

pub fn chart_block(props: &str) -> String {
	format!("```json\n{{\"type\":\"dynamicRenderer\",\"id\":\"chart\",\"props\":{props}}}\n```")
}

pub fn write_page(root: &Path, content: &str) -> std::io::Result<PathBuf> {
	let path = root.join("page.md");
	std::fs::write(&path, content)?;
	Ok(path)
}
