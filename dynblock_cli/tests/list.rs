mod common;

use dynblock_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use serde_json::json;

#[test]
fn list_shows_blocks_in_numbering_order() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let content = format!(
		"```ts\nconst spec = {{ type: \"dynamicRenderer\", id: \"table\" }};\n```\n\n{}\n",
		common::chart_block("{}")
	);
	let page = common::write_page(tmp.path(), &content)?;

	common::dynblock_cmd(tmp.path())
		.arg("list")
		.arg(&page)
		.assert()
		.success()
		.stdout(
			predicates::str::contains("json 5:1      dynamicRenderer chart")
				.and(predicates::str::contains("ts   1:1      dynamicRenderer table"))
				.and(predicates::str::contains("2 block(s), 2 dynamic")),
		);

	Ok(())
}

#[test]
fn list_reports_parse_errors_inline() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let page = common::write_page(
		tmp.path(),
		"```ts\nconst other = 1;\n```\n```json\n[1, 2]\n```\n",
	)?;

	let output = common::dynblock_cmd(tmp.path())
		.arg("list")
		.arg(&page)
		.args(["--format", "json"])
		.output()?;
	assert!(output.status.success());

	let blocks: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(
		blocks,
		json!([
			{ "syntax": "json", "line": 4, "column": 1, "kind": "", "id": "", "props": {} },
			{
				"syntax": "ts",
				"line": 1,
				"column": 1,
				"error": "`ts` block at 1:1 does not declare `spec`"
			},
		])
	);

	Ok(())
}

#[test]
fn list_without_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let page = common::write_page(tmp.path(), "# Nothing here\n\n```jsonc\n{}\n```\n")?;

	common::dynblock_cmd(tmp.path())
		.arg("list")
		.arg(&page)
		.assert()
		.success()
		.stdout(predicates::str::contains("No json or ts blocks found."));

	Ok(())
}

#[test]
fn list_error_in_text_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let page = common::write_page(
		tmp.path(),
		&format!("```json\n{{ broken\n```\n{}\n", common::chart_block("{}")),
	)?;

	common::dynblock_cmd(tmp.path())
		.arg("list")
		.arg(&page)
		.assert()
		.success()
		.stdout(
			predicates::str::contains("error: invalid `json` block at 2:")
				.and(predicates::str::contains("2 block(s), 1 dynamic")),
		);

	Ok(())
}
