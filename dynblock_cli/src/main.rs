use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use dynblock_cli::Commands;
use dynblock_cli::DynblockCli;
use dynblock_cli::OutputFormat;
use dynblock_cli::SubstitutionArg;
use dynblock_core::ComponentDefinition;
use dynblock_core::DynblockConfig;
use dynblock_core::PipelineInput;
use dynblock_core::Props;
use dynblock_core::SyntaxTag;
use dynblock_core::TransformDiagnostic;
use dynblock_core::TransformOptions;
use dynblock_core::extract_blocks;
use dynblock_core::parse_block;
use dynblock_core::transform;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
	let args = DynblockCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Commands::Transform {
			file,
			components,
			format,
			substitution,
			lenient,
			no_script,
			diff,
			output,
		} => {
			let request = TransformRequest {
				file,
				components,
				format: *format,
				substitution: *substitution,
				lenient: *lenient,
				no_script: *no_script,
				diff: *diff,
				output: output.as_deref(),
			};
			run_transform(&args, &request)
		}
		Commands::List { file, format } => run_list(file, *format),
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<dynblock_core::DynblockError>() {
			Ok(error) => {
				let report: miette::Report = (*error).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Send `tracing` events to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let fallback = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.try_init()
		.ok();
}

fn resolve_root(args: &DynblockCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn read_file(file: &Path) -> Result<String, Box<dyn std::error::Error>> {
	std::fs::read_to_string(file)
		.map_err(|e| format!("failed to read {}: {e}", file.display()).into())
}

struct TransformRequest<'a> {
	file: &'a Path,
	components: &'a [String],
	format: OutputFormat,
	substitution: Option<SubstitutionArg>,
	lenient: bool,
	no_script: bool,
	diff: bool,
	output: Option<&'a Path>,
}

/// Config file values with command line flags layered on top.
fn resolve_options(
	args: &DynblockCli,
	request: &TransformRequest<'_>,
) -> Result<TransformOptions, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut options = DynblockConfig::load(&root)?
		.map(|config| config.options())
		.unwrap_or_default();

	if request.lenient {
		options.strict = false;
	}
	if request.no_script {
		options.script_syntax = false;
	}
	if let Some(substitution) = request.substitution {
		options.substitution = substitution.into();
	}

	Ok(options)
}

/// What the CLI's components render: enough to describe the mount.
struct Rendered {
	component: String,
	props: Props,
}

#[derive(Serialize)]
struct BindingReport {
	component: String,
	anchor: String,
	props: Props,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransformReport<'a> {
	transformed_content: &'a str,
	bindings: &'a [BindingReport],
	diagnostics: &'a [TransformDiagnostic],
}

fn run_transform(args: &DynblockCli, request: &TransformRequest<'_>) -> CliResult {
	let options = resolve_options(args, request)?;
	let content = read_file(request.file)?;

	let definitions: Vec<ComponentDefinition<Rendered>> = request
		.components
		.iter()
		.map(|id| {
			let component = id.clone();
			ComponentDefinition::new(id.as_str(), move |props: &Props| {
				Rendered {
					component: component.clone(),
					props: props.clone(),
				}
			})
		})
		.collect();

	let input = PipelineInput::new(content.as_str(), definitions).with_options(options);
	let result = transform(input)?;

	let bindings: Vec<BindingReport> = result
		.bindings
		.iter()
		.map(|binding| {
			let rendered = binding.render();
			BindingReport {
				component: rendered.component,
				anchor: binding.anchor_id().to_string(),
				props: rendered.props,
			}
		})
		.collect();

	if let Some(output) = request.output {
		std::fs::write(output, &result.transformed_content)
			.map_err(|e| format!("failed to write {}: {e}", output.display()))?;
	}

	if request.diff {
		print_diff(&content, &result.transformed_content);
	}

	match request.format {
		OutputFormat::Json => {
			let report = TransformReport {
				transformed_content: &result.transformed_content,
				bindings: &bindings,
				diagnostics: &result.diagnostics,
			};
			println!("{}", serde_json::to_string_pretty(&report)?);
		}
		OutputFormat::Text => {
			if request.output.is_none() {
				print!("{}", result.transformed_content);
			}

			print_diagnostics(&result.diagnostics);
			print_bindings(&bindings, request.output);
		}
	}

	Ok(())
}

fn print_bindings(bindings: &[BindingReport], output: Option<&Path>) {
	if let Some(output) = output {
		eprintln!("{} {}", colored!("Wrote", green), output.display());
	}

	if bindings.is_empty() {
		eprintln!("No matching component blocks found.");
		return;
	}

	eprintln!("{}", colored!("Bindings:", bold));
	for binding in bindings {
		let props = serde_json::Value::Object(binding.props.clone());
		eprintln!("  {} -> {} {props}", binding.anchor, binding.component);
	}
	eprintln!("{} binding(s)", bindings.len());
}

fn print_diagnostics(diagnostics: &[TransformDiagnostic]) {
	for diagnostic in diagnostics {
		let message = match diagnostic {
			TransformDiagnostic::InvalidBlock {
				syntax,
				message,
				line,
				column,
			} => format!("skipped `{syntax}` block at {line}:{column}: {message}"),
			TransformDiagnostic::CollapsedDuplicate {
				anchor_id,
				line,
				column,
			} => {
				format!(
					"block at {line}:{column} was already replaced by an earlier anchor, so \
					 `{anchor_id}` has no placeholder (use `--substitution position`)"
				)
			}
			_ => format!("{diagnostic:?}"),
		};
		eprintln!("{} {message}", colored!("warning:", yellow));
	}
}

#[derive(Serialize)]
struct BlockReport {
	syntax: SyntaxTag,
	line: usize,
	column: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	kind: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	props: Option<Props>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<String>,
}

fn run_list(file: &Path, format: OutputFormat) -> CliResult {
	let content = read_file(file)?;
	let mut reports = Vec::new();

	for tag in SyntaxTag::PRECEDENCE {
		for block in extract_blocks(&content, tag) {
			let start = block.position.start;
			let mut report = BlockReport {
				syntax: tag,
				line: start.line,
				column: start.column,
				kind: None,
				id: None,
				props: None,
				error: None,
			};

			match parse_block(&block) {
				Ok(descriptor) => {
					report.kind = Some(descriptor.kind);
					report.id = Some(descriptor.id);
					report.props = Some(descriptor.props);
				}
				Err(error) => report.error = Some(error.to_string()),
			}

			reports.push(report);
		}
	}

	if let OutputFormat::Json = format {
		println!("{}", serde_json::to_string_pretty(&reports)?);
		return Ok(());
	}

	if reports.is_empty() {
		println!("No json or ts blocks found.");
		return Ok(());
	}

	println!("{}", colored!("Blocks:", bold));
	for report in &reports {
		let location = format!("{}:{}", report.line, report.column);
		if let Some(error) = &report.error {
			println!(
				"  {:<4} {location:<8} {}",
				report.syntax.to_string(),
				colored!(format!("error: {error}"), red)
			);
			continue;
		}

		let kind = report.kind.as_deref().filter(|kind| !kind.is_empty()).unwrap_or("-");
		let id = report.id.as_deref().filter(|id| !id.is_empty()).unwrap_or("-");
		println!("  {:<4} {location:<8} {kind} {id}", report.syntax.to_string());
	}

	let dynamic = reports
		.iter()
		.filter(|report| report.kind.as_deref() == Some(dynblock_core::DYNAMIC_RENDERER_KIND))
		.count();
	println!("\n{} block(s), {dynamic} dynamic", reports.len());

	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
	eprintln!();
}
