use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use dynblock_core::SubstitutionMode;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Swap dynamic component blocks in markdown for mountable anchors.",
	long_about = "dynblock finds fenced ```json and ```ts blocks that describe a \
	              `dynamicRenderer` component, replaces each one with an anchor \
	              `<div id=\"{id}-{index}\"></div>`, and reports the component bindings \
	              a host page needs to mount them.\n\nQuick start:\n  dynblock list \
	              page.md                      Show every block in a file\n  dynblock \
	              transform page.md -c chart   Replace `chart` blocks with anchors"
)]
pub struct DynblockCli {
	#[command(subcommand)]
	pub command: Commands,

	/// Directory searched for `dynblock.toml`. Defaults to the current
	/// directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Replace component blocks with anchors and print the bindings.
	///
	/// Each `--component` is applied in the order given, so later components
	/// see the output of earlier ones. Blocks are numbered per component:
	/// every `json` block first, then every `ts` block.
	Transform {
		/// The markdown file to transform.
		file: PathBuf,

		/// A renderer id to substitute. Repeat for several components.
		#[arg(long = "component", short = 'c', required = true)]
		components: Vec<String>,

		/// Output format. `text` prints the transformed content to stdout and
		/// a summary to stderr, `json` prints a single JSON document.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// How matched blocks are replaced. Overrides `dynblock.toml`.
		#[arg(long, value_enum)]
		substitution: Option<SubstitutionArg>,

		/// Leave blocks that fail to parse in place and report them instead
		/// of failing.
		#[arg(long, default_value_t = false)]
		lenient: bool,

		/// Do not parse ```` ```ts ```` blocks.
		#[arg(long, default_value_t = false)]
		no_script: bool,

		/// Show a unified diff between the input and the transformed content.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Write the transformed content to this file instead of stdout.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
	/// List every `json` and `ts` block in a file.
	///
	/// Blocks are shown in numbering order with their location, `type` and
	/// `id`. Blocks that fail to parse are listed with the error.
	List {
		/// The markdown file to inspect.
		file: PathBuf,

		/// Output format.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SubstitutionArg {
	/// Replace every occurrence of a block's text.
	Text,
	/// Replace each block at its own position.
	Position,
}

impl From<SubstitutionArg> for SubstitutionMode {
	fn from(value: SubstitutionArg) -> Self {
		match value {
			SubstitutionArg::Text => SubstitutionMode::Text,
			SubstitutionArg::Position => SubstitutionMode::Position,
		}
	}
}
