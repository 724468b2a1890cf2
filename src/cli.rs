use clap::{ArgAction, ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "sbxgpt", about = "Generate code with an LLM and run it in a remote sandbox", version)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct Cli {
    /// Replaces the default user instruction.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Replaces the default system instruction.
    #[arg(long)]
    pub system: Option<String>,

    /// Large language model to use.
    #[arg(long)]
    pub model: Option<String>,

    /// Randomness of generated output.
    #[arg(long, value_parser = clap::value_parser!(f32))]
    pub temperature: Option<f32>,

    /// Limits highest probable tokens (words).
    #[arg(long = "top-p", value_parser = clap::value_parser!(f32))]
    pub top_p: Option<f32>,

    /// Code fence tag to extract and sandbox language to run it as.
    #[arg(long, default_value = "python")]
    pub language: String,

    /// Shell command to run in the sandbox before the code (repeatable),
    /// e.g. `--setup "pip install rich"`.
    #[arg(long = "setup", value_name = "CMD", action = ArgAction::Append)]
    pub setup: Vec<String>,

    /// Forward the whole response when it contains no code fence.
    #[arg(long = "pass-through")]
    pub pass_through: bool,

    /// Print every stdout/stderr chunk instead of only the first stdout line.
    #[arg(long = "all-output")]
    pub all_output: bool,

    /// Render the generated code as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print the generated code as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// More logging on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
