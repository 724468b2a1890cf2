//! The run itself: prompt → completion → code block → sandbox → first line.

use crate::{
    config::Config,
    error::Result,
    extract::{resolve_code, FencePolicy},
    llm::{ChatOptions, LlmClient},
    printer::{CodePrinter, TextPrinter},
    prompt::PromptPair,
    sandbox::{Execution, Sandbox, SandboxClient},
};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub prompt: PromptPair,
    pub model: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub language: String,
    /// Shell commands run in the sandbox before the generated code.
    pub setup: Vec<String>,
    pub fence_policy: FencePolicy,
    pub all_output: bool,
    pub markdown: bool,
    /// Print headers, code and output to stdout as the run progresses.
    pub echo: bool,
}

impl RunOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            prompt: PromptPair::default(),
            model: model.into(),
            temperature: None,
            top_p: None,
            language: "python".into(),
            setup: Vec::new(),
            fence_policy: FencePolicy::Require,
            all_output: false,
            markdown: false,
            echo: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub code: String,
    pub execution: Execution,
    /// What gets shown to the user: the first stdout line, or every chunk
    /// with `all_output`.
    pub output: String,
}

/// Ask the model for code and pull the fenced block out of its answer.
pub async fn generate_code(cfg: &Config, opts: &RunOptions) -> Result<String> {
    let client = LlmClient::from_config(cfg)?;
    let chat_opts = ChatOptions {
        model: opts.model.clone(),
        temperature: opts.temperature,
        top_p: opts.top_p,
    };

    tracing::info!(model = %opts.model, "requesting code from completion service");
    let completion = client.chat(&opts.prompt.messages(), &chat_opts).await?;
    resolve_code(&completion.text, &opts.language, opts.fence_policy)
}

/// Run the `setup` commands, then `code`, in a fresh sandbox; the sandbox is
/// killed afterwards.
pub async fn execute(cfg: &Config, setup: &[String], code: &str, language: &str) -> Result<Execution> {
    let client = SandboxClient::from_config(cfg)?;
    let sandbox = client.create().await?;
    let result = run_in(&client, &sandbox, setup, code, language).await;
    client.kill(&sandbox).await;
    result
}

async fn run_in(
    client: &SandboxClient,
    sandbox: &Sandbox,
    setup: &[String],
    code: &str,
    language: &str,
) -> Result<Execution> {
    for cmd in setup {
        client.run_command(sandbox, cmd).await?;
    }
    tracing::info!(sandbox_id = %sandbox.id, "executing code in sandbox");
    client.run_code(sandbox, code, language).await
}

pub async fn run(cfg: &Config, opts: &RunOptions) -> Result<RunReport> {
    // Fail on missing credentials before any network call.
    cfg.require("GROQ_API_KEY")?;
    cfg.require("E2B_API_KEY")?;

    let header = TextPrinter { color: Some("cyan") };
    if opts.echo {
        header.print("System Prompt:");
        println!("{}", opts.prompt.system_instruction);
        header.print("\nUser Prompt:");
        println!("{}", opts.prompt.user_instruction);
    }

    let code = generate_code(cfg, opts).await?;

    if opts.echo {
        header.print(&format!(
            "\nThe following is the {} code generated by the model: [{}]\n",
            display_language(&opts.language),
            opts.model
        ));
        CodePrinter::new(opts.markdown).print(&code, &opts.language);
        header.print("\nExecuting code in sandbox...");
    }

    let execution = execute(cfg, &opts.setup, &code, &opts.language).await?;
    let output = if opts.all_output {
        execution.combined_output()?
    } else {
        execution.first_stdout_line()?
    };

    if opts.echo {
        if opts.all_output {
            print!("{}", output);
        } else {
            println!("{}", output);
        }
    }

    Ok(RunReport { code, execution, output })
}

fn display_language(language: &str) -> String {
    let mut chars = language.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
