use clap::{Parser, Subcommand};
use simple_page::editor::{
    EditablePage, EditorEnv, EditorSession, EditorSettings, FileStorage, GithubStore, HtmlPage,
    MemoryStore, Question, RemoteStore, ScriptedPrompt, StdinPrompt, UserPrompt,
};
use simple_page::output::{self, AppliedEdit};
use simple_page::{config, generate};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("SIMPLE_PAGE_RELEASE");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("SIMPLE_PAGE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-page")]
#[command(about = "Static single-page site generator with in-place content editing")]
#[command(long_about = "\
Static single-page site generator with in-place content editing

One HTML template plus one JSON content document become one page.

Source structure:

  src/
  ├── site.toml        # Site config (optional)
  ├── template.html    # {{path}} placeholders, {{#each path}}…{{/each}} blocks
  ├── content.json     # The content document
  ├── styles.css       # Static files, copied when present
  └── assets/          # Copied recursively
  robots.txt           # Root-level files (--root), copied when present

Editable text is marked with data-content=\"field.path\" in the template.
The edit command publishes changes to those regions back to content.json
in the site's GitHub repository.

Run 'simple-page gen-config' to generate a documented site.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory (template, content, config)
    #[arg(long, default_value = "src", global = true)]
    source: PathBuf,

    /// Project root holding robots.txt and other root-level files
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Replace the text of the regions bound to PATH (repeatable)
    #[arg(long = "set", value_name = "PATH=TEXT", value_parser = parse_edit)]
    set: Vec<(String, String)>,

    /// Local editor state (stored token and repository)
    #[arg(long, default_value = ".simple-page-editor.json")]
    state_file: PathBuf,

    /// Access token; answers the token prompt
    #[arg(long)]
    token: Option<String>,

    /// Repository as owner/name; answers the repository prompt
    #[arg(long)]
    repo: Option<String>,

    /// Publish to an in-memory copy of the local content instead of GitHub
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render the page and copy assets into the output directory
    Build,
    /// Validate config, content and template without writing
    Check,
    /// Print a stock site.toml with all options documented
    GenConfig,
    /// Edit regions of the built page and publish them
    Edit(EditArgs),
}

fn parse_edit(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((path, text)) if !path.trim().is_empty() => Ok((path.trim().to_string(), text.to_string())),
        _ => Err(format!("expected PATH=TEXT, got {raw:?}")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Build => {
            println!("==> Building {}", cli.source.display());
            let report = generate::build(&cli.source, &cli.root, &cli.output)?;
            output::print_build_output(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let report = generate::check(&cli.source)?;
            output::print_check_output(&report);
            if !report.malformed.is_empty() {
                return Err(format!("{} malformed field paths", report.malformed.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Edit(args) => edit(&cli, args)?,
    }

    Ok(())
}

fn edit(cli: &Cli, args: &EditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let site = config::load_config(&cli.source)?;
    let page_path = cli.output.join(&site.build.output_file);
    let html = std::fs::read_to_string(&page_path)
        .map_err(|e| format!("cannot read {} (run build first): {e}", page_path.display()))?;
    let mut page = HtmlPage::parse(&html)?;

    let remote: Box<dyn RemoteStore> = if args.dry_run {
        let content = generate::load_content(&cli.source.join(&site.build.content))?;
        Box::new(MemoryStore::new(content))
    } else {
        Box::new(GithubStore::new(&site.editor.api_base, &site.editor.content_path)?)
    };
    let mut storage = FileStorage::open(&args.state_file)?;
    let mut prompt: Box<dyn UserPrompt> = if args.token.is_some() || args.repo.is_some() {
        let mut scripted = ScriptedPrompt::new();
        if let Some(token) = &args.token {
            scripted = scripted.answer(Question::Credential, token);
        }
        if let Some(repo) = &args.repo {
            scripted = scripted.answer(Question::Repository, repo);
        }
        Box::new(scripted)
    } else {
        Box::new(StdinPrompt)
    };

    let mut env = EditorEnv {
        remote: remote.as_ref(),
        storage: &mut storage,
        prompt: prompt.as_mut(),
    };
    let mut session = EditorSession::start(EditorSettings::from_config(&site.editor), &mut env, &mut page);

    let edits: Vec<AppliedEdit> = args
        .set
        .iter()
        .map(|(path, text)| AppliedEdit {
            path: path.clone(),
            regions: page.set_text(path, text),
        })
        .collect();

    let published = if edits.iter().any(|e| e.regions > 0) {
        Some(session.publish(&mut env, &page))
    } else {
        None
    };

    output::print_edit_report(&session, &edits);
    match published {
        Some(Ok(_)) if args.dry_run => {
            if let Some(content) = session.baseline() {
                println!("{}", serde_json::to_string_pretty(content)?);
            }
        }
        Some(Err(e)) => return Err(e.into()),
        _ => {}
    }
    Ok(())
}
