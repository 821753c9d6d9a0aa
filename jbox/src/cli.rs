//! Command-line surface of the launcher.

use clap::Parser;
use jbox_kernel::CommandRegistry;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "jbox")]
#[command(about = "Unix tools that read and write structured JSON")]
#[command(version)]
pub struct Cli {
    /// Log every lifecycle stage to stderr (overrides JBOX_LOG)
    #[arg(short, long)]
    pub verbose: bool,

    /// The tool to run, followed by its own arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "TOOL [ARGS]")]
    pub command: Vec<String>,
}

/// What to run, resolved from the process arguments.
#[derive(Debug, PartialEq)]
pub struct Launch {
    pub verbose: bool,
    pub tool: Option<String>,
    pub args: Vec<String>,
}

impl Launch {
    /// Resolve `argv` (program name included).
    ///
    /// Invoked through a link named `<tool>` or `j<tool>`, every argument
    /// belongs to that tool and nothing is parsed here.
    pub fn from_argv(argv: &[String], registry: &CommandRegistry) -> Result<Self, clap::Error> {
        if let Some(tool) = argv.first().and_then(|argv0| multi_call_tool(argv0, registry)) {
            return Ok(Launch {
                verbose: false,
                tool: Some(tool),
                args: argv[1..].to_vec(),
            });
        }

        let cli = Cli::try_parse_from(argv)?;
        let mut command = cli.command.into_iter();
        Ok(Launch {
            verbose: cli.verbose,
            tool: command.next(),
            args: command.collect(),
        })
    }
}

/// The tool named by the executable, if it names one.
fn multi_call_tool(argv0: &str, registry: &CommandRegistry) -> Option<String> {
    let program = Path::new(argv0).file_name()?.to_str()?;
    [Some(program), program.strip_prefix('j')]
        .into_iter()
        .flatten()
        .find(|name| registry.contains(name))
        .map(String::from)
}
