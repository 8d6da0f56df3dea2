use std::io::{self, Read};

use clap::{Parser as ClapParser, Subcommand};
use targex::{
    DEFAULT_BUCKET_TOTAL,
    cli::{self, CheckOptions, CheckResult, CliError},
    sampling, to_json, to_json_pretty,
};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "targex")]
#[command(about = "Targeting expressions and stable sampling for recipe filtering")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and evaluate a targeting expression
    Check {
        /// The expression to evaluate
        expression: String,

        /// JSON context (reads from stdin if not provided and stdin is piped)
        #[arg(short, long)]
        context: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print the key of a fraction in [0, 1]
    Key { fraction: f64 },

    /// Print the key of an input string
    Hash { input: String },

    /// Print whether an input falls within a sample rate
    Sample { input: String, rate: f64 },

    /// Print whether an input falls within a bucket range
    Bucket {
        input: String,
        start: u64,
        count: u64,

        /// Size of the bucket space
        #[arg(long, default_value_t = DEFAULT_BUCKET_TOTAL)]
        total: u64,
    },

    /// Print the branch a user is assigned to
    Branch {
        user_id: String,
        recipe_slug: String,

        /// Branches as slug=ratio
        #[arg(required = true)]
        branches: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            expression,
            context,
            pretty,
            syntax_only,
        } => run_check(expression, context, pretty, syntax_only),
        Commands::Key { fraction } => {
            sampling::fraction_to_key(fraction).map(|key| println!("{}", key)).map_err(CliError::from)
        }
        Commands::Hash { input } => {
            println!("{}", sampling::hash_to_key(&input));
            Ok(())
        }
        Commands::Sample { input, rate } => sampling::stable_sample(&input, rate)
            .map(|sampled| println!("{}", sampled))
            .map_err(CliError::from),
        Commands::Bucket {
            input,
            start,
            count,
            total,
        } => sampling::bucket_sample(&input, start, count, total)
            .map(|sampled| println!("{}", sampled))
            .map_err(CliError::from),
        Commands::Branch {
            user_id,
            recipe_slug,
            branches,
        } => run_branch(&user_id, &recipe_slug, &branches),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_check(
    expression: String,
    context: Option<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let context = match context {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        expression,
        context,
        syntax_only,
    };

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    match runtime.block_on(cli::execute_check(&options))? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if pretty {
                to_json_pretty(&output)
            } else {
                to_json(&output)
            };
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_branch(user_id: &str, recipe_slug: &str, specs: &[String]) -> Result<(), CliError> {
    let branches = cli::parse_branches(specs)?;
    let branch = targex::choose_branch(user_id, recipe_slug, &branches)?;
    println!("{}", branch.slug);
    Ok(())
}
