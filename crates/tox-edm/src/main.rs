use clap::{Parser, Subcommand};
use tox_edm::{
    commands::{
        self,
        config::{self, ConfigAction},
    },
    errors::EdmError,
    logger, process, GlobalOpts,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code after a keyboard interrupt
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser)]
#[command(name = "tox-edm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Run test environments through edm",
    long_about = "tox-edm creates Enthought Deployment Manager (edm) environments, installs dependencies into them and runs test commands inside them."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the edm environment (reused if it already exists)
    Create {
        env: String,
        /// Force re-creation of the environment
        #[arg(short, long)]
        recreate: bool,
    },
    /// Install the configured dependencies into the environment
    Install { env: String },
    /// List the packages installed in the environment
    Report {
        env: String,
        /// Print the package list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the configured test commands inside the environment
    Run {
        env: String,
        /// Write command output to the log file instead of the console
        #[arg(long)]
        redirect: bool,
    },
    /// Print the interpreter path of the environment
    Python { env: String },
    /// Create, install, report and run for each environment (all by default)
    Test {
        envs: Vec<String>,
        /// Force re-creation of the environments
        #[arg(short, long)]
        recreate: bool,
        /// Write command output to the log file instead of the console
        #[arg(long)]
        redirect: bool,
    },
    /// Configure the tox-edm tool
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tox_edm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

fn exit_code_for(err: &EdmError) -> i32 {
    match err {
        EdmError::Interrupted { .. } => INTERRUPTED_EXIT_CODE,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<i32, EdmError> {
    let opts = &cli.global;
    match cli.command {
        Commands::Create { env, recreate } => {
            commands::env::handle_create(&env, recreate, opts)?;
        }
        Commands::Install { env } => {
            commands::env::handle_install(&env, opts)?;
        }
        Commands::Report { env, json } => {
            commands::env::handle_report(&env, json, opts)?;
        }
        Commands::Run { env, redirect } => {
            let status = commands::env::handle_run(&env, redirect, opts)?;
            if status.is_failure() {
                logger::error(&format!("{}: {}", env, status));
                return Ok(1);
            }
            logger::success(&format!("{}: {}", env, status));
        }
        Commands::Python { env } => match commands::env::handle_python(&env, opts)? {
            Some(executable) => println!("{}", executable.display()),
            None => {
                logger::error(&format!("edm environment {} does not exist", env));
                return Ok(1);
            }
        },
        Commands::Test {
            envs,
            recreate,
            redirect,
        } => {
            if !commands::test::handle_test(envs, recreate, redirect, opts)? {
                return Ok(1);
            }
        }
        Commands::Config { action } => {
            config::handle_config(action, opts);
        }
    }
    Ok(0)
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_logging();
    if let Err(e) = process::install_interrupt_handler() {
        logger::warn(&e.to_string());
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            logger::error(&e.to_string());
            if logger::get_verbosity() > 0 {
                logger::show_log_path();
            }
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
