//! One lifecycle operation per subcommand

use crate::commands::context::EnvContext;
use crate::errors::{EdmError, Result};
use crate::venv::{Action, EnvStatus};
use crate::GlobalOpts;
use std::path::PathBuf;
use tox_edm_logger as logger;

/// Create (or reuse) the edm environment for `env_name`
pub fn handle_create(env_name: &str, recreate: bool, opts: &GlobalOpts) -> Result<()> {
    let context = EnvContext::load(opts)?;
    let mut venv = context.test_env(env_name)?;
    venv.envconfig.recreate |= recreate;
    logger::set_current_env(Some(env_name.to_string()));

    let mut action = Action::for_env(&venv, "create");
    context
        .adapter()
        .create_environment(&mut venv, &mut action)?;
    logger::success(&format!(
        "edm environment {} ready at {}",
        env_name,
        venv.envconfig.envbindir.display()
    ));
    Ok(())
}

/// Install the configured dependencies of `env_name`
pub fn handle_install(env_name: &str, opts: &GlobalOpts) -> Result<()> {
    let context = EnvContext::load(opts)?;
    let venv = context.test_env(env_name)?;
    logger::set_current_env(Some(env_name.to_string()));

    let mut action = Action::for_env(&venv, "installdeps");
    context.adapter().install_dependencies(&venv, &mut action)?;
    if venv.envconfig.deps.is_empty() {
        logger::info(&format!("{} has no dependencies to install", env_name));
    }
    Ok(())
}

/// Print the packages installed in `env_name`
pub fn handle_report(env_name: &str, json: bool, opts: &GlobalOpts) -> Result<()> {
    let context = EnvContext::load(opts)?;
    let venv = context.test_env(env_name)?;
    logger::set_current_env(Some(env_name.to_string()));

    let mut action = Action::for_env(&venv, "envreport");
    let packages = context.adapter().report_environment(&venv, &mut action)?;

    if json {
        let rendered = serde_json::to_string_pretty(&packages)
            .map_err(|e| EdmError::Config(format!("Failed to render JSON: {e}")))?;
        println!("{}", rendered);
    } else {
        for package in &packages {
            println!("{}", package);
        }
    }
    Ok(())
}

/// Run the configured commands of `env_name` and return the resulting status
pub fn handle_run(env_name: &str, redirect: bool, opts: &GlobalOpts) -> Result<EnvStatus> {
    let context = EnvContext::load(opts)?;
    let mut venv = context.test_env(env_name)?;
    logger::set_current_env(Some(env_name.to_string()));

    let mut action = Action::for_env(&venv, "runtests");
    context
        .adapter()
        .run_tests(&mut venv, &mut action, redirect)?;
    Ok(venv.status)
}

/// Interpreter path of `env_name`, `None` if the edm environment does not exist
pub fn handle_python(env_name: &str, opts: &GlobalOpts) -> Result<Option<PathBuf>> {
    let context = EnvContext::load_optional_project(opts)?;
    let mut envconfig = context.env_config_or_default(env_name)?;
    logger::set_current_env(Some(env_name.to_string()));

    let executable = context.adapter().get_python_executable(&mut envconfig)?;
    if executable.is_some() {
        logger::debug(&format!(
            "{} bin directory: {}",
            env_name,
            envconfig.envbindir.display()
        ));
    }
    Ok(executable)
}
