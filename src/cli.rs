use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jupyter-deploy", version, about = "Jupyter Lab container deployer")]
pub struct Cli {
    /// Force a rebuild of the container image
    #[arg(long)]
    pub rebuild: bool,

    /// Re-prompt for every configuration value
    #[arg(long)]
    pub reconfigure: bool,

    /// Show service status and exit
    #[arg(long)]
    pub status: bool,

    /// Stop the service and exit
    #[arg(long)]
    pub stop: bool,

    /// Non-interactive mode: read configuration from JUPYTER_DEPLOY_* env vars
    #[arg(long)]
    pub non_interactive: bool,

    /// Directory holding the image build context and jupyter_config_template/
    /// (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub project_dir: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}
