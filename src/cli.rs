use crate::monitor::MonitorOptions;
use clap::Parser;

/// Live resource usage for Docker containers and their volumes.
#[derive(Debug, Parser)]
#[command(name = crate::version::NAME, version = crate::version::VERSION)]
pub struct Cli {
    /// Show all containers (default shows just running)
    #[arg(short, long)]
    pub all: bool,

    /// Disable streaming stats and only pull the first result
    #[arg(long)]
    pub no_stream: bool,

    /// Display volume stats for the named containers
    #[arg(short, long)]
    pub volume: bool,

    /// Containers to monitor; none means every container
    #[arg(value_name = "CONTAINER")]
    pub containers: Vec<String>,
}

impl Cli {
    pub fn options(&self) -> MonitorOptions {
        MonitorOptions {
            containers: self.containers.clone(),
            all: self.all,
            no_stream: self.no_stream,
            volume: self.volume,
        }
    }
}
