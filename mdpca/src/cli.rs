use std::sync::OnceLock;

use clap::{
    Parser,
    Subcommand,
    builder::styling::{
        AnsiColor,
        Effects,
        Styles,
    },
};

use shared::{
    log::{self, LevelFilter},
    Result,
};
use crate::version::Version;
use crate::logging::{logger_init, GLOBAL_LOG_FNAME};


pub fn get_style() -> Styles {
    static INSTANCE: OnceLock<Styles> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        Styles::styled()
            .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
            .usage(AnsiColor::Green.on_default()   | Effects::BOLD)
            .literal(AnsiColor::Green.on_default() | Effects::BOLD)
            .placeholder(AnsiColor::BrightBlue.on_default())
            .error(AnsiColor::BrightRed.on_default())
            .valid(AnsiColor::BrightYellow.on_default())
    }).to_owned()
}


pub trait OptProcess : Parser {
    fn process(&self) -> Result<()>;
}


#[derive(Debug, Parser)]
#[command(name = "mdpca",
          about = Version::new().to_string(),
          long_about = format!("{:#}", Version::new()),
          version,
          styles = get_style())]
struct Opt {
    #[arg(short, long, global=true)]
    /// Print debug messages.
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}


#[derive(Debug, Subcommand)]
enum Command {
    Pca(crate::pca::PcaCommand),
    Kde(crate::kde::KdeCommand),
}


impl OptProcess for Opt {
    fn process(&self) -> Result<()> {
        use Command::*;

        let level = if self.verbose { LevelFilter::Debug } else { LevelFilter::Info };
        logger_init(level)?;
        log::info!("Global logger initialized with targets being stderr and {:?}", GLOBAL_LOG_FNAME);
        log::debug!("\n{:#}", Version::new());

        match &self.command {
            Pca(cmd) => cmd.process(),
            Kde(cmd) => cmd.process(),
        }
    }
}


pub fn run() -> Result<()> {
    Opt::parse().process()
}
