use std::io::IsTerminal;
use once_cell::sync::OnceCell;

use shared::{
    Result,
    log::LevelFilter,
};
use log4rs::{
    append::{
        console::{
            ConsoleAppender,
            Target,
        },
        file::FileAppender,
    },
    config::{
        Appender,
        Config,
        Root,
    },
    encode::pattern::PatternEncoder,
    init_config,
    Handle,
};


static HANDLE: OnceCell<Handle> = OnceCell::new();

pub const GLOBAL_LOG_FNAME: &str = "./mdpca.log";


fn gen_logger_config(level: LevelFilter) -> Result<Config> {
    const ENCODE_STR: &str = "{d(%Y-%m-%d %H:%M:%S)} [{h({l:>5})}] {m}{n}";

    let isatty = std::io::stderr().is_terminal();

    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
        .target(Target::Stderr)
        .build();

    // keep a copy of interactive runs only, piped runs are logged by the caller
    let global_log = if isatty {
        Some(FileAppender::builder()
             .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
             .build(GLOBAL_LOG_FNAME)?)
    } else {
        None
    };

    let root = Root::builder().appender("stderr");
    let root = if global_log.is_some() { root.appender("global_log") } else { root };
    let root = root.build(level);

    let builder = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let builder = if let Some(global_log) = global_log {
        builder.appender(Appender::builder().build("global_log", Box::new(global_log)))
    } else {
        builder
    };

    Ok(builder.build(root)?)
}


/// Install the global logger, or reconfigure it if it is already installed.
pub fn logger_init(level: LevelFilter) -> Result<()> {
    let config = gen_logger_config(level)?;
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    HANDLE.get_or_try_init(|| init_config(config))?;
    Ok(())
}
