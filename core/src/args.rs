//! Command-line flag shared by every script

use std::ffi::OsString;

use clap::Parser;

/// The only flag scripts accept
#[derive(Parser, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[command(version, about = "Zabbix automation utility")]
pub struct DebugArgs {
    /// Run in debug
    #[arg(long)]
    pub debug: bool,
}

impl DebugArgs {
    /// Parse, exiting with usage on unknown arguments
    ///
    /// Accepts the single-dash `-debug` spelling as well as `--debug`.
    pub fn parse_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(normalize(args))
    }

    /// Parse without exiting the process
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize(args))
    }
}

/// Whether the process was started with `-debug`
pub fn parse_debug_argument() -> bool {
    DebugArgs::parse_from_args(std::env::args_os()).debug
}

fn normalize<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(i, arg)| {
            if i > 0 && arg == "-debug" {
                OsString::from("--debug")
            } else {
                arg
            }
        })
        .collect()
}
